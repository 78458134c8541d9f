// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

pub mod attrs;
pub mod fragment;
pub mod mark;
pub mod node;
pub mod resolve;

pub use attrs::{AttrValue, Attrs};
pub use mark::{find_in_set, remove_from_set, Mark, MarkType};
pub use node::{Node, NodeId, NodeType};
pub use resolve::ResolvedPos;

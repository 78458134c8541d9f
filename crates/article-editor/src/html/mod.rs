// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

pub mod builder;
pub mod dom;
pub mod parse;
pub mod render;
#[cfg(feature = "sys")]
mod sink;

pub use builder::DocBuilder;
pub use parse::parse_html;
pub use render::to_html;

// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::Attrs;

/// The inline annotations the editor knows about.
///
/// Ordering of the variants is the canonical order marks are stored and
/// rendered in, so `<strong><em>` never flips to `<em><strong>` between
/// renders.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum MarkType {
    Link,
    Bold,
    Italic,
    Strike,
    Underline,
    Code,
}

impl MarkType {
    /// Whether typing at the edge of the mark continues it.
    pub fn is_inclusive(&self) -> bool {
        !matches!(self, MarkType::Link | MarkType::Code)
    }
}

/// A mark instance attached to a text node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: MarkType,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(mark_type: MarkType) -> Self {
        Self {
            mark_type,
            attrs: Attrs::new(),
        }
    }

    pub fn with_attrs(mark_type: MarkType, attrs: Attrs) -> Self {
        Self { mark_type, attrs }
    }

    pub fn link(href: &str, protocol: &str) -> Self {
        Self::with_attrs(
            MarkType::Link,
            Attrs::new().with("href", href).with("protocol", protocol),
        )
    }

    /// Return `set` with this mark added, replacing any mark of the same
    /// type and keeping canonical order.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut out: Vec<Mark> = set
            .iter()
            .filter(|m| m.mark_type != self.mark_type)
            .cloned()
            .collect();
        let at = out
            .iter()
            .position(|m| m.mark_type > self.mark_type)
            .unwrap_or(out.len());
        out.insert(at, self.clone());
        out
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|m| m == self)
    }
}

pub fn remove_from_set(mark_type: MarkType, set: &[Mark]) -> Vec<Mark> {
    set.iter()
        .filter(|m| m.mark_type != mark_type)
        .cloned()
        .collect()
}

pub fn find_in_set(mark_type: MarkType, set: &[Mark]) -> Option<&Mark> {
    set.iter().find(|m| m.mark_type == mark_type)
}

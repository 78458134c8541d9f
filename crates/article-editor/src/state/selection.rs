// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Selections over the token position model.
//!
//! A text selection has both ends inside textblocks. A node selection
//! covers exactly one non-text node (an image, a rule).

use serde::{Deserialize, Serialize};

use crate::model::{Node, ResolvedPos};
use crate::transform::{Assoc, Mapping};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Selection {
    Text { anchor: usize, head: usize },
    Node { pos: usize, end: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bias {
    Forward,
    Backward,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::cursor(0)
    }
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection::Text {
            anchor: pos,
            head: pos,
        }
    }

    pub fn text(anchor: usize, head: usize) -> Self {
        Selection::Text { anchor, head }
    }

    /// Select the node starting at `pos`, if there is a selectable one.
    pub fn node(doc: &Node, pos: usize) -> Option<Self> {
        let node = doc.node_at(pos).filter(|n| !n.is_text())?;
        Some(Selection::Node {
            pos,
            end: pos + node.node_size(),
        })
    }

    pub fn anchor(&self) -> usize {
        match self {
            Selection::Text { anchor, .. } => *anchor,
            Selection::Node { pos, .. } => *pos,
        }
    }

    pub fn head(&self) -> usize {
        match self {
            Selection::Text { head, .. } => *head,
            Selection::Node { end, .. } => *end,
        }
    }

    pub fn from(&self) -> usize {
        self.anchor().min(self.head())
    }

    pub fn to(&self) -> usize {
        self.anchor().max(self.head())
    }

    pub fn is_empty(&self) -> bool {
        self.from() == self.to()
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Selection::Node { .. })
    }

    /// Whether every position this selection names still exists in `doc`.
    pub fn is_valid(&self, doc: &Node) -> bool {
        match *self {
            Selection::Text { anchor, head } => {
                in_textblock(doc, anchor) && in_textblock(doc, head)
            }
            Selection::Node { pos, end } => doc
                .node_at(pos)
                .is_some_and(|n| !n.is_text() && pos + n.node_size() == end),
        }
    }

    /// Carry the selection through `mapping` onto `doc`, the document the
    /// mapping ends in. Falls back to the nearest valid selection.
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        if let Selection::Node { pos, .. } = *self {
            let result = mapping.map_result(pos, Assoc::After);
            if result.deleted() {
                return Selection::near(doc, result.pos, Bias::Forward);
            }
        }
        self.map_positions(mapping).validated(doc)
    }

    /// Map the raw positions without checking them against a document.
    pub fn map_positions(&self, mapping: &Mapping) -> Selection {
        match *self {
            Selection::Text { anchor, head } => Selection::Text {
                anchor: mapping.map(anchor, Assoc::After),
                head: mapping.map(head, Assoc::After),
            },
            Selection::Node { pos, end } => Selection::Node {
                pos: mapping.map(pos, Assoc::After),
                end: mapping.map(end, Assoc::Before),
            },
        }
    }

    /// Use this selection if it is valid in `doc`, else the nearest one.
    pub fn validated(self, doc: &Node) -> Selection {
        if self.is_valid(doc) {
            self
        } else {
            Selection::near(doc, self.head(), Bias::Forward)
        }
    }

    /// A cursor at the start of the first textblock.
    pub fn at_start(doc: &Node) -> Selection {
        Selection::near(doc, 0, Bias::Forward)
    }

    pub fn at_end(doc: &Node) -> Selection {
        Selection::near(doc, doc.content_size(), Bias::Backward)
    }

    /// The valid selection closest to `pos`, searching in `bias` direction
    /// first. Leaf blocks are node-selected when no textblock is found.
    pub fn near(doc: &Node, pos: usize, bias: Bias) -> Selection {
        let pos = pos.min(doc.content_size());
        if in_textblock(doc, pos) {
            return Selection::cursor(pos);
        }
        let mut blocks: Vec<(usize, usize, bool)> = Vec::new();
        doc.descendants(&mut |node, at| {
            if node.is_textblock() {
                blocks.push((at + 1, at + 1 + node.content_size(), true));
                false
            } else if node.is_leaf() && node.is_block() {
                blocks.push((at, at + node.node_size(), false));
                false
            } else {
                true
            }
        });
        let forward = || blocks.iter().find(|(start, _, _)| *start >= pos);
        let backward = || blocks.iter().rev().find(|(_, end, _)| *end <= pos);
        let found = match bias {
            Bias::Forward => forward().or_else(backward),
            Bias::Backward => backward().or_else(forward),
        };
        match found {
            Some(&(start, end, true)) => {
                let at = if start >= pos { start } else { end };
                Selection::cursor(at)
            }
            Some(&(start, end, false)) => Selection::Node { pos: start, end },
            None => Selection::cursor(0),
        }
    }
}

fn in_textblock(doc: &Node, pos: usize) -> bool {
    ResolvedPos::resolve(doc, pos).is_some_and(|rp| rp.parent().is_textblock())
}

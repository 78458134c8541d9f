// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::fragment;
use super::{Attrs, Mark};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a node instance.
///
/// Identity survives attribute and content edits (the node is rebuilt with
/// the same id) and is what ephemeral view state is keyed by. It takes no
/// part in equality or serialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    BulletList,
    OrderedList,
    ListItem,
    CodeBlock,
    HorizontalRule,
    Image,
    HardBreak,
    Text,
}

impl NodeType {
    pub fn is_inline(&self) -> bool {
        matches!(self, NodeType::Text | NodeType::HardBreak)
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline() && *self != NodeType::Doc
    }

    /// Leaf nodes have no content and occupy a single position
    /// (text nodes occupy one position per character).
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            NodeType::Text
                | NodeType::HardBreak
                | NodeType::HorizontalRule
                | NodeType::Image
        )
    }

    pub fn is_textblock(&self) -> bool {
        matches!(
            self,
            NodeType::Paragraph | NodeType::Heading | NodeType::CodeBlock
        )
    }

    pub fn is_list(&self) -> bool {
        matches!(self, NodeType::BulletList | NodeType::OrderedList)
    }

    /// Whether inline content directly inside this node may carry marks.
    pub fn allows_marks(&self) -> bool {
        *self != NodeType::CodeBlock
    }
}

/// An immutable element of the document tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    #[serde(skip, default = "NodeId::fresh")]
    id: NodeId,
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<Mark>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.node_type == other.node_type
            && self.attrs == other.attrs
            && self.text == other.text
            && self.marks == other.marks
            && self.content == other.content
    }
}

impl Node {
    pub fn new(node_type: NodeType, attrs: Attrs, content: Vec<Node>) -> Self {
        Self {
            id: NodeId::fresh(),
            node_type,
            attrs,
            content,
            text: None,
            marks: Vec::new(),
        }
    }

    pub fn leaf(node_type: NodeType, attrs: Attrs) -> Self {
        Self::new(node_type, attrs, Vec::new())
    }

    pub fn text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            id: NodeId::fresh(),
            node_type: NodeType::Text,
            attrs: Attrs::new(),
            content: Vec::new(),
            text: Some(text.into()),
            marks,
        }
    }

    pub fn doc(content: Vec<Node>) -> Self {
        Self::new(NodeType::Doc, Attrs::new(), content)
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::new(NodeType::Paragraph, Attrs::new(), content)
    }

    /// Convenience: a paragraph holding a single unmarked text run.
    pub fn paragraph_with_text(text: &str) -> Self {
        if text.is_empty() {
            Self::paragraph(Vec::new())
        } else {
            Self::paragraph(vec![Self::text(text, Vec::new())])
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// The text of a text node; empty for every other node.
    pub fn text_str(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    pub fn is_leaf(&self) -> bool {
        self.node_type.is_leaf()
    }

    pub fn is_textblock(&self) -> bool {
        self.node_type.is_textblock()
    }

    pub fn is_inline(&self) -> bool {
        self.node_type.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.node_type.is_block()
    }

    pub fn node_size(&self) -> usize {
        if self.is_text() {
            self.text_str().chars().count()
        } else if self.is_leaf() {
            1
        } else {
            self.content_size() + 2
        }
    }

    pub fn content_size(&self) -> usize {
        fragment::size(&self.content)
    }

    /// All text in this subtree, leaf blocks contributing nothing.
    pub fn text_content(&self) -> String {
        if self.is_text() {
            return self.text_str().to_owned();
        }
        let mut out = String::new();
        for child in &self.content {
            out.push_str(&child.text_content());
        }
        out
    }

    /// Text content with a separator between blocks, used for plain-text
    /// export.
    pub fn text_between_blocks(&self, separator: &str) -> String {
        let mut out = String::new();
        let mut first = true;
        self.descendants(&mut |node, _pos| {
            if node.is_textblock() {
                if !first {
                    out.push_str(separator);
                }
                first = false;
                out.push_str(&node.text_content());
                false
            } else {
                true
            }
        });
        out
    }

    pub fn with_content(&self, content: Vec<Node>) -> Node {
        Node {
            content,
            ..self.clone_shallow()
        }
    }

    pub fn with_attrs(&self, attrs: Attrs) -> Node {
        Node {
            attrs,
            content: self.content.clone(),
            ..self.clone_shallow()
        }
    }

    pub fn with_type(&self, node_type: NodeType, attrs: Attrs) -> Node {
        Node {
            node_type,
            attrs,
            content: self.content.clone(),
            ..self.clone_shallow()
        }
    }

    pub fn with_marks(&self, marks: Vec<Mark>) -> Node {
        Node {
            marks,
            ..self.clone()
        }
    }

    /// A text node with the same marks (and id) but different text.
    pub fn with_text(&self, text: impl Into<String>) -> Node {
        Node {
            text: Some(text.into()),
            ..self.clone()
        }
    }

    fn clone_shallow(&self) -> Node {
        Node {
            id: self.id,
            node_type: self.node_type,
            attrs: self.attrs.clone(),
            content: Vec::new(),
            text: self.text.clone(),
            marks: self.marks.clone(),
        }
    }

    /// Give this node and its whole subtree new identities.
    pub fn with_fresh_ids(&self) -> Node {
        Node {
            id: NodeId::fresh(),
            content: self.content.iter().map(Node::with_fresh_ids).collect(),
            ..self.clone_shallow()
        }
    }

    /// Visit every descendant with its absolute position (relative to the
    /// start of this node's content). Returning `false` skips the subtree.
    pub fn descendants<'a>(&'a self, f: &mut dyn FnMut(&'a Node, usize) -> bool) {
        self.nodes_between(0, self.content_size(), f)
    }

    /// Visit nodes overlapping `[from, to)` of this node's content.
    pub fn nodes_between<'a>(
        &'a self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&'a Node, usize) -> bool,
    ) {
        walk_between(&self.content, 0, from, to, f);
    }

    /// The node that starts at content offset `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let (index, offset) = fragment::find_index(&node.content, pos)?;
            let child = node.content.get(index)?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// Locate a descendant by identity, returning its position.
    pub fn find_by_id(&self, id: NodeId) -> Option<(usize, &Node)> {
        let mut found: Option<(usize, &Node)> = None;
        find_in(&self.content, 0, id, &mut found);
        found
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        self.find_by_id(id).is_some()
    }

    /// Marks in effect at a content position inside a textblock.
    pub fn marks_at(&self, pos: usize) -> Vec<Mark> {
        let mut marks = Vec::new();
        let mut found = false;
        self.nodes_between(pos.saturating_sub(1), pos + 1, &mut |node, start| {
            if found {
                return false;
            }
            if node.is_text() {
                let end = start + node.node_size();
                if start < pos && pos <= end {
                    marks = node.marks.clone();
                    found = true;
                } else if start == pos {
                    marks = node
                        .marks
                        .iter()
                        .filter(|m| m.mark_type.is_inclusive())
                        .cloned()
                        .collect();
                    found = true;
                }
            }
            true
        });
        marks
    }
}

fn walk_between<'a>(
    content: &'a [Node],
    start: usize,
    from: usize,
    to: usize,
    f: &mut dyn FnMut(&'a Node, usize) -> bool,
) {
    let mut pos = start;
    for child in content {
        let end = pos + child.node_size();
        if end > from && pos < to && f(child, pos) && !child.is_leaf() {
            walk_between(&child.content, pos + 1, from, to, f);
        }
        if pos >= to {
            break;
        }
        pos = end;
    }
}

fn find_in<'a>(
    content: &'a [Node],
    start: usize,
    id: NodeId,
    found: &mut Option<(usize, &'a Node)>,
) {
    let mut pos = start;
    for child in content {
        if found.is_some() {
            return;
        }
        if child.id == id {
            *found = Some((pos, child));
            return;
        }
        if !child.is_leaf() {
            find_in(&child.content, pos + 1, id, found);
        }
        pos += child.node_size();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mark, MarkType};

    fn sample() -> Node {
        Node::doc(vec![
            Node::paragraph_with_text("ab"),
            Node::leaf(NodeType::Image, Attrs::new().with("src", "x.png")),
            Node::paragraph(vec![
                Node::text("c", vec![]),
                Node::text("de", vec![Mark::new(MarkType::Bold)]),
            ]),
        ])
    }

    #[test]
    fn sizes_follow_the_token_model() {
        let doc = sample();
        assert_eq!(doc.child(0).unwrap().node_size(), 4);
        assert_eq!(doc.child(1).unwrap().node_size(), 1);
        assert_eq!(doc.content_size(), 4 + 1 + 5);
    }

    #[test]
    fn node_at_finds_blocks_and_text() {
        let doc = sample();
        assert_eq!(doc.node_at(0).unwrap().node_type(), NodeType::Paragraph);
        assert_eq!(doc.node_at(4).unwrap().node_type(), NodeType::Image);
        assert_eq!(doc.node_at(1).unwrap().text_str(), "ab");
        assert_eq!(doc.node_at(7).unwrap().text_str(), "de");
    }

    #[test]
    fn equality_ignores_identity() {
        assert_eq!(sample(), sample());
        assert_ne!(sample().id(), sample().id());
    }

    #[test]
    fn find_by_id_reports_position() {
        let doc = sample();
        let image_id = doc.child(1).unwrap().id();
        let (pos, node) = doc.find_by_id(image_id).unwrap();
        assert_eq!(pos, 4);
        assert_eq!(node.node_type(), NodeType::Image);
    }

    #[test]
    fn marks_at_reads_the_character_before() {
        let doc = sample();
        // Inside "de" (bold).
        assert_eq!(doc.marks_at(8).len(), 1);
        // Between "c" and "de": the plain run is before the position.
        assert!(doc.marks_at(7).is_empty());
    }

    #[test]
    fn text_between_blocks_joins_textblocks() {
        assert_eq!(sample().text_between_blocks("\n"), "ab\ncde");
    }
}

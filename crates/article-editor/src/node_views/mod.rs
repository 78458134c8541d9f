// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Per-node UI state that lives next to the document, never inside it.
//!
//! Views are keyed by [`NodeId`] and created on first use. After every
//! transaction the registry drops the views whose node is gone (or has
//! changed into a type that has no view).

pub mod alt_text;
pub mod code_block;

use std::collections::HashMap;

pub use alt_text::{AltTextEditor, AltTextEffect, AltTextEvent, AltTextState, Dismissal};
pub use code_block::CodeBlockView;

use crate::model::{Node, NodeId, NodeType};

#[derive(Clone, Debug, Default)]
pub struct ImageView {
    pub alt_text: AltTextEditor,
}

#[derive(Clone, Debug)]
pub enum NodeView {
    CodeBlock(CodeBlockView),
    Image(ImageView),
}

impl NodeView {
    fn for_node(node: &Node) -> Option<Self> {
        match node.node_type() {
            NodeType::CodeBlock => Some(NodeView::CodeBlock(CodeBlockView::new(node.id()))),
            NodeType::Image => Some(NodeView::Image(ImageView::default())),
            _ => None,
        }
    }

    fn node_type(&self) -> NodeType {
        match self {
            NodeView::CodeBlock(_) => NodeType::CodeBlock,
            NodeView::Image(_) => NodeType::Image,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct NodeViews {
    views: HashMap<NodeId, NodeView>,
}

impl NodeViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeView> {
        self.views.get(&id)
    }

    /// The view for `id`, created if the node exists in `doc` and has one.
    pub fn get_or_create(&mut self, doc: &Node, id: NodeId) -> Option<&mut NodeView> {
        if !self.views.contains_key(&id) {
            let (_, node) = doc.find_by_id(id)?;
            let view = NodeView::for_node(node)?;
            self.views.insert(id, view);
        }
        self.views.get_mut(&id)
    }

    pub fn code_block(&mut self, doc: &Node, id: NodeId) -> Option<&mut CodeBlockView> {
        match self.get_or_create(doc, id)? {
            NodeView::CodeBlock(view) => Some(view),
            NodeView::Image(_) => None,
        }
    }

    pub fn image(&mut self, doc: &Node, id: NodeId) -> Option<&mut ImageView> {
        match self.get_or_create(doc, id)? {
            NodeView::Image(view) => Some(view),
            NodeView::CodeBlock(_) => None,
        }
    }

    /// Drop views whose node no longer exists as the same type. Returns how
    /// many were dropped.
    pub fn prune(&mut self, doc: &Node) -> usize {
        if self.views.is_empty() {
            return 0;
        }
        let mut live: HashMap<NodeId, NodeType> = HashMap::new();
        doc.descendants(&mut |node, _| {
            if matches!(node.node_type(), NodeType::CodeBlock | NodeType::Image) {
                live.insert(node.id(), node.node_type());
            }
            !node.is_textblock()
        });
        let before = self.views.len();
        self.views
            .retain(|id, view| live.get(id) == Some(&view.node_type()));
        before - self.views.len()
    }

    pub fn clear(&mut self) {
        self.views.clear();
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;
    use crate::model::Attrs;

    fn image() -> Node {
        Node::leaf(NodeType::Image, Attrs::new().with("src", "a.png"))
    }

    #[test]
    fn views_are_created_only_for_interactive_nodes() {
        let paragraph = Node::paragraph_with_text("x");
        let picture = image();
        let (p_id, i_id) = (paragraph.id(), picture.id());
        let doc = Node::doc(vec![paragraph, picture]);
        let mut views = NodeViews::new();
        assert_that!(views.get_or_create(&doc, p_id).is_none()).is_true();
        assert_that!(views.image(&doc, i_id).is_some()).is_true();
        assert_that!(views.code_block(&doc, i_id).is_none()).is_true();
        assert_that!(views.len()).is_equal_to(1);
    }

    #[test]
    fn views_die_with_their_node() {
        let picture = image();
        let id = picture.id();
        let doc = Node::doc(vec![picture]);
        let mut views = NodeViews::new();
        views
            .image(&doc, id)
            .unwrap()
            .alt_text
            .transition(AltTextEvent::Open, "");

        let kept = views.prune(&doc);
        assert_that!(kept).is_equal_to(0);
        assert_that!(views.len()).is_equal_to(1);

        let emptied = Node::doc(vec![Node::paragraph(vec![])]);
        assert_that!(views.prune(&emptied)).is_equal_to(1);
        assert_that!(views.is_empty()).is_true();
    }

    #[test]
    fn a_code_block_turned_paragraph_loses_its_view() {
        let code = Node::new(NodeType::CodeBlock, Attrs::new(), vec![]);
        let id = code.id();
        let doc = Node::doc(vec![code.clone()]);
        let mut views = NodeViews::new();
        views.code_block(&doc, id).unwrap().open_picker();

        let changed = Node::doc(vec![code.with_type(NodeType::Paragraph, Attrs::new())]);
        views.prune(&changed);
        assert_that!(views.get(id).is_none()).is_true();
    }
}

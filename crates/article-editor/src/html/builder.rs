// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::model::{fragment, Attrs, Mark, Node, NodeType};
use crate::schema::Schema;

struct OpenNode {
    node_type: NodeType,
    attrs: Attrs,
    content: Vec<Node>,
}

/// Builds a schema-valid document from a stream of open/close/text events,
/// repairing structure as it goes: stray inline content gets a paragraph,
/// list children get a list item, and code blocks only ever receive
/// unmarked text.
pub struct DocBuilder<'s> {
    schema: &'s Schema,
    stack: Vec<OpenNode>,
    marks: Vec<Mark>,
}

impl<'s> DocBuilder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            stack: vec![OpenNode {
                node_type: NodeType::Doc,
                attrs: Attrs::new(),
                content: Vec::new(),
            }],
            marks: Vec::new(),
        }
    }

    fn top_type(&self) -> NodeType {
        self.stack
            .last()
            .map(|n| n.node_type)
            .unwrap_or(NodeType::Doc)
    }

    pub fn in_code_block(&self) -> bool {
        self.top_type() == NodeType::CodeBlock
    }

    fn push(&mut self, node_type: NodeType, attrs: Attrs) {
        self.stack.push(OpenNode {
            node_type,
            attrs,
            content: Vec::new(),
        });
    }

    /// Open a block node. Returns the depth to pass to [`Self::close_to`],
    /// or `None` when the node was dropped (e.g. structure inside a code
    /// block).
    pub fn open(&mut self, node_type: NodeType, attrs: Attrs) -> Option<usize> {
        if node_type.is_inline() || !self.schema.has_node(node_type) || self.in_code_block() {
            return None;
        }
        // Each iteration either pushes or pops, and pops stop at the doc.
        for _ in 0..64 {
            let top = self.top_type();
            if top.is_textblock() && self.stack.len() > 1 {
                // A textblock interrupted before receiving content leaves
                // no trace.
                if self.stack.last().is_some_and(|n| n.content.is_empty()) {
                    self.stack.pop();
                } else {
                    self.close_top();
                }
                continue;
            }
            if self.schema.allows_child(top, node_type) {
                let depth = self.stack.len();
                self.push(node_type, attrs);
                return Some(depth);
            }
            if top.is_list() {
                self.push(NodeType::ListItem, Attrs::new());
                continue;
            }
            if node_type == NodeType::ListItem
                && self.schema.allows_child(top, NodeType::BulletList)
            {
                self.push(NodeType::BulletList, Attrs::new());
                continue;
            }
            if self.stack.len() > 1 {
                self.close_top();
            } else {
                return None;
            }
        }
        None
    }

    /// Close everything opened at or after `depth`.
    pub fn close_to(&mut self, depth: usize) {
        while self.stack.len() > depth.max(1) {
            self.close_top();
        }
    }

    fn close_top(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(open) = self.stack.pop() else {
            return;
        };
        let attrs = match self.schema.compute_attrs(open.node_type, &open.attrs) {
            Ok(attrs) => attrs,
            Err(err) => match self.schema.compute_attrs(open.node_type, &Attrs::new()) {
                Ok(attrs) => {
                    tracing::debug!(%err, "dropping invalid attributes");
                    attrs
                }
                Err(err) => {
                    tracing::warn!(%err, "dropping node that cannot be repaired");
                    return;
                }
            },
        };
        let mut content = fragment::normalize(open.content);
        let min = self
            .schema
            .content_expr(open.node_type)
            .map(|e| e.min)
            .unwrap_or(0);
        if content.len() < min {
            content = self.schema.fill_content(open.node_type);
        }
        let node = Node::new(open.node_type, attrs, content);
        if let Some(parent) = self.stack.last_mut() {
            parent.content.push(node);
        }
    }

    fn ensure_inline(&mut self) -> bool {
        self.top_type().is_textblock()
            || self.open(NodeType::Paragraph, Attrs::new()).is_some()
    }

    pub fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.top_type().is_textblock() {
            if text.trim().is_empty() {
                return;
            }
            if !self.ensure_inline() {
                return;
            }
        }
        let marks = if self.top_type().allows_marks() {
            let mut set = Vec::new();
            for mark in &self.marks {
                if self.schema.has_mark(mark.mark_type) {
                    set = mark.add_to_set(&set);
                }
            }
            set
        } else {
            Vec::new()
        };
        if let Some(top) = self.stack.last_mut() {
            top.content.push(Node::text(text, marks));
        }
    }

    /// Add a leaf node (image, rule, hard break).
    pub fn leaf(&mut self, node_type: NodeType, attrs: Attrs) {
        if node_type.is_inline() {
            if self.in_code_block() {
                self.text("\n");
                return;
            }
            if !self.ensure_inline() || !self.schema.has_node(node_type) {
                return;
            }
            if let Some(top) = self.stack.last_mut() {
                top.content.push(Node::leaf(node_type, attrs));
            }
        } else if let Some(depth) = self.open(node_type, attrs) {
            self.close_to(depth);
        }
    }

    /// Activate a mark for following text. Returns the depth to pass to
    /// [`Self::pop_marks_to`].
    pub fn push_mark(&mut self, mark: Mark) -> usize {
        self.marks.push(mark);
        self.marks.len() - 1
    }

    pub fn pop_marks_to(&mut self, depth: usize) {
        self.marks.truncate(depth);
    }

    pub fn finish(mut self) -> Node {
        self.close_to(1);
        let schema = self.schema;
        let Some(root) = self.stack.pop() else {
            return schema.empty_doc();
        };
        let mut content = fragment::normalize(root.content);
        if content.is_empty() {
            content = schema.fill_content(NodeType::Doc);
        }
        let doc = Node::doc(content);
        match schema.check(&doc) {
            Ok(()) => doc,
            Err(err) => {
                tracing::warn!(%err, "builder produced an invalid document");
                schema.empty_doc()
            }
        }
    }
}

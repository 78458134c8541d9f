// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::Node;

#[derive(Clone, Copy, Debug)]
struct Level<'a> {
    node: &'a Node,
    index: usize,
    start: usize,
}

/// A document position resolved against the tree: the chain of ancestors
/// that contain it and, at each depth, which child it points into.
#[derive(Clone, Debug)]
pub struct ResolvedPos<'a> {
    pub pos: usize,
    path: Vec<Level<'a>>,
    text_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub fn resolve(doc: &'a Node, pos: usize) -> Option<Self> {
        if pos > doc.content_size() {
            return None;
        }
        let mut path = Vec::new();
        let mut node = doc;
        let mut start = 0;
        loop {
            let offset = pos - start;
            let mut child_pos = 0;
            let mut index = node.child_count();
            let mut descend = None;
            let mut text_offset = 0;
            for (i, child) in node.content().iter().enumerate() {
                let end = child_pos + child.node_size();
                if offset == child_pos {
                    index = i;
                    break;
                }
                if offset < end {
                    index = i;
                    if child.is_text() {
                        text_offset = offset - child_pos;
                    } else if !child.is_leaf() {
                        descend = Some((child, start + child_pos + 1));
                    } else {
                        return None;
                    }
                    break;
                }
                child_pos = end;
            }
            path.push(Level { node, index, start });
            match descend {
                Some((child, child_start)) => {
                    node = child;
                    start = child_start;
                }
                None => {
                    return Some(Self {
                        pos,
                        path,
                        text_offset,
                    })
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn node(&self, depth: usize) -> &'a Node {
        self.path[depth].node
    }

    pub fn parent(&self) -> &'a Node {
        self.node(self.depth())
    }

    pub fn doc(&self) -> &'a Node {
        self.node(0)
    }

    /// Index into `node(depth)` that this position points at.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Position of the start of `node(depth)`'s content.
    pub fn start(&self, depth: usize) -> usize {
        self.path[depth].start
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before `node(depth)`. Only meaningful for depth > 0.
    pub fn before(&self, depth: usize) -> usize {
        self.start(depth).saturating_sub(1)
    }

    pub fn after(&self, depth: usize) -> usize {
        self.end(depth) + 1
    }

    pub fn parent_offset(&self) -> usize {
        self.pos - self.start(self.depth())
    }

    /// Offset inside a text node when the position falls mid-run.
    pub fn text_offset(&self) -> usize {
        self.text_offset
    }

    pub fn node_after(&self) -> Option<&'a Node> {
        self.parent().child(self.index(self.depth()))
    }

    pub fn node_before(&self) -> Option<&'a Node> {
        let index = self.index(self.depth());
        if self.text_offset > 0 {
            return self.parent().child(index);
        }
        index.checked_sub(1).and_then(|i| self.parent().child(i))
    }

    pub fn at_textblock_start(&self) -> bool {
        self.parent().is_textblock() && self.parent_offset() == 0
    }

    pub fn at_textblock_end(&self) -> bool {
        self.parent().is_textblock()
            && self.parent_offset() == self.parent().content_size()
    }

    /// Deepest depth whose content contains `other`.
    pub fn shared_depth(&self, other: usize) -> usize {
        for depth in (1..=self.depth()).rev() {
            if self.start(depth) <= other && other <= self.end(depth) {
                return depth;
            }
        }
        0
    }

    /// Depth of the innermost ancestor matching `pred`.
    pub fn find_depth(&self, pred: impl Fn(&Node) -> bool) -> Option<usize> {
        (0..=self.depth()).rev().find(|d| pred(self.node(*d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attrs, NodeType};

    fn doc() -> Node {
        Node::doc(vec![
            Node::paragraph_with_text("ab"),
            Node::new(
                NodeType::Blockquote,
                Attrs::new(),
                vec![Node::paragraph_with_text("cd")],
            ),
        ])
    }

    #[test]
    fn resolves_inside_nested_textblocks() {
        let doc = doc();
        let rp = ResolvedPos::resolve(&doc, 7).unwrap();
        assert_eq!(rp.depth(), 2);
        assert_eq!(rp.parent().node_type(), NodeType::Paragraph);
        assert_eq!(rp.parent_offset(), 1);
        assert_eq!(rp.before(1), 4);
        assert_eq!(rp.after(2), 9);
    }

    #[test]
    fn resolves_between_blocks() {
        let doc = doc();
        let rp = ResolvedPos::resolve(&doc, 4).unwrap();
        assert_eq!(rp.depth(), 0);
        assert_eq!(rp.index(0), 1);
        assert_eq!(
            rp.node_after().unwrap().node_type(),
            NodeType::Blockquote
        );
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(ResolvedPos::resolve(&doc(), 11).is_none());
    }
}

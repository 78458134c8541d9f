// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Immutable document transforms built from primitive [`Step`]s.

pub mod map;
pub mod step;

pub use map::{Assoc, MapResult, Mapping, StepMap};
pub use step::{Applied, NodeShape, Step, StepError};

use crate::model::{AttrValue, Attrs, Mark, MarkType, Node, NodeType, ResolvedPos};

/// An accumulating sequence of steps over a document.
#[derive(Clone, Debug)]
pub struct Transform {
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    inverses: Vec<Vec<Step>>,
    mapping: Mapping,
}

impl Transform {
    pub fn new(doc: Node) -> Self {
        Self {
            before: doc.clone(),
            doc,
            steps: Vec::new(),
            inverses: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document the transform started from.
    pub fn before(&self) -> &Node {
        &self.before
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn step(&mut self, step: Step) -> Result<&mut Self, StepError> {
        let applied = step.apply(&self.doc)?;
        self.mapping.append_map(step.get_map(), None);
        self.doc = applied.doc;
        self.inverses.push(applied.inverse);
        self.steps.push(step);
        Ok(self)
    }

    /// Apply `step` if it fits the current document; report whether it did.
    pub fn maybe_step(&mut self, step: Step) -> bool {
        self.step(step).is_ok()
    }

    /// Mark map `n` as the mirror of map `m` so positions can recover
    /// through a deletion and its reinsertion.
    pub fn set_mirror(&mut self, n: usize, m: usize) {
        self.mapping.set_mirror(n, m);
    }

    /// The inverse of each step, indexed like [`Transform::steps`].
    pub fn step_inverses(&self) -> &[Vec<Step>] {
        &self.inverses
    }

    /// Steps that take `doc()` back to `before()`, in application order.
    pub fn inverted_steps(&self) -> Vec<Step> {
        self.inverses.iter().rev().flatten().cloned().collect()
    }

    pub fn insert(&mut self, pos: usize, content: Vec<Node>) -> Result<&mut Self, StepError> {
        self.step(Step::Insert { pos, content })
    }

    pub fn insert_text(
        &mut self,
        pos: usize,
        text: &str,
        marks: Vec<Mark>,
    ) -> Result<&mut Self, StepError> {
        if text.is_empty() {
            return Ok(self);
        }
        self.insert(pos, vec![Node::text(text, marks)])
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, StepError> {
        if from == to {
            return Ok(self);
        }
        self.step(Step::Delete { from, to })
    }

    /// Delete `[from, to)` wherever its ends sit. Content between the ends
    /// is removed at every depth, then the two sides are joined as deep as
    /// their node types allow. A right-hand textblock that cannot be joined
    /// gives its remaining text to the left-hand one, and the wrappers it
    /// leaves empty are removed.
    pub fn delete_range(&mut self, from: usize, to: usize) -> Result<&mut Self, StepError> {
        if from >= to {
            return Ok(self);
        }
        let (rf, rt) = resolve_pair(&self.doc, from, to)?;
        let mut shared = 0;
        while shared < rf.depth().min(rt.depth()) && rf.start(shared + 1) == rt.start(shared + 1) {
            shared += 1;
        }
        let (left, right) = (rf.depth() - shared, rt.depth() - shared);
        if left == 0 && right == 0 {
            return self.delete(from, to);
        }

        // Back to front, so each range is still valid when its turn comes.
        let mut ranges = Vec::new();
        for depth in (shared + 1..=rt.depth()).rev() {
            let end = if depth == rt.depth() { to } else { rt.before(depth + 1) };
            ranges.push((rt.start(depth), end));
        }
        ranges.push((
            if left > 0 { rf.after(shared + 1) } else { from },
            if right > 0 { rt.before(shared + 1) } else { to },
        ));
        for depth in shared + 1..=rf.depth() {
            let start = if depth == rf.depth() { from } else { rf.after(depth + 1) };
            ranges.push((start, rf.end(depth)));
        }
        let left_types: Vec<NodeType> = (shared + 1..=rf.depth())
            .map(|d| rf.node(d).node_type())
            .collect();
        let right_types: Vec<NodeType> = (shared + 1..=rt.depth())
            .map(|d| rt.node(d).node_type())
            .collect();

        for (a, b) in ranges {
            self.delete(a, b)?;
        }

        let mut joined = 0;
        while joined < left.min(right) && joinable(left_types[joined], right_types[joined]) {
            self.join(from + left - joined)?;
            joined += 1;
        }
        if joined == left.min(right) {
            return Ok(self);
        }
        match (left_types.last(), right_types.last()) {
            (Some(&a), Some(&b)) if a.is_textblock() && b.is_textblock() && joinable(a, b) => {
                let start = from + (left - joined) + (right - joined);
                self.absorb_textblock(from, start, shared + joined + 1)?;
            }
            _ => {}
        }
        Ok(self)
    }

    /// Move the content of the textblock starting at `start` to `into`,
    /// then remove that textblock together with any wrappers down from
    /// `floor` that held nothing else.
    fn absorb_textblock(
        &mut self,
        into: usize,
        start: usize,
        floor: usize,
    ) -> Result<(), StepError> {
        let block = ResolvedPos::resolve(&self.doc, start)
            .map(|rp| rp.parent())
            .filter(|n| n.is_textblock())
            .ok_or(StepError::Structure("join these blocks"))?;
        let content = block.content().to_vec();
        let size = block.content_size();
        if size > 0 {
            self.delete(start, start + size)?;
            self.insert(into, content)?;
        }
        let emptied = start + size;
        let rp = ResolvedPos::resolve(&self.doc, emptied).ok_or(StepError::OutOfRange(emptied))?;
        let mut depth = rp.depth();
        while depth > floor && rp.node(depth - 1).child_count() == 1 {
            depth -= 1;
        }
        let (a, b) = (rp.before(depth), rp.after(depth));
        self.delete(a, b)?;
        Ok(())
    }

    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<&mut Self, StepError> {
        if from >= to {
            return Ok(self);
        }
        self.step(Step::AddMark { from, to, mark })
    }

    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        mark_type: MarkType,
    ) -> Result<&mut Self, StepError> {
        if from >= to {
            return Ok(self);
        }
        self.step(Step::RemoveMark {
            from,
            to,
            mark_type,
        })
    }

    pub fn set_node_attr(
        &mut self,
        pos: usize,
        key: &str,
        value: impl Into<AttrValue>,
    ) -> Result<&mut Self, StepError> {
        self.step(Step::SetAttr {
            pos,
            key: key.to_owned(),
            value: value.into(),
        })
    }

    pub fn set_node_type(
        &mut self,
        pos: usize,
        node_type: NodeType,
        attrs: Attrs,
    ) -> Result<&mut Self, StepError> {
        self.step(Step::SetNodeType {
            pos,
            shape: NodeShape::new(node_type, attrs),
        })
    }

    pub fn split(&mut self, pos: usize, after: Option<NodeShape>) -> Result<&mut Self, StepError> {
        self.step(Step::Split { pos, after })
    }

    pub fn join(&mut self, pos: usize) -> Result<&mut Self, StepError> {
        self.step(Step::Join { pos })
    }

    pub fn wrap(
        &mut self,
        from: usize,
        to: usize,
        wrappers: Vec<NodeShape>,
    ) -> Result<&mut Self, StepError> {
        self.step(Step::Wrap { from, to, wrappers })
    }

    /// Unwrap the node starting at `pos`.
    pub fn unwrap_node(&mut self, pos: usize) -> Result<&mut Self, StepError> {
        let size = self
            .doc
            .node_at(pos)
            .filter(|n| !n.is_leaf())
            .map(Node::node_size)
            .ok_or(StepError::NoNode(pos))?;
        self.step(Step::Unwrap {
            pos,
            end: pos + size,
        })
    }

    /// Convert every textblock touching `[from, to]` to `node_type`.
    /// Converting to a code block strips marks and turns hard breaks into
    /// newlines.
    pub fn set_block_type(
        &mut self,
        from: usize,
        to: usize,
        node_type: NodeType,
        attrs: Attrs,
    ) -> Result<&mut Self, StepError> {
        let mut targets = Vec::new();
        self.doc.nodes_between(from, to.max(from + 1), &mut |node, pos| {
            if node.is_textblock() {
                let same = node.node_type() == node_type && *node.attrs() == attrs;
                if !same {
                    targets.push((pos, node.clone()));
                }
                return false;
            }
            true
        });
        for (pos, node) in targets {
            let pos = self.mapping.map(pos, Assoc::After);
            if node_type == NodeType::CodeBlock {
                self.flatten_for_code(pos, &node)?;
            }
            self.set_node_type(pos, node_type, attrs.clone())?;
        }
        Ok(self)
    }

    fn flatten_for_code(&mut self, pos: usize, block: &Node) -> Result<(), StepError> {
        let start = pos + 1;
        let end = start + block.content_size();
        for mark_type in block
            .content()
            .iter()
            .flat_map(|n| n.marks().iter().map(|m| m.mark_type))
            .collect::<std::collections::BTreeSet<_>>()
        {
            self.remove_mark(start, end, mark_type)?;
        }
        let mut offset = start;
        let mut breaks = Vec::new();
        for child in block.content() {
            if !child.is_text() {
                breaks.push((offset, child.node_type() == NodeType::HardBreak));
            }
            offset += child.node_size();
        }
        for (at, is_break) in breaks.into_iter().rev() {
            self.delete(at, at + 1)?;
            if is_break {
                self.insert_text(at, "\n", Vec::new())?;
            }
        }
        Ok(())
    }
}

/// Whether two nodes meeting at a deleted boundary can become one.
fn joinable(a: NodeType, b: NodeType) -> bool {
    if a.is_leaf() || b.is_leaf() {
        return false;
    }
    if a.is_textblock() && b.is_textblock() {
        return a == b || (a != NodeType::CodeBlock && b != NodeType::CodeBlock);
    }
    a == b
}

fn resolve_pair(
    doc: &Node,
    from: usize,
    to: usize,
) -> Result<(ResolvedPos<'_>, ResolvedPos<'_>), StepError> {
    let rf = ResolvedPos::resolve(doc, from).ok_or(StepError::OutOfRange(from))?;
    let rt = ResolvedPos::resolve(doc, to).ok_or(StepError::OutOfRange(to))?;
    Ok((rf, rt))
}

/// Move `steps`, which applied in order to some document, over `over`, a
/// mapping that starts from the same document. Steps whose target is gone
/// are dropped. Returns the moved steps and a mapping from the document
/// after the original steps to the document after the moved ones.
pub fn rebase_steps(steps: &[Step], over: &Mapping) -> (Vec<Step>, Mapping) {
    let mut mapping = Mapping::new();
    for step in steps.iter().rev() {
        mapping.append_map(step.get_map().invert(), None);
    }
    mapping.append_mapping(over);
    let mut rebased = Vec::with_capacity(steps.len());
    let mut map_from = steps.len();
    for step in steps {
        let mapped = step.map(&mapping.slice(map_from));
        map_from -= 1;
        if let Some(mapped) = mapped {
            mapping.append_map(mapped.get_map(), Some(map_from));
            rebased.push(mapped);
        }
    }
    (rebased, mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Node {
        Node::doc(vec![
            Node::paragraph_with_text("one"),
            Node::paragraph_with_text("two"),
            Node::paragraph_with_text("three"),
        ])
    }

    fn replay(doc: &Node, steps: &[Step]) -> Node {
        steps
            .iter()
            .fold(doc.clone(), |d, s| s.apply(&d).unwrap().doc)
    }

    #[test]
    fn inverted_steps_restore_the_start_document() {
        let mut tr = Transform::new(doc());
        tr.insert_text(2, "X", vec![]).unwrap();
        tr.split(3, None).unwrap();
        tr.add_mark(1, 3, Mark::new(MarkType::Bold)).unwrap();
        assert!(tr.doc_changed());
        assert_eq!(replay(tr.doc(), &tr.inverted_steps()), doc());
    }

    #[test]
    fn delete_range_joins_sibling_textblocks() {
        let mut tr = Transform::new(doc());
        // "o|ne" .. "th|ree"
        tr.delete_range(2, 13).unwrap();
        assert_eq!(tr.doc().child_count(), 1);
        assert_eq!(tr.doc().child(0).unwrap().text_content(), "oree");
        assert_eq!(replay(tr.doc(), &tr.inverted_steps()), doc());
    }

    #[test]
    fn delete_range_across_list_items_merges_them() {
        let item = |t: &str| {
            Node::new(NodeType::ListItem, Attrs::new(), vec![Node::paragraph_with_text(t)])
        };
        let d = Node::doc(vec![Node::new(
            NodeType::BulletList,
            Attrs::new(),
            vec![item("first"), item("second")],
        )]);
        let mut tr = Transform::new(d.clone());
        // "f|irst" .. "se|cond"
        tr.delete_range(4, 14).unwrap();
        let list = tr.doc().child(0).unwrap();
        assert_eq!(list.child_count(), 1);
        assert_eq!(list.child(0).unwrap().child_count(), 1);
        assert_eq!(list.text_content(), "fcond");
        assert_eq!(replay(tr.doc(), &tr.inverted_steps()), d);
    }

    #[test]
    fn delete_range_into_a_blockquote_takes_its_text() {
        let d = Node::doc(vec![
            Node::paragraph_with_text("abc"),
            Node::new(
                NodeType::Blockquote,
                Attrs::new(),
                vec![Node::paragraph_with_text("def")],
            ),
        ]);
        let mut tr = Transform::new(d.clone());
        // "ab|c" .. "d|ef"
        tr.delete_range(3, 8).unwrap();
        assert_eq!(tr.doc(), &Node::doc(vec![Node::paragraph_with_text("abef")]));
        assert_eq!(replay(tr.doc(), &tr.inverted_steps()), d);
    }

    #[test]
    fn delete_range_out_of_a_blockquote_keeps_the_quote() {
        let quote = |t: &str| {
            Node::new(NodeType::Blockquote, Attrs::new(), vec![Node::paragraph_with_text(t)])
        };
        let d = Node::doc(vec![quote("abc"), Node::paragraph_with_text("def")]);
        let mut tr = Transform::new(d.clone());
        // "ab|c" .. "d|ef"
        tr.delete_range(4, 9).unwrap();
        assert_eq!(tr.doc(), &Node::doc(vec![quote("abef")]));
        assert_eq!(replay(tr.doc(), &tr.inverted_steps()), d);
    }

    #[test]
    fn set_block_type_to_code_flattens_inline_content() {
        let d = Node::doc(vec![Node::paragraph(vec![
            Node::text("a", vec![Mark::new(MarkType::Bold)]),
            Node::leaf(NodeType::HardBreak, Attrs::new()),
            Node::text("b", vec![]),
        ])]);
        let mut tr = Transform::new(d.clone());
        tr.set_block_type(1, 1, NodeType::CodeBlock, Attrs::new())
            .unwrap();
        let block = tr.doc().child(0).unwrap();
        assert_eq!(block.node_type(), NodeType::CodeBlock);
        assert_eq!(block.child_count(), 1);
        assert_eq!(block.text_content(), "a\nb");
        assert_eq!(replay(tr.doc(), &tr.inverted_steps()), d);
    }

    #[test]
    fn rebased_insertions_land_after_concurrent_ones() {
        let base = Node::doc(vec![Node::paragraph_with_text("ab")]);
        let local = vec![Step::Insert {
            pos: 2,
            content: vec![Node::text("L", vec![])],
        }];
        let remote = Step::Insert {
            pos: 1,
            content: vec![Node::text("RR", vec![])],
        };
        let (moved, _) = rebase_steps(&local, &Mapping::from(remote.get_map()));
        let d = replay(&base, &[remote]);
        let d = replay(&d, &moved);
        assert_eq!(d.child(0).unwrap().text_content(), "RRaLb");
    }
}

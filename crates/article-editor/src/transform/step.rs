// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::map::{Assoc, MapRange, Mapping, StepMap};
use crate::model::{
    find_in_set, fragment, remove_from_set, AttrValue, Attrs, Mark, MarkType,
    Node, NodeType, ResolvedPos,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("position {0} is outside the document")]
    OutOfRange(usize),
    #[error("range {from}..{to} does not lie within one parent")]
    NotFlat { from: usize, to: usize },
    #[error("no node starts at {0}")]
    NoNode(usize),
    #[error("cannot {0} here")]
    Structure(&'static str),
}

/// Type and attributes of a node created by a step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeShape {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl NodeShape {
    pub fn new(node_type: NodeType, attrs: Attrs) -> Self {
        Self { node_type, attrs }
    }

    fn of(node: &Node) -> Self {
        Self::new(node.node_type(), node.attrs().clone())
    }
}

/// A primitive document change. Steps are plain data: they are what goes
/// over the wire and what the history stores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase")]
pub enum Step {
    /// Insert nodes at a position. All inline (into a textblock) or all
    /// block (between blocks).
    Insert { pos: usize, content: Vec<Node> },
    /// Delete a range whose ends share a parent.
    Delete { from: usize, to: usize },
    /// Split the parent of `pos` in two. The second half takes `after`'s
    /// shape, or the original's when absent.
    Split {
        pos: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after: Option<NodeShape>,
    },
    /// Join the nodes either side of `pos`.
    Join { pos: usize },
    /// Wrap the sibling range `from..to` in nested wrappers, outermost first.
    Wrap {
        from: usize,
        to: usize,
        wrappers: Vec<NodeShape>,
    },
    /// Replace the node spanning `pos..end` with its children.
    Unwrap { pos: usize, end: usize },
    SetAttr {
        pos: usize,
        key: String,
        value: AttrValue,
    },
    SetNodeType { pos: usize, shape: NodeShape },
    AddMark { from: usize, to: usize, mark: Mark },
    RemoveMark {
        from: usize,
        to: usize,
        #[serde(rename = "markType")]
        mark_type: MarkType,
    },
}

/// The document after a step and the steps that revert it.
#[derive(Clone, Debug)]
pub struct Applied {
    pub doc: Node,
    pub inverse: Vec<Step>,
}

fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos<'_>, StepError> {
    ResolvedPos::resolve(doc, pos).ok_or(StepError::OutOfRange(pos))
}

/// Rebuild the document with `node(depth)`'s content replaced.
fn rebuild(rp: &ResolvedPos<'_>, depth: usize, content: Vec<Node>) -> Node {
    let mut node = rp.node(depth).with_content(content);
    for d in (0..depth).rev() {
        let parent = rp.node(d);
        let mut siblings = parent.content().to_vec();
        siblings[rp.index(d)] = node;
        node = parent.with_content(siblings);
    }
    node
}

fn flat_range<'a>(
    doc: &'a Node,
    from: usize,
    to: usize,
) -> Result<(ResolvedPos<'a>, ResolvedPos<'a>), StepError> {
    if from > to {
        return Err(StepError::NotFlat { from, to });
    }
    let rf = resolve(doc, from)?;
    let rt = resolve(doc, to)?;
    let depth = rf.depth();
    if rt.depth() != depth || rt.start(depth) != rf.start(depth) {
        return Err(StepError::NotFlat { from, to });
    }
    Ok((rf, rt))
}

/// The node starting exactly at `pos`, with its index in its parent.
fn node_at<'a>(
    doc: &'a Node,
    pos: usize,
) -> Result<(ResolvedPos<'a>, usize, &'a Node), StepError> {
    let rp = resolve(doc, pos)?;
    if rp.text_offset() > 0 {
        return Err(StepError::NoNode(pos));
    }
    let index = rp.index(rp.depth());
    let node = rp
        .node_after()
        .filter(|n| !n.is_text())
        .ok_or(StepError::NoNode(pos))?;
    Ok((rp, index, node))
}

impl Step {
    pub fn apply(&self, doc: &Node) -> Result<Applied, StepError> {
        match self {
            Step::Insert { pos, content } => apply_insert(doc, *pos, content),
            Step::Delete { from, to } => apply_delete(doc, *from, *to),
            Step::Split { pos, after } => apply_split(doc, *pos, after.as_ref()),
            Step::Join { pos } => apply_join(doc, *pos),
            Step::Wrap { from, to, wrappers } => apply_wrap(doc, *from, *to, wrappers),
            Step::Unwrap { pos, end } => apply_unwrap(doc, *pos, *end),
            Step::SetAttr { pos, key, value } => {
                let (rp, index, node) = node_at(doc, *pos)?;
                let mut attrs = node.attrs().clone();
                let old = attrs.set(key, value.clone());
                let mut siblings = rp.parent().content().to_vec();
                siblings[index] = node.with_attrs(attrs);
                Ok(Applied {
                    doc: rebuild(&rp, rp.depth(), siblings),
                    inverse: vec![Step::SetAttr {
                        pos: *pos,
                        key: key.clone(),
                        value: old,
                    }],
                })
            }
            Step::SetNodeType { pos, shape } => {
                let (rp, index, node) = node_at(doc, *pos)?;
                if node.is_leaf() != shape.node_type.is_leaf() || shape.node_type.is_inline() {
                    return Err(StepError::Structure("change node type"));
                }
                let mut siblings = rp.parent().content().to_vec();
                siblings[index] = node.with_type(shape.node_type, shape.attrs.clone());
                Ok(Applied {
                    doc: rebuild(&rp, rp.depth(), siblings),
                    inverse: vec![Step::SetNodeType {
                        pos: *pos,
                        shape: NodeShape::of(node),
                    }],
                })
            }
            Step::AddMark { from, to, mark } => {
                let mut segments = Vec::new();
                let doc = map_marks(doc, *from, *to, &|set| mark.add_to_set(set), &mut segments);
                let inverse = merge_steps(segments.into_iter().filter_map(|(a, b, old)| {
                    if mark.is_in_set(&old) {
                        None
                    } else if let Some(prev) = find_in_set(mark.mark_type, &old) {
                        Some(Step::AddMark {
                            from: a,
                            to: b,
                            mark: prev.clone(),
                        })
                    } else {
                        Some(Step::RemoveMark {
                            from: a,
                            to: b,
                            mark_type: mark.mark_type,
                        })
                    }
                }));
                Ok(Applied { doc, inverse })
            }
            Step::RemoveMark {
                from,
                to,
                mark_type,
            } => {
                let mut segments = Vec::new();
                let doc = map_marks(
                    doc,
                    *from,
                    *to,
                    &|set| remove_from_set(*mark_type, set),
                    &mut segments,
                );
                let inverse = merge_steps(segments.into_iter().filter_map(|(a, b, old)| {
                    find_in_set(*mark_type, &old).map(|prev| Step::AddMark {
                        from: a,
                        to: b,
                        mark: prev.clone(),
                    })
                }));
                Ok(Applied { doc, inverse })
            }
        }
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Insert { pos, content } => StepMap::single(*pos, 0, fragment::size(content)),
            Step::Delete { from, to } => StepMap::single(*from, to.saturating_sub(*from), 0),
            Step::Split { pos, .. } => StepMap::single(*pos, 0, 2),
            Step::Join { pos } => StepMap::single(pos.saturating_sub(1), 2, 0),
            Step::Wrap { from, to, wrappers } => {
                let n = wrappers.len();
                StepMap::new(vec![
                    MapRange {
                        start: *from,
                        old: 0,
                        new: n,
                    },
                    MapRange {
                        start: *to,
                        old: 0,
                        new: n,
                    },
                ])
            }
            Step::Unwrap { pos, end } => StepMap::new(vec![
                MapRange {
                    start: *pos,
                    old: 1,
                    new: 0,
                },
                MapRange {
                    start: end.saturating_sub(1),
                    old: 1,
                    new: 0,
                },
            ]),
            Step::SetAttr { .. }
            | Step::SetNodeType { .. }
            | Step::AddMark { .. }
            | Step::RemoveMark { .. } => StepMap::empty(),
        }
    }

    /// This step moved through `mapping`, or `None` when the content it
    /// targeted no longer exists.
    pub fn map(&self, mapping: &Mapping) -> Option<Step> {
        match self {
            Step::Insert { pos, content } => {
                let r = mapping.map_result(*pos, Assoc::After);
                if r.deleted_across() {
                    return None;
                }
                Some(Step::Insert {
                    pos: r.pos,
                    content: content.clone(),
                })
            }
            Step::Delete { from, to } => {
                let (a, b) = map_range(mapping, *from, *to)?;
                Some(Step::Delete { from: a, to: b })
            }
            Step::Split { pos, after } => {
                let r = mapping.map_result(*pos, Assoc::After);
                if r.deleted_across() {
                    return None;
                }
                Some(Step::Split {
                    pos: r.pos,
                    after: after.clone(),
                })
            }
            Step::Join { pos } => {
                let a = mapping.map_result(pos.checked_sub(1)?, Assoc::After);
                let b = mapping.map_result(pos + 1, Assoc::Before);
                if (a.deleted_across() && b.deleted_across()) || b.pos != a.pos + 2 {
                    return None;
                }
                Some(Step::Join { pos: a.pos + 1 })
            }
            Step::Wrap { from, to, wrappers } => {
                let a = mapping.map_result(*from, Assoc::After);
                let b = mapping.map_result(*to, Assoc::Before);
                if (a.deleted_across() && b.deleted_across()) || b.pos < a.pos {
                    return None;
                }
                Some(Step::Wrap {
                    from: a.pos,
                    to: b.pos,
                    wrappers: wrappers.clone(),
                })
            }
            Step::Unwrap { pos, end } => {
                let a = mapping.map_result(*pos, Assoc::After);
                let b = mapping.map_result(*end, Assoc::Before);
                if a.deleted_after() || b.deleted_before() || b.pos < a.pos + 2 {
                    return None;
                }
                Some(Step::Unwrap {
                    pos: a.pos,
                    end: b.pos,
                })
            }
            Step::SetAttr { pos, key, value } => {
                let r = mapping.map_result(*pos, Assoc::After);
                if r.deleted_after() {
                    return None;
                }
                Some(Step::SetAttr {
                    pos: r.pos,
                    key: key.clone(),
                    value: value.clone(),
                })
            }
            Step::SetNodeType { pos, shape } => {
                let r = mapping.map_result(*pos, Assoc::After);
                if r.deleted_after() {
                    return None;
                }
                Some(Step::SetNodeType {
                    pos: r.pos,
                    shape: shape.clone(),
                })
            }
            Step::AddMark { from, to, mark } => {
                let (a, b) = map_range(mapping, *from, *to)?;
                Some(Step::AddMark {
                    from: a,
                    to: b,
                    mark: mark.clone(),
                })
            }
            Step::RemoveMark {
                from,
                to,
                mark_type,
            } => {
                let (a, b) = map_range(mapping, *from, *to)?;
                Some(Step::RemoveMark {
                    from: a,
                    to: b,
                    mark_type: *mark_type,
                })
            }
        }
    }
}

fn map_range(mapping: &Mapping, from: usize, to: usize) -> Option<(usize, usize)> {
    let a = mapping.map_result(from, Assoc::After);
    let b = mapping.map_result(to, Assoc::Before);
    if (a.deleted_across() && b.deleted_across()) || b.pos <= a.pos {
        return None;
    }
    Some((a.pos, b.pos))
}

fn apply_insert(doc: &Node, pos: usize, content: &[Node]) -> Result<Applied, StepError> {
    let rp = resolve(doc, pos)?;
    let parent = rp.parent();
    if content.is_empty() {
        return Ok(Applied {
            doc: doc.clone(),
            inverse: Vec::new(),
        });
    }
    let inline = content.iter().all(Node::is_inline);
    let block = content.iter().all(|n| !n.is_inline());
    if !((inline && parent.is_textblock()) || (block && !parent.is_textblock())) {
        return Err(StepError::Structure("insert this content"));
    }
    let offset = rp.parent_offset();
    let replaced = fragment::replace(parent.content(), offset, offset, content.to_vec())
        .ok_or(StepError::Structure("insert inside a leaf"))?;
    Ok(Applied {
        doc: rebuild(&rp, rp.depth(), replaced),
        inverse: vec![Step::Delete {
            from: pos,
            to: pos + fragment::size(content),
        }],
    })
}

fn apply_delete(doc: &Node, from: usize, to: usize) -> Result<Applied, StepError> {
    let (rf, rt) = flat_range(doc, from, to)?;
    if from == to {
        return Ok(Applied {
            doc: doc.clone(),
            inverse: Vec::new(),
        });
    }
    let parent = rf.parent();
    let (a, b) = (rf.parent_offset(), rt.parent_offset());
    let removed =
        fragment::cut(parent.content(), a, b).ok_or(StepError::NotFlat { from, to })?;
    let replaced = fragment::replace(parent.content(), a, b, Vec::new())
        .ok_or(StepError::NotFlat { from, to })?;
    Ok(Applied {
        doc: rebuild(&rf, rf.depth(), replaced),
        inverse: vec![Step::Insert {
            pos: from,
            content: removed,
        }],
    })
}

fn apply_split(doc: &Node, pos: usize, after: Option<&NodeShape>) -> Result<Applied, StepError> {
    let rp = resolve(doc, pos)?;
    let depth = rp.depth();
    if depth == 0 {
        return Err(StepError::Structure("split the document"));
    }
    let parent = rp.parent();
    let offset = rp.parent_offset();
    let size = parent.content_size();
    let left = fragment::cut(parent.content(), 0, offset)
        .ok_or(StepError::Structure("split inside a leaf"))?;
    let right = fragment::cut(parent.content(), offset, size)
        .ok_or(StepError::Structure("split inside a leaf"))?;
    let first = parent.with_content(fragment::normalize(left));
    let shape = after.cloned().unwrap_or_else(|| NodeShape::of(parent));
    if shape.node_type.is_leaf() {
        return Err(StepError::Structure("split into a leaf"));
    }
    let second = Node::new(shape.node_type, shape.attrs, fragment::normalize(right));

    let grand = rp.node(depth - 1);
    let index = rp.index(depth - 1);
    let mut siblings = grand.content().to_vec();
    siblings.splice(index..=index, [first, second]);
    Ok(Applied {
        doc: rebuild(&rp, depth - 1, siblings),
        inverse: vec![Step::Join { pos: pos + 1 }],
    })
}

fn apply_join(doc: &Node, pos: usize) -> Result<Applied, StepError> {
    let rp = resolve(doc, pos)?;
    if rp.text_offset() > 0 {
        return Err(StepError::Structure("join inside text"));
    }
    let depth = rp.depth();
    let parent = rp.parent();
    let index = rp.index(depth);
    let (Some(before), Some(after)) = (
        index.checked_sub(1).and_then(|i| parent.child(i)),
        parent.child(index),
    ) else {
        return Err(StepError::Structure("join without two siblings"));
    };
    if before.is_leaf() || after.is_leaf() {
        return Err(StepError::Structure("join leaf nodes"));
    }
    let mut content = before.content().to_vec();
    content.extend(after.content().iter().cloned());
    let joined = before.with_content(fragment::normalize(content));
    let mut siblings = parent.content().to_vec();
    siblings.splice(index - 1..=index, [joined]);
    Ok(Applied {
        doc: rebuild(&rp, depth, siblings),
        inverse: vec![Step::Split {
            pos: pos - 1,
            after: Some(NodeShape::of(after)),
        }],
    })
}

fn apply_wrap(
    doc: &Node,
    from: usize,
    to: usize,
    wrappers: &[NodeShape],
) -> Result<Applied, StepError> {
    let (rf, rt) = flat_range(doc, from, to)?;
    if wrappers.is_empty() || wrappers.iter().any(|w| w.node_type.is_leaf()) {
        return Err(StepError::Structure("wrap without wrappers"));
    }
    if rf.text_offset() > 0 || rt.text_offset() > 0 || rf.parent().is_textblock() {
        return Err(StepError::Structure("wrap inline content"));
    }
    let depth = rf.depth();
    let parent = rf.parent();
    let (a, b) = (rf.index(depth), rt.index(depth));
    let children = parent.content()[a..b].to_vec();
    let mut wrapped: Option<Node> = None;
    for shape in wrappers.iter().rev() {
        let content = match wrapped.take() {
            Some(inner) => vec![inner],
            None => children.clone(),
        };
        wrapped = Some(Node::new(shape.node_type, shape.attrs.clone(), content));
    }
    let mut siblings = parent.content().to_vec();
    siblings.splice(a..b, wrapped);
    let n = wrappers.len();
    Ok(Applied {
        doc: rebuild(&rf, depth, siblings),
        inverse: (0..n)
            .map(|k| Step::Unwrap {
                pos: from,
                end: to + 2 * (n - k),
            })
            .collect(),
    })
}

fn apply_unwrap(doc: &Node, pos: usize, end: usize) -> Result<Applied, StepError> {
    let (rp, index, node) = node_at(doc, pos)?;
    if node.is_leaf() || pos + node.node_size() != end {
        return Err(StepError::NoNode(pos));
    }
    let mut siblings = rp.parent().content().to_vec();
    siblings.splice(index..=index, node.content().iter().cloned());
    Ok(Applied {
        doc: rebuild(&rp, rp.depth(), fragment::normalize(siblings)),
        inverse: vec![Step::Wrap {
            from: pos,
            to: end - 2,
            wrappers: vec![NodeShape::of(node)],
        }],
    })
}

type Segment = (usize, usize, Vec<Mark>);

/// Rewrite the marks of text in `[from, to)` with `f`, recording the
/// original marks of every touched segment.
fn map_marks(
    doc: &Node,
    from: usize,
    to: usize,
    f: &dyn Fn(&[Mark]) -> Vec<Mark>,
    segments: &mut Vec<Segment>,
) -> Node {
    doc.with_content(map_marks_in(doc.content(), 0, from, to, f, segments))
}

fn map_marks_in(
    content: &[Node],
    start: usize,
    from: usize,
    to: usize,
    f: &dyn Fn(&[Mark]) -> Vec<Mark>,
    segments: &mut Vec<Segment>,
) -> Vec<Node> {
    let mut pos = start;
    let mut out = Vec::with_capacity(content.len());
    for child in content {
        let end = pos + child.node_size();
        if end <= from || pos >= to || child.is_leaf() {
            out.push(child.clone());
        } else if child.is_textblock() {
            if child.node_type().allows_marks() {
                let inner = mark_text(child.content(), pos + 1, from, to, f, segments);
                out.push(child.with_content(fragment::normalize(inner)));
            } else {
                out.push(child.clone());
            }
        } else {
            let inner = map_marks_in(child.content(), pos + 1, from, to, f, segments);
            out.push(child.with_content(inner));
        }
        pos = end;
    }
    out
}

fn mark_text(
    content: &[Node],
    start: usize,
    from: usize,
    to: usize,
    f: &dyn Fn(&[Mark]) -> Vec<Mark>,
    segments: &mut Vec<Segment>,
) -> Vec<Node> {
    let mut pos = start;
    let mut out = Vec::new();
    for child in content {
        let end = pos + child.node_size();
        if !child.is_text() || end <= from || pos >= to {
            out.push(child.clone());
            pos = end;
            continue;
        }
        let a = from.max(pos) - pos;
        let b = to.min(end) - pos;
        let text = child.text_str();
        if a > 0 {
            out.push(child.with_text(fragment::slice_chars(text, 0, a)));
        }
        let marked = f(child.marks());
        segments.push((pos + a, pos + b, child.marks().to_vec()));
        out.push(Node::text(fragment::slice_chars(text, a, b), marked));
        if b < end - pos {
            out.push(Node::text(
                fragment::slice_chars(text, b, end - pos),
                child.marks().to_vec(),
            ));
        }
        pos = end;
    }
    out
}

/// Coalesce adjacent mark steps that continue each other.
fn merge_steps(steps: impl Iterator<Item = Step>) -> Vec<Step> {
    let mut out: Vec<Step> = Vec::new();
    for step in steps {
        let merged = match (out.last_mut(), &step) {
            (
                Some(Step::AddMark { to, mark, .. }),
                Step::AddMark {
                    from: f,
                    to: t,
                    mark: m,
                },
            ) if *to == *f && mark == m => {
                *to = *t;
                true
            }
            (
                Some(Step::RemoveMark { to, mark_type, .. }),
                Step::RemoveMark {
                    from: f,
                    to: t,
                    mark_type: m,
                },
            ) if *to == *f && mark_type == m => {
                *to = *t;
                true
            }
            _ => false,
        };
        if !merged {
            out.push(step);
        }
    }
    out
}

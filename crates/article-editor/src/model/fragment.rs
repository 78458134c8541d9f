// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Flat operations over the children of a single node. Offsets are content
//! offsets (0 is the start of the first child). Text nodes may be cut at any
//! character; any other node must lie entirely inside or outside a range.

use super::Node;

pub fn size(content: &[Node]) -> usize {
    content.iter().map(Node::node_size).sum()
}

/// The child containing `pos` and that child's start offset. Returns `None`
/// when `pos` is at or past the end of the content.
pub fn find_index(content: &[Node], pos: usize) -> Option<(usize, usize)> {
    let mut offset = 0;
    for (i, child) in content.iter().enumerate() {
        let end = offset + child.node_size();
        if pos < end {
            return Some((i, offset));
        }
        offset = end;
    }
    None
}

/// Split a string after `n` characters.
pub fn split_chars(s: &str, n: usize) -> (&str, &str) {
    match s.char_indices().nth(n) {
        Some((byte, _)) => s.split_at(byte),
        None => (s, ""),
    }
}

pub fn slice_chars(s: &str, from: usize, to: usize) -> &str {
    let (_, rest) = split_chars(s, from);
    split_chars(rest, to.saturating_sub(from)).0
}

/// Copy out `[from, to)`. Fails if a non-text child straddles a boundary.
pub fn cut(content: &[Node], from: usize, to: usize) -> Option<Vec<Node>> {
    let mut out = Vec::new();
    let mut pos = 0;
    for child in content {
        let end = pos + child.node_size();
        if end > from && pos < to {
            if child.is_text() {
                let start = from.max(pos) - pos;
                let stop = to.min(end) - pos;
                if start == 0 && stop == end - pos {
                    out.push(child.clone());
                } else {
                    let text = slice_chars(child.text_str(), start, stop);
                    out.push(child.with_text(text));
                }
            } else if pos >= from && end <= to {
                out.push(child.clone());
            } else {
                return None;
            }
        }
        pos = end;
    }
    if to > pos {
        return None;
    }
    Some(out)
}

/// Replace `[from, to)` with `insert`, merging adjacent compatible text.
pub fn replace(
    content: &[Node],
    from: usize,
    to: usize,
    insert: Vec<Node>,
) -> Option<Vec<Node>> {
    let total = size(content);
    if from > to || to > total {
        return None;
    }
    let mut out = cut(content, 0, from)?;
    out.extend(insert);
    out.extend(cut(content, to, total)?);
    Some(normalize(out))
}

/// Drop empty text nodes and merge neighbouring text nodes with equal marks.
pub fn normalize(content: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(content.len());
    for node in content {
        if node.is_text() && node.text_str().is_empty() {
            continue;
        }
        if let Some(last) = out.last_mut() {
            if last.is_text() && node.is_text() && last.marks() == node.marks() {
                let merged = format!("{}{}", last.text_str(), node.text_str());
                *last = last.with_text(merged);
                continue;
            }
        }
        out.push(node);
    }
    out
}

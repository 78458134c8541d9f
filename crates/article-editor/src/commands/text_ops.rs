// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Typing, deleting, splitting and joining.

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use super::{CommandContext, CommandError};
use crate::link_policy::LinkAdmission;
use crate::model::{Attrs, Mark, MarkType, Node, NodeType, ResolvedPos};
use crate::state::{Bias, Selection};
use crate::transform::NodeShape;

/// Character standing in for inline leaves so offsets in block text match
/// document positions.
const OBJECT_REPLACEMENT: char = '\u{FFFC}';

pub(super) fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos<'_>, CommandError> {
    ResolvedPos::resolve(doc, pos).ok_or(CommandError::NotApplicable("resolving the selection"))
}

/// Text of a textblock with one character per position.
pub(super) fn block_text(block: &Node) -> String {
    block
        .content()
        .iter()
        .map(|child| {
            if child.is_text() {
                child.text_str().to_owned()
            } else {
                OBJECT_REPLACEMENT.to_string()
            }
        })
        .collect()
}

pub(super) fn range_has_mark(doc: &Node, from: usize, to: usize, mark_type: MarkType) -> bool {
    let mut found = false;
    doc.nodes_between(from, to, &mut |node, _| {
        if node.is_text() && node.marks().iter().any(|m| m.mark_type == mark_type) {
            found = true;
        }
        !found
    });
    found
}

pub(super) fn insert_text(ctx: &mut CommandContext<'_>, text: &str) -> Result<(), CommandError> {
    if text.is_empty() {
        return Ok(());
    }
    if !ctx.selection().is_empty() {
        delete_selection(ctx)?;
    }
    let pos = ctx.selection().head();
    let rp = resolve(ctx.doc(), pos)?;
    let block = rp.parent();
    if !block.is_textblock() {
        return Err(CommandError::NotApplicable("typing"));
    }
    let marks = if block.node_type().allows_marks() {
        ctx.insertion_marks(pos)
    } else {
        Vec::new()
    };
    let end = pos + text.chars().count();
    ctx.tx.insert_text(pos, text, marks)?;
    ctx.tx.set_selection(Selection::cursor(end));
    if text.chars().any(char::is_whitespace) {
        autolink(ctx, pos, end)?;
    }
    Ok(())
}

/// Link URL-like words completed by the text inserted at `[from, to)`.
fn autolink(ctx: &mut CommandContext<'_>, from: usize, to: usize) -> Result<(), CommandError> {
    if !ctx.autolink.enabled {
        return Ok(());
    }
    let rp = resolve(ctx.doc(), to)?;
    let block = rp.parent();
    if !block.node_type().allows_marks() {
        return Ok(());
    }
    let start = rp.start(rp.depth());
    let chars: Vec<char> = block_text(block).chars().take(to - start).collect();
    let inserted_at = from - start;
    let word_start = chars[..inserted_at]
        .iter()
        .rposition(|c| c.is_whitespace())
        .map_or(0, |i| i + 1);
    let window: String = chars[word_start..].iter().collect();

    let mut links = Vec::new();
    for candidate in ctx.autolink.find_candidates(&window) {
        let a = start + word_start + candidate.start;
        let b = start + word_start + candidate.end;
        let doc = ctx.doc();
        if range_has_mark(doc, a, b, MarkType::Link) || range_has_mark(doc, a, b, MarkType::Code) {
            continue;
        }
        match ctx.autolink.admit(&candidate.text) {
            LinkAdmission::Accepted { href, protocol } => {
                links.push((a, b, Mark::link(&href, &protocol)));
            }
            LinkAdmission::Rejected(reason) => {
                debug!(text = %candidate.text, %reason, "Not autolinking");
            }
        }
    }
    for (a, b, mark) in links {
        ctx.tx.add_mark(a, b, mark)?;
    }
    Ok(())
}

pub(super) fn delete_selection(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    let selection = ctx.selection();
    if selection.is_empty() {
        return Err(CommandError::NotApplicable("deleting an empty selection"));
    }
    match selection {
        Selection::Node { pos, end } => {
            ctx.tx.delete(pos, end)?;
            let emptied = resolve(ctx.doc(), pos)?.parent().child_count() == 0;
            if emptied {
                ctx.tx.insert(pos, vec![Node::paragraph(Vec::new())])?;
            }
            let next = Selection::near(ctx.doc(), pos, Bias::Forward);
            ctx.tx.set_selection(next);
        }
        Selection::Text { .. } => {
            let from = selection.from();
            ctx.tx.delete_range(from, selection.to())?;
            ctx.tx.set_selection(Selection::cursor(from));
        }
    }
    Ok(())
}

pub(super) fn delete_backward(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    let selection = ctx.selection();
    if !selection.is_empty() {
        return delete_selection(ctx);
    }
    let pos = selection.head();
    let rp = resolve(ctx.doc(), pos)?;
    if !rp.parent().is_textblock() {
        return Err(CommandError::NotApplicable("deleting backward"));
    }
    if rp.parent_offset() == 0 {
        return join_backward(ctx);
    }
    let before: String = block_text(rp.parent())
        .chars()
        .take(rp.parent_offset())
        .collect();
    let width = before
        .graphemes(true)
        .next_back()
        .map_or(1, |g| g.chars().count());
    ctx.tx.delete(pos - width, pos)?;
    ctx.tx.set_selection(Selection::cursor(pos - width));
    Ok(())
}

pub(super) fn split_block(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    if !ctx.selection().is_empty() {
        delete_selection(ctx)?;
    }
    let pos = ctx.selection().head();
    let rp = resolve(ctx.doc(), pos)?;
    let depth = rp.depth();
    let block = rp.parent();
    if !block.is_textblock() || depth == 0 {
        return Err(CommandError::NotApplicable("splitting"));
    }
    if block.node_type() == NodeType::CodeBlock {
        ctx.tx.insert_text(pos, "\n", Vec::new())?;
        ctx.tx.set_selection(Selection::cursor(pos + 1));
        return Ok(());
    }
    if depth >= 2 && rp.node(depth - 1).node_type() == NodeType::ListItem {
        if block.content_size() == 0 {
            return lift_list_item(ctx, pos);
        }
        ctx.tx.split(pos, None)?;
        ctx.tx.split(pos + 1, None)?;
        ctx.tx.set_selection(Selection::cursor(pos + 4));
        return Ok(());
    }
    let at_end = rp.parent_offset() == block.content_size();
    let after = (block.node_type() == NodeType::Heading && at_end)
        .then(|| NodeShape::new(NodeType::Paragraph, Attrs::new()));
    ctx.tx.split(pos, after)?;
    ctx.tx.set_selection(Selection::cursor(pos + 2));
    Ok(())
}

pub(super) fn join_backward(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    let selection = ctx.selection();
    let pos = selection.head();
    let rp = resolve(ctx.doc(), pos)?;
    let depth = rp.depth();
    if !selection.is_empty() || !rp.at_textblock_start() || depth == 0 {
        return Err(CommandError::NotApplicable("joining backward"));
    }
    let container = rp.node(depth - 1);
    let index = rp.index(depth - 1);
    let (before, after) = (rp.before(depth), rp.after(depth));
    let empty = rp.parent().content_size() == 0;

    if index == 0 {
        return match container.node_type() {
            NodeType::ListItem if depth >= 2 => {
                let item_index = rp.index(depth - 2);
                if item_index == 0 {
                    return lift_list_item(ctx, pos);
                }
                let item_before = rp.before(depth - 1);
                let prev_ends_in_text = rp
                    .node(depth - 2)
                    .child(item_index - 1)
                    .and_then(|item| item.content().last())
                    .is_some_and(Node::is_textblock);
                ctx.tx.join(item_before)?;
                if prev_ends_in_text {
                    ctx.tx.join(item_before - 1)?;
                }
                Ok(())
            }
            NodeType::Blockquote => {
                let quote_before = rp.before(depth - 1);
                if container.child_count() == 1 {
                    ctx.tx.unwrap_node(quote_before)?;
                } else {
                    let block = rp.parent().clone();
                    ctx.tx.delete(before, after)?;
                    ctx.tx.insert(quote_before, vec![block])?;
                    ctx.tx.set_selection(Selection::cursor(quote_before + 1));
                }
                Ok(())
            }
            _ => Err(CommandError::NotApplicable("joining backward")),
        };
    }

    let Some(prev) = container.child(index - 1) else {
        return Err(CommandError::NotApplicable("joining backward"));
    };
    if prev.is_textblock() {
        if empty && prev.node_type() != rp.parent().node_type() {
            ctx.tx.delete(before, after)?;
            ctx.tx.set_selection(Selection::cursor(before - 1));
        } else {
            ctx.tx.join(before)?;
        }
    } else if prev.is_leaf() {
        ctx.tx.delete(before - 1, before)?;
    } else if empty {
        ctx.tx.delete(before, after)?;
        let next = Selection::near(ctx.doc(), before, Bias::Backward);
        ctx.tx.set_selection(next);
    } else {
        return Err(CommandError::NotApplicable("joining backward"));
    }
    Ok(())
}

/// Move the list item around `pos` out of its list. Items after it stay in
/// a list of their own.
pub(super) fn lift_list_item(ctx: &mut CommandContext<'_>, pos: usize) -> Result<(), CommandError> {
    let rp = resolve(ctx.doc(), pos)?;
    let depth = rp
        .find_depth(|n| n.node_type() == NodeType::ListItem)
        .filter(|d| *d >= 1)
        .ok_or(CommandError::NotApplicable("lifting a list item"))?;
    let list = rp.node(depth - 1);
    let index = rp.index(depth - 1);
    let count = list.child_count();
    let (item_before, item_after) = (rp.before(depth), rp.after(depth));
    let list_before = rp.before(depth - 1);
    let item = rp.node(depth).clone();

    if index + 1 < count {
        ctx.tx.split(item_after, None)?;
    }
    if index == 0 {
        ctx.tx.unwrap_node(list_before)?;
        ctx.tx.unwrap_node(list_before)?;
        ctx.tx.set_selection(Selection::cursor(pos - 2));
    } else {
        ctx.tx.delete(item_before, item_after)?;
        ctx.tx.insert(item_before + 1, item.content().to_vec())?;
        ctx.tx.set_selection(Selection::cursor(pos));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::super::test_support::{run, state_with, try_run};
    use super::super::Command;
    use super::*;

    fn para(text: &str) -> Node {
        Node::paragraph_with_text(text)
    }

    fn list(items: &[&str]) -> Node {
        Node::new(
            NodeType::BulletList,
            Attrs::new(),
            items
                .iter()
                .map(|t| Node::new(NodeType::ListItem, Attrs::new(), vec![para(t)]))
                .collect(),
        )
    }

    fn texts(doc: &Node) -> Vec<String> {
        doc.content().iter().map(Node::text_content).collect()
    }

    #[test]
    fn typing_replaces_the_selection() {
        let s = state_with(Node::doc(vec![para("hello")]), Selection::text(2, 5));
        let s = run(&s, &[Command::InsertText { text: "ipp".into() }]);
        assert_that!(s.doc().text_content()).is_equal_to("hippo".to_owned());
        assert_that!(s.selection()).is_equal_to(Selection::cursor(5));
    }

    #[test]
    fn typing_a_space_after_a_url_links_it() {
        let s = state_with(Node::doc(vec![para("see example.org")]), Selection::cursor(16));
        let s = run(&s, &[Command::InsertText { text: " ".into() }]);
        let marks = s.doc().marks_at(10);
        assert_that!(marks).has_length(1);
        assert_that!(marks[0].attrs.get_str("href")).is_equal_to(Some("https://example.org/"));
    }

    #[test]
    fn javascript_urls_are_never_autolinked() {
        let s = state_with(Node::doc(vec![para("javascript:alert(1)")]), Selection::cursor(20));
        let s = run(&s, &[Command::InsertText { text: " ".into() }]);
        assert_that!(range_has_mark(s.doc(), 1, 20, MarkType::Link)).is_false();
    }

    #[test]
    fn backspace_removes_a_whole_grapheme() {
        let s = state_with(Node::doc(vec![para("ae\u{301}")]), Selection::cursor(4));
        let s = run(&s, &[Command::DeleteBackward]);
        assert_that!(s.doc().text_content()).is_equal_to("a".to_owned());
    }

    #[test]
    fn backspace_at_block_start_joins() {
        let s = state_with(Node::doc(vec![para("ab"), para("cd")]), Selection::cursor(5));
        let s = run(&s, &[Command::DeleteBackward]);
        assert_that!(texts(s.doc())).is_equal_to(vec!["abcd".to_owned()]);
        assert_that!(s.selection()).is_equal_to(Selection::cursor(3));
    }

    #[test]
    fn backspace_in_the_first_block_is_not_applicable() {
        let s = state_with(Node::doc(vec![para("ab")]), Selection::cursor(1));
        assert_that!(try_run(&s, &[Command::DeleteBackward])).is_err();
    }

    #[test]
    fn enter_at_the_end_of_a_heading_starts_a_paragraph() {
        let heading = Node::new(
            NodeType::Heading,
            Attrs::new().with("level", 1),
            vec![Node::text("Title", vec![])],
        );
        let s = state_with(Node::doc(vec![heading]), Selection::cursor(6));
        let s = run(&s, &[Command::SplitBlock]);
        assert_that!(s.doc().child(1).unwrap().node_type()).is_equal_to(NodeType::Paragraph);
        assert_that!(s.selection()).is_equal_to(Selection::cursor(8));
    }

    #[test]
    fn enter_in_a_code_block_inserts_a_newline() {
        let code = Node::new(NodeType::CodeBlock, Attrs::new(), vec![Node::text("ab", vec![])]);
        let s = state_with(Node::doc(vec![code]), Selection::cursor(2));
        let s = run(&s, &[Command::SplitBlock]);
        assert_that!(s.doc().child_count()).is_equal_to(1);
        assert_that!(s.doc().text_content()).is_equal_to("a\nb".to_owned());
    }

    #[test]
    fn enter_in_a_list_item_adds_an_item() {
        let s = state_with(Node::doc(vec![list(&["ab"])]), Selection::cursor(4));
        let s = run(&s, &[Command::SplitBlock]);
        let l = s.doc().child(0).unwrap();
        assert_that!(l.child_count()).is_equal_to(2);
        assert_that!(l.child(1).unwrap().text_content()).is_equal_to("b".to_owned());
        assert_that!(s.selection()).is_equal_to(Selection::cursor(8));
    }

    #[test]
    fn enter_in_an_empty_last_item_leaves_the_list() {
        let s = state_with(Node::doc(vec![list(&["a", ""])]), Selection::cursor(8));
        let s = run(&s, &[Command::SplitBlock]);
        assert_that!(s.doc().child_count()).is_equal_to(2);
        assert_that!(s.doc().child(0).unwrap().child_count()).is_equal_to(1);
        assert_that!(s.doc().child(1).unwrap().node_type()).is_equal_to(NodeType::Paragraph);
        assert_that!(s.selection()).is_equal_to(Selection::cursor(8));
    }

    #[test]
    fn backspace_at_the_start_of_a_second_item_merges_it() {
        let s = state_with(Node::doc(vec![list(&["a", "b"])]), Selection::cursor(8));
        let s = run(&s, &[Command::DeleteBackward]);
        let l = s.doc().child(0).unwrap();
        assert_that!(l.child_count()).is_equal_to(1);
        assert_that!(l.text_content()).is_equal_to("ab".to_owned());
        assert_that!(s.selection()).is_equal_to(Selection::cursor(4));
    }

    #[test]
    fn deleting_across_blocks_joins_them() {
        let s = state_with(
            Node::doc(vec![para("one"), para("two"), para("three")]),
            Selection::text(2, 13),
        );
        let s = run(&s, &[Command::DeleteSelection]);
        assert_that!(texts(s.doc())).is_equal_to(vec!["oree".to_owned()]);
    }

    #[test]
    fn typing_over_a_selection_spanning_list_items_merges_them() {
        let s = state_with(Node::doc(vec![list(&["first", "second"])]), Selection::text(4, 14));
        let s = run(&s, &[Command::InsertText { text: "!".into() }]);
        let l = s.doc().child(0).unwrap();
        assert_that!(l.child_count()).is_equal_to(1);
        assert_that!(l.text_content()).is_equal_to("f!cond".to_owned());
        assert_that!(s.selection()).is_equal_to(Selection::cursor(5));
    }

    #[test]
    fn deleting_into_a_blockquote_pulls_its_text_out() {
        let quote = Node::new(NodeType::Blockquote, Attrs::new(), vec![para("def")]);
        let s = state_with(Node::doc(vec![para("abc"), quote]), Selection::text(3, 8));
        let s = run(&s, &[Command::DeleteSelection]);
        assert_that!(s.doc()).is_equal_to(&Node::doc(vec![para("abef")]));
        assert_that!(s.selection()).is_equal_to(Selection::cursor(3));
    }

    #[test]
    fn backspace_over_a_paragraph_and_list_keeps_the_list_tail() {
        let s = state_with(
            Node::doc(vec![para("abc"), list(&["one", "two"])]),
            Selection::text(2, 9),
        );
        let s = run(&s, &[Command::DeleteBackward]);
        assert_that!(texts(s.doc())).is_equal_to(vec!["ane".to_owned(), "two".to_owned()]);
        assert_that!(s.doc().child(1).unwrap().node_type()).is_equal_to(NodeType::BulletList);
    }

    #[test]
    fn deleting_the_only_image_leaves_a_paragraph() {
        let image = Node::leaf(NodeType::Image, Attrs::new().with("src", "a.png").with("alt", ""));
        let s = state_with(Node::doc(vec![image]), Selection::Node { pos: 0, end: 1 });
        let s = run(&s, &[Command::DeleteSelection]);
        assert_that!(s.doc().child(0).unwrap().node_type()).is_equal_to(NodeType::Paragraph);
        assert_that!(s.selection()).is_equal_to(Selection::cursor(1));
    }
}

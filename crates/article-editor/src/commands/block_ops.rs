// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Block-level commands: block types, wrappers, lists and inserted nodes.

use super::text_ops::{delete_selection, resolve};
use super::{CommandContext, CommandError};
use crate::model::{fragment, AttrValue, Attrs, Node, NodeId, NodeType};
use crate::state::{Bias, EditorState, Selection};
use crate::transform::NodeShape;

fn textblocks_in(doc: &Node, from: usize, to: usize) -> Vec<&Node> {
    let mut blocks = Vec::new();
    doc.nodes_between(from, to.max(from + 1), &mut |node, _| {
        if node.is_textblock() {
            blocks.push(node);
            return false;
        }
        true
    });
    blocks
}

/// Whether the selection sits in blocks of `node_type`. Textblock types
/// must cover every selected textblock; wrappers must enclose the start.
pub fn block_active(state: &EditorState, node_type: NodeType) -> bool {
    let selection = state.selection();
    let doc = state.doc();
    if node_type.is_textblock() {
        let blocks = textblocks_in(doc, selection.from(), selection.to());
        return !blocks.is_empty() && blocks.iter().all(|b| b.node_type() == node_type);
    }
    let Some(rp) = crate::model::ResolvedPos::resolve(doc, selection.from()) else {
        return false;
    };
    if node_type.is_list() {
        return rp
            .find_depth(|n| n.node_type().is_list())
            .is_some_and(|d| rp.node(d).node_type() == node_type);
    }
    rp.find_depth(|n| n.node_type() == node_type).is_some()
}

pub fn heading_active(state: &EditorState, level: u8) -> bool {
    let selection = state.selection();
    let blocks = textblocks_in(state.doc(), selection.from(), selection.to());
    !blocks.is_empty()
        && blocks.iter().all(|b| {
            b.node_type() == NodeType::Heading
                && b.attrs().get_int("level") == Some(i64::from(level))
        })
}

fn set_block_type(
    ctx: &mut CommandContext<'_>,
    node_type: NodeType,
    attrs: Attrs,
) -> Result<(), CommandError> {
    let selection = ctx.selection();
    if selection.is_node() {
        return Err(CommandError::NotApplicable("changing the type of a node"));
    }
    let attrs = ctx.start.schema().compute_attrs(node_type, &attrs)?;
    let (from, to) = (selection.from(), selection.to());
    if textblocks_in(ctx.doc(), from, to).is_empty() {
        return Err(CommandError::NotApplicable("changing the block type"));
    }
    ctx.tx.set_block_type(from, to, node_type, attrs)?;
    Ok(())
}

pub(super) fn set_paragraph(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    set_block_type(ctx, NodeType::Paragraph, Attrs::new())
}

pub(super) fn toggle_heading(ctx: &mut CommandContext<'_>, level: u8) -> Result<(), CommandError> {
    if !(1..=6).contains(&level) {
        return Err(CommandError::NotApplicable("a heading of that level"));
    }
    if heading_active(ctx.start, level) {
        set_paragraph(ctx)
    } else {
        set_block_type(ctx, NodeType::Heading, Attrs::new().with("level", i64::from(level)))
    }
}

pub(super) fn toggle_code_block(
    ctx: &mut CommandContext<'_>,
    language: Option<&str>,
) -> Result<(), CommandError> {
    if block_active(ctx.start, NodeType::CodeBlock) {
        set_paragraph(ctx)
    } else {
        let attrs = Attrs::new().with("language", AttrValue::from(language));
        set_block_type(ctx, NodeType::CodeBlock, attrs)
    }
}

/// The span of sibling blocks covering `[from, to]`, as positions in the
/// parent that holds them.
fn block_range(doc: &Node, from: usize, to: usize) -> Result<(usize, usize, usize), CommandError> {
    let rf = resolve(doc, from)?;
    let rt = resolve(doc, to)?;
    let mut depth = rf.shared_depth(to);
    if rf.node(depth).is_textblock() {
        depth = depth
            .checked_sub(1)
            .ok_or(CommandError::NotApplicable("wrapping"))?;
    }
    let start = if rf.depth() > depth { rf.before(depth + 1) } else { from };
    let end = if rt.depth() > depth { rt.after(depth + 1) } else { to };
    Ok((start, end, depth))
}

pub(super) fn toggle_blockquote(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    let selection = ctx.selection();
    if block_active(ctx.start, NodeType::Blockquote) {
        let rp = resolve(ctx.doc(), selection.from())?;
        let depth = rp
            .find_depth(|n| n.node_type() == NodeType::Blockquote)
            .ok_or(CommandError::NotApplicable("lifting out of a quote"))?;
        let at = rp.before(depth);
        ctx.tx.unwrap_node(at)?;
        return Ok(());
    }
    let (start, end, _) = block_range(ctx.doc(), selection.from(), selection.to())?;
    ctx.tx.wrap(
        start,
        end,
        vec![NodeShape::new(NodeType::Blockquote, Attrs::new())],
    )?;
    Ok(())
}

pub(super) fn toggle_list(ctx: &mut CommandContext<'_>, list_type: NodeType) -> Result<(), CommandError> {
    let selection = ctx.selection();
    let attrs = ctx.start.schema().compute_attrs(list_type, &Attrs::new())?;
    let rp = resolve(ctx.doc(), selection.from())?;
    if let Some(depth) = rp.find_depth(|n| n.node_type().is_list()).filter(|d| *d > 0) {
        let list = rp.node(depth);
        let list_pos = rp.before(depth);
        if !block_active(ctx.start, list_type) {
            ctx.tx.set_node_type(list_pos, list_type, attrs)?;
            return Ok(());
        }
        let mut items = Vec::with_capacity(list.child_count());
        let mut at = list_pos + 1;
        for item in list.content() {
            items.push(at);
            at += item.node_size();
        }
        for item_pos in items.into_iter().rev() {
            ctx.tx.unwrap_node(item_pos)?;
        }
        ctx.tx.unwrap_node(list_pos)?;
        return Ok(());
    }

    let (start, end, depth) = block_range(ctx.doc(), selection.from(), selection.to())?;
    let rf = resolve(ctx.doc(), start)?;
    let parent = rf.node(depth);
    let first = rf.index(depth);
    let mut children = Vec::new();
    let mut at = start;
    for child in parent.content().iter().skip(first) {
        if at >= end {
            break;
        }
        children.push((at, child.node_size()));
        at += child.node_size();
    }
    let count = children.len();
    for (pos, size) in children.into_iter().rev() {
        ctx.tx.wrap(
            pos,
            pos + size,
            vec![NodeShape::new(NodeType::ListItem, Attrs::new())],
        )?;
    }
    ctx.tx.wrap(start, end + 2 * count, vec![NodeShape::new(list_type, attrs)])?;
    Ok(())
}

pub(super) fn update_attributes(
    ctx: &mut CommandContext<'_>,
    id: NodeId,
    attrs: &Attrs,
) -> Result<(), CommandError> {
    let (pos, node) = ctx.doc().find_by_id(id).ok_or(CommandError::NoSuchNode(id))?;
    let changes: Vec<(String, AttrValue)> = attrs
        .iter()
        .filter(|(key, value)| node.attrs().get(key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    for (key, value) in changes {
        ctx.tx.set_node_attr(pos, &key, value)?;
    }
    Ok(())
}

pub(super) fn insert_content(ctx: &mut CommandContext<'_>, content: Vec<Node>) -> Result<(), CommandError> {
    if content.is_empty() {
        return Ok(());
    }
    if !ctx.selection().is_empty() {
        delete_selection(ctx)?;
    }
    let pos = ctx.selection().head();
    insert_content_at(ctx, pos, content)
}

/// Insert at `pos`. Block content landing inside a textblock goes before
/// or after it at its edges, replaces it when it is an empty paragraph,
/// and splits it otherwise.
pub(super) fn insert_content_at(
    ctx: &mut CommandContext<'_>,
    pos: usize,
    content: Vec<Node>,
) -> Result<(), CommandError> {
    if content.is_empty() {
        return Ok(());
    }
    let size = fragment::size(&content);
    let rp = resolve(ctx.doc(), pos)?;
    let in_textblock = rp.parent().is_textblock();

    if content.iter().all(Node::is_inline) {
        if !in_textblock {
            return Err(CommandError::NotApplicable("inserting inline content here"));
        }
        ctx.tx.insert(pos, content)?;
        ctx.tx.set_selection(Selection::cursor(pos + size));
        return Ok(());
    }
    if content.iter().any(Node::is_inline) {
        return Err(CommandError::NotApplicable("mixing inline and block content"));
    }

    let at = if in_textblock {
        let depth = rp.depth();
        let block = rp.parent();
        let (before, after) = (rp.before(depth), rp.after(depth));
        if block.node_type() == NodeType::Paragraph && block.content_size() == 0 {
            ctx.tx.delete(before, after)?;
            before
        } else if rp.parent_offset() == 0 {
            before
        } else if rp.at_textblock_end() {
            after
        } else {
            ctx.tx.split(pos, None)?;
            pos + 1
        }
    } else {
        pos
    };
    let last_is_leaf = content.last().is_some_and(Node::is_leaf);
    ctx.tx.insert(at, content)?;
    let end = at + size;
    let selection = if last_is_leaf {
        Selection::node(ctx.doc(), end - 1)
            .unwrap_or_else(|| Selection::near(ctx.doc(), end, Bias::Forward))
    } else {
        Selection::near(ctx.doc(), end, Bias::Backward)
    };
    ctx.tx.set_selection(selection);
    Ok(())
}

pub(super) fn insert_image(
    ctx: &mut CommandContext<'_>,
    src: &str,
    alt: &str,
    title: Option<&str>,
) -> Result<(), CommandError> {
    let attrs = Attrs::new()
        .with("src", src)
        .with("alt", alt)
        .with("title", AttrValue::from(title));
    let image = ctx
        .start
        .schema()
        .create_and_fill(NodeType::Image, &attrs, Vec::new())?;
    insert_content(ctx, vec![image])
}

pub(super) fn insert_horizontal_rule(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    let rule = ctx
        .start
        .schema()
        .create_and_fill(NodeType::HorizontalRule, &Attrs::new(), Vec::new())?;
    insert_content(ctx, vec![rule])
}

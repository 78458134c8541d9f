// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use tracing::warn;

use super::text_ops::resolve;
use super::{CommandContext, CommandError};
use crate::link_policy::LinkAdmission;
use crate::model::{find_in_set, Mark, MarkType, Node};
use crate::state::Selection;

/// The extent of the link under `pos` and its mark. A cursor right after
/// the last character of a link counts as inside it.
pub fn link_range(doc: &Node, pos: usize) -> Option<(usize, usize, Mark)> {
    let rp = resolve(doc, pos).ok()?;
    let block = rp.parent();
    if !block.is_textblock() {
        return None;
    }
    let start = rp.start(rp.depth());
    let mut spans = Vec::with_capacity(block.child_count());
    let mut at = start;
    for child in block.content() {
        let end = at + child.node_size();
        spans.push((at, end, find_in_set(MarkType::Link, child.marks()).cloned()));
        at = end;
    }
    let hit = spans
        .iter()
        .position(|(a, b, link)| link.is_some() && *a <= pos && pos <= *b && (*a < pos || pos < *b))?;
    let mark = spans[hit].2.clone()?;
    let same = |i: usize| spans[i].2.as_ref() == Some(&mark);
    let mut first = hit;
    while first > 0 && same(first - 1) {
        first -= 1;
    }
    let mut last = hit;
    while last + 1 < spans.len() && same(last + 1) {
        last += 1;
    }
    Some((spans[first].0, spans[last].1, mark))
}

pub(super) fn set_link(ctx: &mut CommandContext<'_>, candidate: &str) -> Result<(), CommandError> {
    let (href, protocol) = match ctx.links.admit(candidate) {
        LinkAdmission::Accepted { href, protocol } => (href, protocol),
        LinkAdmission::Rejected(reason) => {
            warn!(candidate, %reason, "Refusing to set link");
            return Err(reason.into());
        }
    };
    let mark = Mark::link(&href, &protocol);
    let selection = ctx.selection();
    if selection.is_node() {
        return Err(CommandError::NotApplicable("linking a node"));
    }
    if !selection.is_empty() {
        ctx.tx.add_mark(selection.from(), selection.to(), mark)?;
        return Ok(());
    }
    let pos = selection.head();
    if let Some((from, to, _)) = link_range(ctx.doc(), pos) {
        ctx.tx.add_mark(from, to, mark)?;
        return Ok(());
    }
    if !resolve(ctx.doc(), pos)?.parent().node_type().allows_marks() {
        return Err(CommandError::NotApplicable("linking inside code"));
    }
    let marks = mark.add_to_set(&ctx.insertion_marks(pos));
    ctx.tx.insert_text(pos, &href, marks)?;
    ctx.tx
        .set_selection(Selection::cursor(pos + href.chars().count()));
    Ok(())
}

pub(super) fn unset_link(ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    let selection = ctx.selection();
    let (from, to) = if selection.is_empty() {
        let (from, to, _) = link_range(ctx.doc(), selection.head())
            .ok_or(CommandError::NotApplicable("removing a link"))?;
        (from, to)
    } else {
        (selection.from(), selection.to())
    };
    ctx.tx.remove_mark(from, to, MarkType::Link)?;
    Ok(())
}

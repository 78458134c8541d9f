// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::{links, CommandContext, CommandError};
use crate::model::{remove_from_set, Mark, MarkType, NodeType};
use crate::state::{EditorState, Selection};

/// Whether `mark_type` is on: at a cursor, the marks the next character
/// would get; over a range, every character of markable text carries it.
pub fn mark_active(state: &EditorState, mark_type: MarkType) -> bool {
    let selection = state.selection();
    if selection.is_empty() {
        return state
            .marks_at_cursor()
            .iter()
            .any(|m| m.mark_type == mark_type);
    }
    let mut any_text = false;
    let mut all = true;
    state
        .doc()
        .nodes_between(selection.from(), selection.to(), &mut |node, _| {
            if node.node_type() == NodeType::CodeBlock {
                return false;
            }
            if node.is_text() {
                any_text = true;
                all &= node.marks().iter().any(|m| m.mark_type == mark_type);
            }
            true
        });
    any_text && all
}

fn ensure_in_schema(ctx: &CommandContext<'_>, mark_type: MarkType) -> Result<(), CommandError> {
    if ctx.start.schema().has_mark(mark_type) {
        Ok(())
    } else {
        Err(CommandError::NotInSchema(mark_type.to_string()))
    }
}

pub(super) fn toggle_mark(ctx: &mut CommandContext<'_>, mark_type: MarkType) -> Result<(), CommandError> {
    ensure_in_schema(ctx, mark_type)?;
    if mark_type == MarkType::Link {
        return links::unset_link(ctx);
    }
    if mark_active(ctx.start, mark_type) {
        unset_mark(ctx, mark_type)
    } else {
        set_mark(ctx, Mark::new(mark_type))
    }
}

pub(super) fn set_mark(ctx: &mut CommandContext<'_>, mark: Mark) -> Result<(), CommandError> {
    ensure_in_schema(ctx, mark.mark_type)?;
    if mark.mark_type == MarkType::Link {
        let href = mark.attrs.get_str("href").unwrap_or_default().to_owned();
        return links::set_link(ctx, &href);
    }
    let attrs = ctx
        .start
        .schema()
        .compute_mark_attrs(mark.mark_type, &mark.attrs)
        .ok_or(CommandError::NotApplicable("setting a mark with those attributes"))?;
    let mark = Mark::with_attrs(mark.mark_type, attrs);
    match ctx.selection() {
        Selection::Node { .. } => Err(CommandError::NotApplicable("marking a node")),
        selection if selection.is_empty() => {
            let marks = ctx.insertion_marks(selection.head());
            ctx.tx.set_stored_marks(Some(mark.add_to_set(&marks)));
            Ok(())
        }
        selection => {
            ctx.tx.add_mark(selection.from(), selection.to(), mark)?;
            Ok(())
        }
    }
}

pub(super) fn unset_mark(ctx: &mut CommandContext<'_>, mark_type: MarkType) -> Result<(), CommandError> {
    match ctx.selection() {
        Selection::Node { .. } => Err(CommandError::NotApplicable("unmarking a node")),
        selection if selection.is_empty() => {
            let marks = ctx.insertion_marks(selection.head());
            ctx.tx
                .set_stored_marks(Some(remove_from_set(mark_type, &marks)));
            Ok(())
        }
        selection => {
            ctx.tx
                .remove_mark(selection.from(), selection.to(), mark_type)?;
            Ok(())
        }
    }
}

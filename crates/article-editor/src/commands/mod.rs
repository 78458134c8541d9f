// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Editing commands.
//!
//! A [`Command`] is plain data. A chain of commands runs against one
//! [`Transaction`]; if any of them cannot apply the whole chain fails and
//! nothing is committed. Toggles decide on or off from the state the
//! chain started from, not from the partially built transaction.

mod block_ops;
mod formatting;
mod links;
mod text_ops;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::link_policy::{AutolinkPolicy, LinkPolicy, LinkRejection};
use crate::model::{Attrs, Mark, MarkType, Node, NodeId};
use crate::schema::InvalidNode;
use crate::state::{EditorState, Selection, Transaction};
use crate::transform::StepError;

pub use block_ops::{block_active, heading_active};
pub use formatting::mark_active;
pub use links::link_range;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("{0} is not possible here")]
    NotApplicable(&'static str),
    #[error("`{0}` is not enabled in this schema")]
    NotInSchema(String),
    #[error("no node with id {0}")]
    NoSuchNode(NodeId),
    #[error("link rejected: {0}")]
    LinkRejected(#[from] LinkRejection),
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Invalid(#[from] InvalidNode),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    Focus,
    Blur,
    SetTextSelection {
        anchor: usize,
        head: usize,
    },
    SelectNode {
        pos: usize,
    },
    InsertText {
        text: String,
    },
    InsertContent {
        content: Vec<Node>,
    },
    InsertContentAt {
        pos: usize,
        content: Vec<Node>,
    },
    DeleteSelection,
    DeleteBackward,
    SplitBlock,
    JoinBackward,
    ToggleMark {
        mark: MarkType,
    },
    SetMark {
        mark: Mark,
    },
    UnsetMark {
        mark: MarkType,
    },
    SetLink {
        href: String,
    },
    UnsetLink,
    SetParagraph,
    ToggleHeading {
        level: u8,
    },
    ToggleCodeBlock {
        #[serde(default)]
        language: Option<String>,
    },
    ToggleBlockquote,
    ToggleBulletList,
    ToggleOrderedList,
    /// Addresses its node by [`NodeId`], which is never serialized, so this
    /// command exists only for Rust callers and does not parse from JSON.
    #[serde(skip)]
    UpdateAttributes {
        id: NodeId,
        attrs: Attrs,
    },
    InsertImage {
        src: String,
        #[serde(default)]
        alt: String,
        #[serde(default)]
        title: Option<String>,
    },
    InsertHorizontalRule,
}

/// What a command sees while it runs.
pub struct CommandContext<'a> {
    /// The state the chain started from.
    pub start: &'a EditorState,
    pub tx: Transaction,
    pub links: &'a LinkPolicy,
    pub autolink: &'a AutolinkPolicy,
    /// Focus change requested by the chain, if any.
    pub focus: Option<bool>,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        start: &'a EditorState,
        links: &'a LinkPolicy,
        autolink: &'a AutolinkPolicy,
    ) -> Self {
        Self {
            start,
            tx: start.tr(),
            links,
            autolink,
            focus: None,
        }
    }

    pub fn doc(&self) -> &Node {
        self.tx.doc()
    }

    pub fn selection(&self) -> Selection {
        self.tx.selection()
    }

    /// Marks for text inserted at the cursor: stored marks set earlier in
    /// the chain or on the starting state, else the marks around it.
    pub fn insertion_marks(&self, pos: usize) -> Vec<Mark> {
        if self.tx.stored_marks_set() {
            return self.tx.stored_marks().map(<[Mark]>::to_vec).unwrap_or_default();
        }
        if !self.tx.doc_changed() {
            if let Some(marks) = self.start.stored_marks() {
                return marks.to_vec();
            }
        }
        self.doc().marks_at(pos)
    }
}

impl Command {
    pub fn apply(&self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        match self {
            Command::Focus => {
                ctx.focus = Some(true);
                Ok(())
            }
            Command::Blur => {
                ctx.focus = Some(false);
                Ok(())
            }
            Command::SetTextSelection { anchor, head } => {
                let selection = Selection::text(*anchor, *head);
                if !selection.is_valid(ctx.doc()) {
                    return Err(CommandError::NotApplicable("selecting that range"));
                }
                ctx.tx.set_selection(selection);
                Ok(())
            }
            Command::SelectNode { pos } => {
                let selection = Selection::node(ctx.doc(), *pos)
                    .ok_or(CommandError::NotApplicable("selecting a node"))?;
                ctx.tx.set_selection(selection);
                Ok(())
            }
            Command::InsertText { text } => text_ops::insert_text(ctx, text),
            Command::InsertContent { content } => {
                block_ops::insert_content(ctx, content.clone())
            }
            Command::InsertContentAt { pos, content } => {
                block_ops::insert_content_at(ctx, *pos, content.clone())
            }
            Command::DeleteSelection => text_ops::delete_selection(ctx),
            Command::DeleteBackward => text_ops::delete_backward(ctx),
            Command::SplitBlock => text_ops::split_block(ctx),
            Command::JoinBackward => text_ops::join_backward(ctx),
            Command::ToggleMark { mark } => formatting::toggle_mark(ctx, *mark),
            Command::SetMark { mark } => formatting::set_mark(ctx, mark.clone()),
            Command::UnsetMark { mark } => formatting::unset_mark(ctx, *mark),
            Command::SetLink { href } => links::set_link(ctx, href),
            Command::UnsetLink => links::unset_link(ctx),
            Command::SetParagraph => block_ops::set_paragraph(ctx),
            Command::ToggleHeading { level } => block_ops::toggle_heading(ctx, *level),
            Command::ToggleCodeBlock { language } => {
                block_ops::toggle_code_block(ctx, language.as_deref())
            }
            Command::ToggleBlockquote => block_ops::toggle_blockquote(ctx),
            Command::ToggleBulletList => {
                block_ops::toggle_list(ctx, crate::model::NodeType::BulletList)
            }
            Command::ToggleOrderedList => {
                block_ops::toggle_list(ctx, crate::model::NodeType::OrderedList)
            }
            Command::UpdateAttributes { id, attrs } => {
                block_ops::update_attributes(ctx, *id, attrs)
            }
            Command::InsertImage { src, alt, title } => {
                block_ops::insert_image(ctx, src, alt, title.as_deref())
            }
            Command::InsertHorizontalRule => block_ops::insert_horizontal_rule(ctx),
        }
    }
}

/// Run `commands` in order against `state`. Returns the built transaction
/// and any requested focus change; the state itself is untouched.
pub fn run_chain(
    state: &EditorState,
    commands: &[Command],
    links: &LinkPolicy,
    autolink: &AutolinkPolicy,
) -> Result<(Transaction, Option<bool>), CommandError> {
    let mut ctx = CommandContext::new(state, links, autolink);
    for command in commands {
        command.apply(&mut ctx)?;
    }
    Ok((ctx.tx, ctx.focus))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::*;
    use crate::schema::Schema;

    pub fn state_with(doc: Node, selection: Selection) -> EditorState {
        let schema = Arc::new(Schema::article().unwrap());
        let state = EditorState::new(schema, doc);
        let mut tx = state.tr();
        tx.set_selection(selection);
        state.apply(&tx).unwrap()
    }

    /// Run a chain and apply it, panicking on failure.
    pub fn run(state: &EditorState, commands: &[Command]) -> EditorState {
        let (tx, _) = run_chain(
            state,
            commands,
            &LinkPolicy::default(),
            &AutolinkPolicy::default(),
        )
        .unwrap();
        state.apply(&tx).unwrap()
    }

    pub fn try_run(state: &EditorState, commands: &[Command]) -> Result<EditorState, CommandError> {
        let (tx, _) = run_chain(
            state,
            commands,
            &LinkPolicy::default(),
            &AutolinkPolicy::default(),
        )?;
        Ok(state.apply(&tx)?)
    }
}

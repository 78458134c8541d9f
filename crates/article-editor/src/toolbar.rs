// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Contextual toolbars.
//!
//! The bubble toolbar follows a non-empty text selection; the floating
//! toolbar sits beside an empty top-level block. Each control's state is
//! computed on its own from the editor snapshot, and clicking a control
//! only ever runs commands through the editor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use tokio::sync::watch;

use crate::commands::{block_active, heading_active, mark_active, run_chain, Command};
use crate::editor::{Editor, EditorError, EditorSnapshot};
use crate::model::{MarkType, NodeType, ResolvedPos};
use crate::state::{EditorState, Selection};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ToolbarAction {
    Bold,
    Italic,
    Strike,
    Underline,
    InlineCode,
    Link,
    Heading1,
    Heading2,
    Heading3,
    CodeBlock,
    Blockquote,
    BulletList,
    OrderedList,
    HorizontalRule,
    Image,
}

pub const BUBBLE_ACTIONS: &[ToolbarAction] = &[
    ToolbarAction::Bold,
    ToolbarAction::Italic,
    ToolbarAction::Strike,
    ToolbarAction::Underline,
    ToolbarAction::InlineCode,
    ToolbarAction::Link,
    ToolbarAction::Heading1,
    ToolbarAction::Heading2,
    ToolbarAction::Heading3,
    ToolbarAction::CodeBlock,
    ToolbarAction::Blockquote,
    ToolbarAction::BulletList,
    ToolbarAction::OrderedList,
];

pub const FLOATING_ACTIONS: &[ToolbarAction] = &[
    ToolbarAction::Heading1,
    ToolbarAction::BulletList,
    ToolbarAction::OrderedList,
    ToolbarAction::CodeBlock,
    ToolbarAction::Blockquote,
    ToolbarAction::HorizontalRule,
    ToolbarAction::Image,
];

impl ToolbarAction {
    fn mark(self) -> Option<MarkType> {
        match self {
            ToolbarAction::Bold => Some(MarkType::Bold),
            ToolbarAction::Italic => Some(MarkType::Italic),
            ToolbarAction::Strike => Some(MarkType::Strike),
            ToolbarAction::Underline => Some(MarkType::Underline),
            ToolbarAction::InlineCode => Some(MarkType::Code),
            ToolbarAction::Link => Some(MarkType::Link),
            _ => None,
        }
    }

    /// Whether the selection already has what this control applies.
    pub fn is_active(self, state: &EditorState) -> bool {
        if let Some(mark) = self.mark() {
            return mark_active(state, mark);
        }
        match self {
            ToolbarAction::Heading1 => heading_active(state, 1),
            ToolbarAction::Heading2 => heading_active(state, 2),
            ToolbarAction::Heading3 => heading_active(state, 3),
            ToolbarAction::CodeBlock => block_active(state, NodeType::CodeBlock),
            ToolbarAction::Blockquote => block_active(state, NodeType::Blockquote),
            ToolbarAction::BulletList => block_active(state, NodeType::BulletList),
            ToolbarAction::OrderedList => block_active(state, NodeType::OrderedList),
            _ => false,
        }
    }

    /// The commands a click runs. Link and image controls need input from
    /// the host first and have none unless the link is being removed.
    fn commands(self, state: &EditorState) -> Option<Vec<Command>> {
        let command = match self {
            ToolbarAction::Link if self.is_active(state) => Command::UnsetLink,
            ToolbarAction::Link | ToolbarAction::Image => return None,
            ToolbarAction::Heading1 => Command::ToggleHeading { level: 1 },
            ToolbarAction::Heading2 => Command::ToggleHeading { level: 2 },
            ToolbarAction::Heading3 => Command::ToggleHeading { level: 3 },
            ToolbarAction::CodeBlock => Command::ToggleCodeBlock { language: None },
            ToolbarAction::Blockquote => Command::ToggleBlockquote,
            ToolbarAction::BulletList => Command::ToggleBulletList,
            ToolbarAction::OrderedList => Command::ToggleOrderedList,
            ToolbarAction::HorizontalRule => Command::InsertHorizontalRule,
            _ => Command::ToggleMark {
                mark: self.mark()?,
            },
        };
        Some(vec![command])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub action: ToolbarAction,
    pub active: bool,
    pub enabled: bool,
}

/// Compute one control from a snapshot. `enabled` is a dry run of the
/// control's command against the snapshot's state.
pub fn control_state(snapshot: &EditorSnapshot, action: ToolbarAction) -> ControlState {
    let state = &snapshot.state;
    let active = action.is_active(state);
    let enabled = snapshot.editable
        && match action {
            ToolbarAction::Link => {
                state.schema().has_mark(MarkType::Link)
                    && (active || !state.selection().is_empty())
            }
            ToolbarAction::Image => state.schema().has_node(NodeType::Image),
            _ => action.commands(state).is_some_and(|commands| {
                run_chain(
                    state,
                    &commands,
                    &snapshot.config.links,
                    &snapshot.config.autolink,
                )
                .is_ok()
            }),
        };
    ControlState {
        action,
        active,
        enabled,
    }
}

/// A range of text is selected.
pub fn bubble_visible(snapshot: &EditorSnapshot) -> bool {
    let selection = snapshot.state.selection();
    matches!(selection, Selection::Text { .. }) && !selection.is_empty()
}

/// The cursor sits in an empty block directly under the document.
pub fn floating_visible(snapshot: &EditorSnapshot) -> bool {
    if !snapshot.editable {
        return false;
    }
    let selection = snapshot.state.selection();
    if !matches!(selection, Selection::Text { .. }) || !selection.is_empty() {
        return false;
    }
    ResolvedPos::resolve(snapshot.state.doc(), selection.head()).is_some_and(|rp| {
        rp.depth() == 1 && rp.parent().is_textblock() && rp.parent().content_size() == 0
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Supplied by the host view: where a document range is on screen.
pub trait SelectionGeometry: Send + Sync {
    fn range_rect(&self, from: usize, to: usize) -> Option<Rect>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolbarPlacement {
    pub anchor: Rect,
    pub controls: Vec<ControlState>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolbarLayout {
    pub bubble: Option<ToolbarPlacement>,
    pub floating: Option<ToolbarPlacement>,
    pub revision: u64,
}

pub fn layout(snapshot: &EditorSnapshot, geometry: &dyn SelectionGeometry) -> ToolbarLayout {
    let selection = snapshot.state.selection();
    let place = |actions: &[ToolbarAction]| {
        geometry
            .range_rect(selection.from(), selection.to())
            .map(|anchor| ToolbarPlacement {
                anchor,
                controls: actions
                    .iter()
                    .map(|action| control_state(snapshot, *action))
                    .collect(),
            })
    };
    ToolbarLayout {
        bubble: bubble_visible(snapshot)
            .then(|| place(BUBBLE_ACTIONS))
            .flatten(),
        floating: floating_visible(snapshot)
            .then(|| place(FLOATING_ACTIONS))
            .flatten(),
        revision: snapshot.revision,
    }
}

/// Input a control needs from the host before it can act.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolbarRequest {
    None,
    /// Ask for a link target, then call [`apply_link`].
    LinkPrompt,
    /// Open a file picker, then ingest the files at the cursor.
    FilePicker,
}

pub fn click(editor: &mut Editor, action: ToolbarAction) -> Result<ToolbarRequest, EditorError> {
    match action.commands(editor.state()) {
        Some(commands) => {
            editor.run(&commands)?;
            Ok(ToolbarRequest::None)
        }
        None if action == ToolbarAction::Image => Ok(ToolbarRequest::FilePicker),
        None => Ok(ToolbarRequest::LinkPrompt),
    }
}

pub fn apply_link(editor: &mut Editor, href: &str) -> Result<(), EditorError> {
    editor.run(&[Command::SetLink {
        href: href.to_owned(),
    }])
}

/// Recomputes the layout whenever the editor publishes a snapshot.
pub struct ToolbarController {
    snapshots: watch::Receiver<EditorSnapshot>,
    geometry: Arc<dyn SelectionGeometry>,
}

impl ToolbarController {
    pub fn new(editor: &Editor, geometry: Arc<dyn SelectionGeometry>) -> Self {
        Self {
            snapshots: editor.subscribe(),
            geometry,
        }
    }

    pub fn current(&self) -> ToolbarLayout {
        layout(&self.snapshots.borrow(), self.geometry.as_ref())
    }

    /// Wait for the next change. `None` once the editor is gone.
    pub async fn next_layout(&mut self) -> Option<ToolbarLayout> {
        self.snapshots.changed().await.ok()?;
        let snapshot = self.snapshots.borrow_and_update();
        Some(layout(&snapshot, self.geometry.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;
    use crate::config::EditorConfig;
    use crate::editor::EditorContent;
    use crate::model::Node;
    use crate::schema::Schema;

    struct LineGeometry;

    impl SelectionGeometry for LineGeometry {
        fn range_rect(&self, from: usize, to: usize) -> Option<Rect> {
            Some(Rect {
                x: from as f64 * 8.0,
                y: 0.0,
                width: (to - from) as f64 * 8.0,
                height: 16.0,
            })
        }
    }

    fn editor(doc: Node) -> Editor {
        Editor::new(
            Arc::new(Schema::article().unwrap()),
            Arc::new(EditorConfig::default()),
            EditorContent::Doc(doc),
        )
    }

    fn control(layout: &ToolbarPlacement, action: ToolbarAction) -> ControlState {
        *layout.controls.iter().find(|c| c.action == action).unwrap()
    }

    #[test]
    fn bubble_shows_only_for_a_range() {
        let mut editor = editor(Node::doc(vec![Node::paragraph_with_text("hello")]));
        let controller = ToolbarController::new(&editor, Arc::new(LineGeometry));
        assert_that!(controller.current().bubble).is_none();

        editor.chain().set_text_selection(1, 4).run().unwrap();
        let layout = controller.current();
        let bubble = layout.bubble.unwrap();
        assert_that!(bubble.anchor.width).is_equal_to(24.0);
        assert_that!(bubble.controls.len()).is_equal_to(BUBBLE_ACTIONS.len());
        assert_that!(layout.floating).is_none();
    }

    #[test]
    fn bold_is_active_only_when_every_character_is_bold() {
        let mut editor = editor(Node::doc(vec![Node::paragraph_with_text("hello")]));
        editor
            .chain()
            .set_text_selection(1, 3)
            .toggle_mark(MarkType::Bold)
            .run()
            .unwrap();
        let controller = ToolbarController::new(&editor, Arc::new(LineGeometry));
        let bubble = controller.current().bubble.unwrap();
        assert_that!(control(&bubble, ToolbarAction::Bold).active).is_true();

        editor.chain().set_text_selection(1, 5).run().unwrap();
        let bubble = controller.current().bubble.unwrap();
        assert_that!(control(&bubble, ToolbarAction::Bold).active).is_false();
        assert_that!(control(&bubble, ToolbarAction::Bold).enabled).is_true();
    }

    #[test]
    fn floating_shows_in_an_empty_top_level_block() {
        let editor = editor(Node::doc(vec![Node::paragraph(vec![])]));
        let layout = ToolbarController::new(&editor, Arc::new(LineGeometry)).current();
        let floating = layout.floating.unwrap();
        assert_that!(control(&floating, ToolbarAction::HorizontalRule).enabled).is_true();
        assert_that!(control(&floating, ToolbarAction::Image).enabled).is_true();
    }

    #[test]
    fn read_only_editors_disable_every_control() {
        let mut editor = editor(Node::doc(vec![Node::paragraph_with_text("hello")]));
        editor.chain().set_text_selection(1, 3).run().unwrap();
        editor.set_editable(false);
        let bubble = ToolbarController::new(&editor, Arc::new(LineGeometry))
            .current()
            .bubble
            .unwrap();
        assert_that!(bubble.controls.iter().any(|c| c.enabled)).is_false();
    }

    #[test]
    fn clicking_runs_commands_or_asks_the_host() {
        let mut editor = editor(Node::doc(vec![Node::paragraph_with_text("hello")]));
        editor.chain().set_text_selection(1, 6).run().unwrap();
        assert_that!(click(&mut editor, ToolbarAction::Italic).unwrap())
            .is_equal_to(ToolbarRequest::None);
        assert_that!(editor.to_html()).is_equal_to("<p><em>hello</em></p>".to_owned());

        assert_that!(click(&mut editor, ToolbarAction::Link).unwrap())
            .is_equal_to(ToolbarRequest::LinkPrompt);
        apply_link(&mut editor, "https://example.org").unwrap();
        assert_that!(ToolbarAction::Link.is_active(editor.state())).is_true();
        assert_that!(click(&mut editor, ToolbarAction::Link).unwrap())
            .is_equal_to(ToolbarRequest::None);
        assert_that!(ToolbarAction::Link.is_active(editor.state())).is_false();
        assert_that!(click(&mut editor, ToolbarAction::Image).unwrap())
            .is_equal_to(ToolbarRequest::FilePicker);
    }

    #[tokio::test]
    async fn layout_follows_the_selection() {
        let mut editor = editor(Node::doc(vec![Node::paragraph_with_text("hello")]));
        let mut controller = ToolbarController::new(&editor, Arc::new(LineGeometry));
        editor.chain().set_text_selection(2, 4).run().unwrap();
        let layout = controller.next_layout().await.unwrap();
        assert_that!(layout.bubble.unwrap().anchor.x).is_equal_to(16.0);

        drop(editor);
        assert_that!(controller.next_layout().await).is_none();
    }
}

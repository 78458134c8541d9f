// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! A mounted editing session.
//!
//! The [`Editor`] exclusively owns the live document. Everything that
//! changes it goes through [`Editor::dispatch`]: commands, undo and redo,
//! node view edits, media inserts and remote steps. Each committed change
//! is published as an [`EditorSnapshot`] on a `watch` channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::collab::{ClientId, CollabState, Outgoing, PresenceUpdate, RemoteCursor, StepBatch};
use crate::commands::{run_chain, Command, CommandError};
use crate::config::EditorConfig;
use crate::html::{parse_html, to_html};
use crate::markdown::parse_markdown;
use crate::model::{Attrs, Mark, MarkType, Node, NodeId};
use crate::node_views::{AltTextEffect, AltTextEvent, AltTextState, NodeViews};
use crate::schema::{InvalidNode, Schema};
use crate::serialize::{self, DeserializeError};
use crate::state::{EditorState, History, Origin, Selection, Transaction};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Invalid(#[from] InvalidNode),
    #[error("the editor is read-only")]
    ReadOnly,
    #[error("the editor has been destroyed")]
    Destroyed,
    #[error("collaboration is not enabled")]
    NotCollaborative,
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// What to load when the editor mounts.
#[derive(Clone, Debug)]
pub enum EditorContent {
    Empty,
    /// The persisted JSON form.
    Json(String),
    Html(String),
    Markdown(String),
    Doc(Node),
}

/// Something the host should tell the user about. None of these stop the
/// editor from working.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// Stored content could not be loaded; an empty document was used.
    ContentRecovered { reason: String },
    /// Collaboration is unavailable; edits stay local.
    LocalOnly { reason: String },
}

/// Cleared when the editor is destroyed. Async work captures one and checks
/// it before touching the editor again.
#[derive(Clone, Debug)]
pub struct MountToken(Arc<AtomicBool>);

impl MountToken {
    fn new() -> Self {
        MountToken(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn unmount(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// What subscribers (toolbars, presence markers) render from.
#[derive(Clone, Debug)]
pub struct EditorSnapshot {
    pub state: EditorState,
    pub config: Arc<EditorConfig>,
    pub focused: bool,
    pub editable: bool,
    pub peers: Vec<RemoteCursor>,
    /// Bumped on every publish.
    pub revision: u64,
}

pub struct Editor {
    state: EditorState,
    config: Arc<EditorConfig>,
    history: History,
    views: NodeViews,
    collab: Option<CollabState>,
    focused: bool,
    editable: bool,
    notices: Vec<Notice>,
    mount: MountToken,
    revision: u64,
    snapshots: watch::Sender<EditorSnapshot>,
}

impl Editor {
    pub fn new(schema: Arc<Schema>, config: Arc<EditorConfig>, content: EditorContent) -> Self {
        let mut notices = Vec::new();
        let doc = load_content(&schema, &config, content, &mut notices);
        let state = EditorState::new(schema, doc);
        let editable = config.editable;
        let (snapshots, _) = watch::channel(EditorSnapshot {
            state: state.clone(),
            config: Arc::clone(&config),
            focused: false,
            editable,
            peers: Vec::new(),
            revision: 0,
        });
        Self {
            state,
            history: History::new(config.history_depth),
            config,
            views: NodeViews::new(),
            collab: None,
            focused: false,
            editable,
            notices,
            mount: MountToken::new(),
            revision: 0,
            snapshots,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Node {
        self.state.doc()
    }

    pub fn selection(&self) -> Selection {
        self.state.selection()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.state.schema()
    }

    pub fn config(&self) -> &Arc<EditorConfig> {
        &self.config
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_editable(&self) -> bool {
        self.editable && self.mount.is_mounted()
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
        self.publish();
    }

    pub fn mount_token(&self) -> MountToken {
        self.mount.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        !self.mount.is_mounted()
    }

    /// Unmount. Pending async work sees the cleared [`MountToken`] and
    /// drops its result; every later change is refused.
    pub fn destroy(&mut self) {
        if self.is_destroyed() {
            return;
        }
        debug!("Destroying editor");
        self.mount.unmount();
        self.history.clear();
        self.views.clear();
        if let Some(collab) = self.collab.as_mut() {
            collab.peers_mut().clear();
        }
        self.editable = false;
        self.focused = false;
        self.publish();
    }

    pub fn subscribe(&self) -> watch::Receiver<EditorSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Start building a command chain. Nothing happens until `run`.
    pub fn chain(&mut self) -> CommandChain<'_> {
        CommandChain {
            editor: self,
            commands: Vec::new(),
        }
    }

    /// Whether `commands` would succeed right now, without applying them.
    pub fn can(&self, commands: &[Command]) -> bool {
        if self.is_destroyed() {
            return false;
        }
        match run_chain(&self.state, commands, &self.config.links, &self.config.autolink) {
            Ok((tx, _)) => {
                (self.editable || !tx.doc_changed()) && self.state.apply(&tx).is_ok()
            }
            Err(_) => false,
        }
    }

    /// Run `commands` as one transaction. On failure nothing changes.
    pub fn run(&mut self, commands: &[Command]) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        let (tx, focus) = run_chain(&self.state, commands, &self.config.links, &self.config.autolink)
            .inspect_err(|e| debug!(error = %e, "Command chain failed"))?;
        if let Some(focus) = focus {
            self.focused = focus;
        }
        self.dispatch(tx)
    }

    /// Commit a transaction built elsewhere.
    pub fn dispatch(&mut self, tx: Transaction) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        if tx.doc_changed() && !self.editable {
            return Err(EditorError::ReadOnly);
        }
        let next = self.state.apply(&tx).inspect_err(|e| {
            warn!(error = %e, "Rejected transaction that breaks the schema");
        })?;
        self.commit(next, &tx);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.is_editable() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.is_editable() && self.history.can_redo()
    }

    /// Revert the latest local change. Returns whether anything changed.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        self.ensure_writable()?;
        match self.history.undo(&self.state) {
            Some((next, tx)) => {
                self.commit(next, &tx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        self.ensure_writable()?;
        match self.history.redo(&self.state) {
            Some((next, tx)) => {
                self.commit(next, &tx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the whole document. Clears undo history.
    pub fn set_content(&mut self, content: EditorContent) -> Result<(), EditorError> {
        self.ensure_writable()?;
        let mut notices = Vec::new();
        let doc = load_content(self.schema(), &self.config, content, &mut notices);
        self.notices.extend(notices);
        let size = self.doc().content_size();
        let mut tx = self.state.tr();
        tx.delete(0, size)
            .and_then(|tx| tx.insert(0, doc.content().to_vec()))
            .map_err(CommandError::from)?;
        tx.set_selection(Selection::at_start(tx.doc()));
        tx.set_add_to_history(false);
        self.dispatch(tx)?;
        self.history.clear();
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serialize::to_json(self.doc())?)
    }

    pub fn to_html(&self) -> String {
        to_html(self.schema(), self.doc())
    }

    pub fn text(&self) -> String {
        self.doc().text_between_blocks("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.doc().child_count() == 1
            && self
                .doc()
                .child(0)
                .is_some_and(|c| c.is_textblock() && c.content_size() == 0)
    }

    pub fn is_active(&self, mark: MarkType) -> bool {
        crate::commands::mark_active(&self.state, mark)
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.state.stored_marks()
    }

    pub fn node_views(&self) -> &NodeViews {
        &self.views
    }

    /// Pick a language in a code block's picker. The attribute change is
    /// committed immediately and the picker closes either way.
    pub fn select_code_language(&mut self, id: NodeId, language: &str) -> Result<(), EditorError> {
        self.ensure_writable()?;
        let view = self
            .views
            .code_block(self.state.doc(), id)
            .ok_or(CommandError::NoSuchNode(id))?;
        let command = view.select_language(language)?;
        self.run(&[command])
    }

    pub fn toggle_code_language_picker(&mut self, id: NodeId) -> Result<bool, EditorError> {
        let view = self
            .views
            .code_block(self.state.doc(), id)
            .ok_or(CommandError::NoSuchNode(id))?;
        view.toggle_picker();
        Ok(view.is_picker_open())
    }

    /// Feed an event to an image's alt-text modal. A save writes `alt` in
    /// one transaction; if that fails the modal returns to editing with
    /// the draft intact and the error is returned.
    pub fn alt_text_event(
        &mut self,
        id: NodeId,
        event: AltTextEvent,
    ) -> Result<AltTextState, EditorError> {
        self.ensure_mounted()?;
        let current = self
            .doc()
            .find_by_id(id)
            .and_then(|(_, node)| node.attrs().get_str("alt"))
            .unwrap_or_default()
            .to_owned();
        let view = self
            .views
            .image(self.state.doc(), id)
            .ok_or(CommandError::NoSuchNode(id))?;
        let effect = view.alt_text.transition(event, &current);

        if let AltTextEffect::Commit(draft) = effect {
            let result = self.run(&[Command::UpdateAttributes {
                id,
                attrs: Attrs::new().with("alt", draft),
            }]);
            let outcome = if result.is_ok() {
                AltTextEvent::Saved
            } else {
                AltTextEvent::SaveFailed
            };
            if let Some(view) = self.views.image(self.state.doc(), id) {
                view.alt_text.transition(outcome, &current);
            }
            result?;
        }
        Ok(self
            .views
            .image(self.state.doc(), id)
            .map(|view| view.alt_text.state().clone())
            .unwrap_or_default())
    }

    // Collaboration hooks, driven by `collab::CollabAdapter`.

    /// Track local steps for a session starting at version 0. Does nothing
    /// if already enabled.
    pub fn enable_collab(&mut self, client_id: ClientId) {
        if self.collab.is_none() {
            self.collab = Some(CollabState::new(client_id, 0));
        }
    }

    pub fn collab(&self) -> Option<&CollabState> {
        self.collab.as_ref()
    }

    pub fn sendable_steps(&self) -> Option<Outgoing> {
        self.collab.as_ref().and_then(CollabState::sendable)
    }

    /// Apply steps ordered by the session authority.
    pub fn receive_steps(&mut self, batch: StepBatch) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        let collab = self.collab.as_mut().ok_or(EditorError::NotCollaborative)?;
        let Some(tx) = collab.receive(&self.state, batch.steps, &batch.client_ids) else {
            return Ok(());
        };
        let next = self.state.apply_unchecked(&tx);
        self.commit(next, &tx);
        Ok(())
    }

    pub fn update_peer(&mut self, update: PresenceUpdate) {
        let doc = self.state.doc();
        if let Some(collab) = self.collab.as_mut() {
            if update.participant.client_id != collab.client_id() {
                collab.peers_mut().update(update, doc);
                self.publish();
            }
        }
    }

    pub fn remove_peer(&mut self, client_id: ClientId) {
        if let Some(collab) = self.collab.as_mut() {
            if collab.peers_mut().remove(client_id) {
                self.publish();
            }
        }
    }

    pub fn clear_peers(&mut self) {
        if let Some(collab) = self.collab.as_mut() {
            if !collab.peers().is_empty() {
                collab.peers_mut().clear();
                self.publish();
            }
        }
    }

    pub fn peers(&self) -> Vec<RemoteCursor> {
        self.collab
            .as_ref()
            .map(|c| c.peers().markers())
            .unwrap_or_default()
    }

    fn commit(&mut self, next: EditorState, tx: &Transaction) {
        let entry = self.history.record(tx);
        if let Some(collab) = self.collab.as_mut() {
            collab.track(tx, entry);
        }
        self.state = next;
        if tx.doc_changed() {
            let dropped = self.views.prune(self.state.doc());
            if dropped > 0 {
                debug!(dropped, "Dropped node views for removed nodes");
            }
        }
        if tx.origin() == Origin::Local && tx.doc_changed() {
            debug!(steps = tx.steps().len(), "Committed local transaction");
        }
        self.publish();
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = EditorSnapshot {
            state: self.state.clone(),
            config: Arc::clone(&self.config),
            focused: self.focused,
            editable: self.is_editable(),
            peers: self.peers(),
            revision: self.revision,
        };
        self.snapshots.send_replace(snapshot);
    }

    fn ensure_mounted(&self) -> Result<(), EditorError> {
        if self.is_destroyed() {
            Err(EditorError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn ensure_writable(&self) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        if self.editable {
            Ok(())
        } else {
            Err(EditorError::ReadOnly)
        }
    }
}

fn load_content(
    schema: &Schema,
    config: &EditorConfig,
    content: EditorContent,
    notices: &mut Vec<Notice>,
) -> Node {
    let loaded: Result<Node, DeserializeError> = match content {
        EditorContent::Empty => Ok(schema.empty_doc()),
        EditorContent::Json(json) => serialize::from_json(schema, &json),
        EditorContent::Html(html) => Ok(parse_html(schema, &config.links, &html)),
        EditorContent::Markdown(md) => Ok(parse_markdown(schema, &config.links, &md)),
        EditorContent::Doc(doc) => schema
            .check(&doc)
            .map(|_| doc)
            .map_err(DeserializeError::from),
    };
    loaded.unwrap_or_else(|e| {
        warn!(error = %e, "Could not load document, starting empty");
        notices.push(Notice::ContentRecovered {
            reason: e.to_string(),
        });
        schema.empty_doc()
    })
}

/// A lazily evaluated list of commands, committed by [`CommandChain::run`].
#[must_use = "a chain does nothing until `run` is called"]
pub struct CommandChain<'e> {
    editor: &'e mut Editor,
    commands: Vec<Command>,
}

impl CommandChain<'_> {
    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn focus(self) -> Self {
        self.command(Command::Focus)
    }

    pub fn blur(self) -> Self {
        self.command(Command::Blur)
    }

    pub fn set_text_selection(self, anchor: usize, head: usize) -> Self {
        self.command(Command::SetTextSelection { anchor, head })
    }

    pub fn select_node(self, pos: usize) -> Self {
        self.command(Command::SelectNode { pos })
    }

    pub fn insert_text(self, text: &str) -> Self {
        self.command(Command::InsertText {
            text: text.to_owned(),
        })
    }

    pub fn insert_content(self, content: Vec<Node>) -> Self {
        self.command(Command::InsertContent { content })
    }

    pub fn insert_content_at(self, pos: usize, content: Vec<Node>) -> Self {
        self.command(Command::InsertContentAt { pos, content })
    }

    pub fn delete_selection(self) -> Self {
        self.command(Command::DeleteSelection)
    }

    pub fn delete_backward(self) -> Self {
        self.command(Command::DeleteBackward)
    }

    pub fn split_block(self) -> Self {
        self.command(Command::SplitBlock)
    }

    pub fn join_backward(self) -> Self {
        self.command(Command::JoinBackward)
    }

    pub fn toggle_mark(self, mark: MarkType) -> Self {
        self.command(Command::ToggleMark { mark })
    }

    pub fn set_mark(self, mark: Mark) -> Self {
        self.command(Command::SetMark { mark })
    }

    pub fn unset_mark(self, mark: MarkType) -> Self {
        self.command(Command::UnsetMark { mark })
    }

    pub fn set_link(self, href: &str) -> Self {
        self.command(Command::SetLink {
            href: href.to_owned(),
        })
    }

    pub fn unset_link(self) -> Self {
        self.command(Command::UnsetLink)
    }

    pub fn set_paragraph(self) -> Self {
        self.command(Command::SetParagraph)
    }

    pub fn toggle_heading(self, level: u8) -> Self {
        self.command(Command::ToggleHeading { level })
    }

    pub fn toggle_code_block(self, language: Option<&str>) -> Self {
        self.command(Command::ToggleCodeBlock {
            language: language.map(str::to_owned),
        })
    }

    pub fn toggle_blockquote(self) -> Self {
        self.command(Command::ToggleBlockquote)
    }

    pub fn toggle_bullet_list(self) -> Self {
        self.command(Command::ToggleBulletList)
    }

    pub fn toggle_ordered_list(self) -> Self {
        self.command(Command::ToggleOrderedList)
    }

    pub fn update_attributes(self, id: NodeId, attrs: Attrs) -> Self {
        self.command(Command::UpdateAttributes { id, attrs })
    }

    pub fn insert_image(self, src: &str, alt: &str, title: Option<&str>) -> Self {
        self.command(Command::InsertImage {
            src: src.to_owned(),
            alt: alt.to_owned(),
            title: title.map(str::to_owned),
        })
    }

    pub fn insert_horizontal_rule(self) -> Self {
        self.command(Command::InsertHorizontalRule)
    }

    /// Whether the chain so far would succeed.
    pub fn can_run(&self) -> bool {
        self.editor.can(&self.commands)
    }

    pub fn run(self) -> Result<(), EditorError> {
        self.editor.run(&self.commands)
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;
    use crate::model::NodeType;

    fn editor_with(doc: Node) -> Editor {
        Editor::new(
            Arc::new(Schema::article().unwrap()),
            Arc::new(EditorConfig::default()),
            EditorContent::Doc(doc),
        )
    }

    fn image(alt: &str) -> Node {
        Node::leaf(
            NodeType::Image,
            Attrs::new().with("src", "a.png").with("alt", alt),
        )
    }

    #[test]
    fn a_chain_commits_one_transaction() {
        let mut editor = editor_with(Node::doc(vec![Node::paragraph_with_text("hello")]));
        editor
            .chain()
            .focus()
            .set_text_selection(1, 6)
            .toggle_mark(MarkType::Bold)
            .run()
            .unwrap();
        assert_that!(editor.is_focused()).is_true();
        assert_that!(editor.to_html()).is_equal_to("<p><strong>hello</strong></p>".to_owned());
        assert_that!(editor.undo().unwrap()).is_true();
        assert_that!(editor.to_html()).is_equal_to("<p>hello</p>".to_owned());
        assert_that!(editor.undo().unwrap()).is_false();
    }

    #[test]
    fn a_failing_chain_changes_nothing() {
        let mut editor = editor_with(Node::doc(vec![Node::paragraph_with_text("hello")]));
        let before = editor.doc().clone();
        let result = editor
            .chain()
            .set_text_selection(1, 6)
            .toggle_mark(MarkType::Bold)
            .toggle_heading(9)
            .run();
        assert_that!(result).is_err();
        assert_that!(editor.doc()).is_equal_to(&before);
        assert_that!(editor.can_undo()).is_false();
    }

    #[test]
    fn can_reports_without_applying() {
        let editor = editor_with(Node::doc(vec![Node::paragraph_with_text("x")]));
        assert_that!(editor.can(&[Command::ToggleHeading { level: 1 }])).is_true();
        assert_that!(editor.can(&[Command::ToggleHeading { level: 0 }])).is_false();
        assert_that!(editor.doc().child(0).unwrap().node_type()).is_equal_to(NodeType::Paragraph);
    }

    #[test]
    fn malformed_json_loads_an_empty_document_with_a_notice() {
        let mut editor = Editor::new(
            Arc::new(Schema::article().unwrap()),
            Arc::new(EditorConfig::default()),
            EditorContent::Json("{\"type\":\"doc\",\"content\":[".into()),
        );
        assert_that!(editor.is_empty()).is_true();
        let notices = editor.take_notices();
        assert_that!(notices.len()).is_equal_to(1);
        assert!(matches!(notices[0], Notice::ContentRecovered { .. }));
    }

    #[test]
    fn read_only_editors_refuse_changes_but_allow_selection() {
        let config = EditorConfig {
            editable: false,
            ..EditorConfig::default()
        };
        let mut editor = Editor::new(
            Arc::new(Schema::article().unwrap()),
            Arc::new(config),
            EditorContent::Doc(Node::doc(vec![Node::paragraph_with_text("abc")])),
        );
        assert_that!(editor.chain().insert_text("x").run()).is_err();
        assert_that!(editor.chain().set_text_selection(1, 3).run()).is_ok();
        assert_that!(editor.selection()).is_equal_to(Selection::text(1, 3));
    }

    #[test]
    fn destroyed_editors_refuse_everything() {
        let mut editor = editor_with(Node::doc(vec![Node::paragraph_with_text("abc")]));
        let token = editor.mount_token();
        editor.destroy();
        assert_that!(token.is_mounted()).is_false();
        assert!(matches!(
            editor.chain().insert_text("x").run(),
            Err(EditorError::Destroyed)
        ));
    }

    #[test]
    fn snapshots_follow_every_commit() {
        let mut editor = editor_with(Node::doc(vec![Node::paragraph_with_text("abc")]));
        let rx = editor.subscribe();
        editor.chain().set_text_selection(2, 2).insert_text("Z").run().unwrap();
        let snapshot = rx.borrow().clone();
        assert_that!(snapshot.state.doc().text_content()).is_equal_to("aZbc".to_owned());
        assert_that!(snapshot.revision).is_equal_to(1);
    }

    #[test]
    fn alt_text_save_updates_the_node_once() {
        let picture = image("");
        let id = picture.id();
        let mut editor = editor_with(Node::doc(vec![picture, Node::paragraph(vec![])]));
        editor.alt_text_event(id, AltTextEvent::Open).unwrap();
        editor
            .alt_text_event(id, AltTextEvent::Edit("A red kite".into()))
            .unwrap();
        let state = editor.alt_text_event(id, AltTextEvent::Save).unwrap();
        assert_that!(state).is_equal_to(AltTextState::Closed);
        let (_, node) = editor.doc().find_by_id(id).unwrap();
        assert_that!(node.attrs().get_str("alt")).is_equal_to(Some("A red kite"));

        // one undo step reverts the whole save
        editor.undo().unwrap();
        let (_, node) = editor.doc().find_by_id(id).unwrap();
        assert_that!(node.attrs().get_str("alt")).is_equal_to(Some(""));
    }

    #[test]
    fn removing_an_image_drops_its_modal_state() {
        let picture = image("");
        let id = picture.id();
        let mut editor = editor_with(Node::doc(vec![picture, Node::paragraph(vec![])]));
        editor.alt_text_event(id, AltTextEvent::Open).unwrap();
        assert_that!(editor.node_views().len()).is_equal_to(1);

        editor.chain().select_node(0).delete_selection().run().unwrap();
        assert_that!(editor.node_views().is_empty()).is_true();
        assert_that!(editor.alt_text_event(id, AltTextEvent::Save)).is_err();
    }

    #[test]
    fn choosing_a_language_keeps_the_code() {
        let code = Node::new(
            NodeType::CodeBlock,
            Attrs::new(),
            vec![Node::text("fn main() {}", vec![])],
        );
        let id = code.id();
        let mut editor = editor_with(Node::doc(vec![code]));
        assert_that!(editor.toggle_code_language_picker(id).unwrap()).is_true();
        editor.select_code_language(id, "rust").unwrap();
        let (_, node) = editor.doc().find_by_id(id).unwrap();
        assert_that!(node.attrs().get_str("language")).is_equal_to(Some("rust"));
        assert_that!(node.text_content()).is_equal_to("fn main() {}".to_owned());
        assert_that!(editor.toggle_code_language_picker(id).unwrap()).is_true();
    }
}

// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Connects an [`Editor`] to a collaboration session.
//!
//! The adapter never owns the document. Each call borrows the editor, moves
//! steps and presence between it and the session, and returns. Session
//! failures are not returned as errors: the adapter drops to local-only
//! mode, tells the host through a [`Notice`], and keeps every edit so a
//! later [`CollabAdapter::reconnect`] can send them.

use std::sync::Arc;

use tracing::{debug, warn};

use super::presence::{Participant, PresenceThrottle, PresenceUpdate};
use super::session::{AuthExchange, SendOutcome, SessionEvent, SessionLink, SessionProvider};
use super::state::CollabState;
use super::SessionError;
use crate::editor::{Editor, Notice};
use crate::state::Selection;

const MAX_SEND_ATTEMPTS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
    /// The session could not be reached. Edits stay local until reconnect.
    LocalOnly { reason: String },
}

pub struct CollabAdapter {
    room: String,
    participant: Participant,
    provider: Arc<dyn SessionProvider>,
    auth: Arc<dyn AuthExchange>,
    token: Option<String>,
    link: Option<Box<dyn SessionLink>>,
    status: ConnectionStatus,
    throttle: PresenceThrottle,
}

impl CollabAdapter {
    /// Local edits are tracked from here on, including edits made before
    /// the first successful connect. The session's room must start from
    /// the same document the editor was created with.
    pub fn new(
        editor: &mut Editor,
        room: impl Into<String>,
        participant: Participant,
        provider: Arc<dyn SessionProvider>,
        auth: Arc<dyn AuthExchange>,
    ) -> Self {
        editor.enable_collab(participant.client_id);
        Self {
            room: room.into(),
            participant,
            provider,
            auth,
            token: None,
            link: None,
            status: ConnectionStatus::Disconnected,
            throttle: PresenceThrottle::new(editor.config().presence_throttle_ms),
        }
    }

    /// Start with a token the host already holds.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Join the session and exchange steps with it.
    pub async fn connect(&mut self, editor: &mut Editor) -> &ConnectionStatus {
        let joined = self.join().await;
        match joined {
            Ok(link) => {
                debug!(room = self.room, client = %self.participant.client_id, "Connected");
                self.link = Some(link);
                self.status = ConnectionStatus::Connected;
                self.throttle.reset();
                self.sync_or_degrade(editor).await;
            }
            Err(e) => self.degrade(editor, e),
        }
        &self.status
    }

    /// Try again after local-only mode or a disconnect.
    pub async fn reconnect(&mut self, editor: &mut Editor) -> &ConnectionStatus {
        if !self.is_connected() {
            self.connect(editor).await;
        }
        &self.status
    }

    pub async fn disconnect(&mut self, editor: &mut Editor) {
        if let Some(link) = self.link.take() {
            if let Err(e) = link.leave().await {
                debug!(error = %e, "Leaving the session failed");
            }
        }
        editor.clear_peers();
        self.throttle.reset();
        self.status = ConnectionStatus::Disconnected;
    }

    /// Handle every event that has already arrived, then exchange steps.
    /// Returns how many events were handled.
    pub async fn pump(&mut self, editor: &mut Editor) -> usize {
        let mut events = Vec::new();
        if let Some(link) = self.link.as_mut() {
            while let Some(event) = link.try_event() {
                events.push(event);
            }
        }
        let handled = events.len();
        for event in events {
            self.handle_event(editor, event);
        }
        if self.is_connected() {
            self.sync_or_degrade(editor).await;
        }
        handled
    }

    /// Wait for one event and handle it. Returns `false` when there is no
    /// session to wait on.
    pub async fn next(&mut self, editor: &mut Editor) -> bool {
        let Some(link) = self.link.as_mut() else {
            return false;
        };
        let event = link.next_event().await;
        match event {
            Some(event) => {
                self.handle_event(editor, event);
                if self.is_connected() {
                    self.sync_or_degrade(editor).await;
                }
                true
            }
            None => {
                self.degrade(editor, SessionError::Closed);
                false
            }
        }
    }

    /// Offer the local selection to the other participants. Returns whether
    /// it was sent now; a throttled selection waits for
    /// [`CollabAdapter::flush_presence`].
    pub async fn broadcast_presence(&mut self, editor: &mut Editor, now_ms: u64) -> bool {
        if !self.is_connected() {
            return false;
        }
        match self.throttle.offer(now_ms, editor.selection()) {
            Some(selection) => self.send_presence(editor, selection).await,
            None => false,
        }
    }

    pub async fn flush_presence(&mut self, editor: &mut Editor, now_ms: u64) -> bool {
        if !self.is_connected() {
            return false;
        }
        match self.throttle.due(now_ms) {
            Some(selection) => self.send_presence(editor, selection).await,
            None => false,
        }
    }

    async fn send_presence(&mut self, editor: &mut Editor, selection: Selection) -> bool {
        let Some(link) = self.link.as_ref() else {
            return false;
        };
        let update = PresenceUpdate {
            participant: self.participant.clone(),
            selection,
        };
        let sent = link.send_presence(update).await;
        match sent {
            Ok(()) => true,
            Err(e) => {
                self.degrade(editor, e);
                false
            }
        }
    }

    async fn join(&mut self) -> Result<Box<dyn SessionLink>, SessionError> {
        let token = match self.token.clone() {
            Some(token) => token,
            None => self.refresh_token().await?,
        };
        let joined = self.provider.join(&self.room, &token, &self.participant).await;
        match joined {
            Err(e) if e.is_auth() => {
                debug!(room = self.room, error = %e, "Session token rejected, refreshing");
                let token = self.refresh_token().await?;
                self.provider.join(&self.room, &token, &self.participant).await
            }
            joined => joined,
        }
    }

    async fn refresh_token(&mut self) -> Result<String, SessionError> {
        self.token = None;
        let token = self.auth.token(&self.room).await?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Pull what the authority has, then send our unconfirmed steps until
    /// they are accepted. A conflict means someone else got in first: pull
    /// again, which rebases ours, and resend.
    async fn sync(&self, editor: &mut Editor) -> Result<(), SessionError> {
        let link = self.link.as_deref().ok_or(SessionError::Closed)?;
        pull(link, editor).await?;
        for _ in 0..MAX_SEND_ATTEMPTS {
            let Some(outgoing) = editor.sendable_steps() else {
                return Ok(());
            };
            let count = outgoing.steps.len();
            match link
                .send_steps(outgoing.version, outgoing.steps, outgoing.client_id)
                .await?
            {
                SendOutcome::Accepted { version } => {
                    debug!(count, version, "Steps accepted");
                }
                SendOutcome::Conflict { version } => {
                    debug!(count, version, "Session is ahead, rebasing");
                }
            }
            pull(link, editor).await?;
        }
        if editor.sendable_steps().is_some() {
            debug!("Steps still unconfirmed, will resend on the next sync");
        }
        Ok(())
    }

    async fn sync_or_degrade(&mut self, editor: &mut Editor) {
        let synced = self.sync(editor).await;
        if let Err(e) = synced {
            self.degrade(editor, e);
        }
    }

    fn handle_event(&mut self, editor: &mut Editor, event: SessionEvent) {
        match event {
            // picked up by the sync that follows
            SessionEvent::Steps { .. } => {}
            SessionEvent::Presence(update) => editor.update_peer(update),
            SessionEvent::PeerLeft { client_id } => editor.remove_peer(client_id),
            SessionEvent::Closed => self.degrade(editor, SessionError::Closed),
        }
    }

    fn degrade(&mut self, editor: &mut Editor, error: SessionError) {
        warn!(room = self.room, error = %error, "Collaboration unavailable, editing locally");
        if error.is_auth() {
            self.token = None;
        }
        self.link = None;
        self.throttle.reset();
        editor.clear_peers();
        let reason = error.to_string();
        editor.push_notice(Notice::LocalOnly {
            reason: reason.clone(),
        });
        self.status = ConnectionStatus::LocalOnly { reason };
    }
}

async fn pull(link: &dyn SessionLink, editor: &mut Editor) -> Result<(), SessionError> {
    let version = editor.collab().map_or(0, CollabState::version);
    let batch = link.steps_since(version).await?;
    if batch.steps.is_empty() {
        return Ok(());
    }
    editor
        .receive_steps(batch)
        .map_err(|e| SessionError::Rejected(e.to_string()))
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;
    use crate::collab::{ClientId, LocalAuth, LocalHub};
    use crate::config::EditorConfig;
    use crate::editor::EditorContent;
    use crate::model::Node;
    use crate::schema::Schema;

    const ROOM: &str = "article-1";

    fn initial() -> Node {
        Node::doc(vec![Node::paragraph_with_text("ab")])
    }

    fn hub() -> LocalHub {
        let hub = LocalHub::new();
        hub.open_room(ROOM, initial());
        hub
    }

    fn editor() -> Editor {
        Editor::new(
            Arc::new(Schema::article().unwrap()),
            Arc::new(EditorConfig::default()),
            EditorContent::Doc(initial()),
        )
    }

    fn participant(id: u64) -> Participant {
        Participant {
            client_id: ClientId(id),
            name: format!("writer {id}"),
            colour: "#3366ff".into(),
        }
    }

    fn adapter(
        editor: &mut Editor,
        hub: &LocalHub,
        auth: Arc<LocalAuth>,
        id: u64,
    ) -> CollabAdapter {
        CollabAdapter::new(editor, ROOM, participant(id), Arc::new(hub.clone()), auth)
    }

    fn type_at(editor: &mut Editor, pos: usize, text: &str) {
        editor
            .chain()
            .set_text_selection(pos, pos)
            .insert_text(text)
            .run()
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_edits_converge() {
        let hub = hub();
        let auth = Arc::new(hub.auth());
        let (mut a, mut b) = (editor(), editor());
        let mut adapter_a = adapter(&mut a, &hub, auth.clone(), 1);
        let mut adapter_b = adapter(&mut b, &hub, auth, 2);
        adapter_a.connect(&mut a).await;
        adapter_b.connect(&mut b).await;

        type_at(&mut a, 1, "X");
        type_at(&mut b, 3, "Y");
        adapter_a.pump(&mut a).await;
        adapter_b.pump(&mut b).await;
        adapter_a.pump(&mut a).await;

        let expected = hub.doc(ROOM).unwrap();
        assert_that!(expected.text_content()).is_equal_to("XabY".to_owned());
        assert_that!(a.doc()).is_equal_to(&expected);
        assert_that!(b.doc()).is_equal_to(&expected);
        assert_that!(a.sendable_steps()).is_none();
        assert_that!(b.sendable_steps()).is_none();
    }

    #[tokio::test]
    async fn a_rejected_token_is_refreshed_once() {
        let hub = hub();
        let auth = Arc::new(hub.auth());
        let mut ed = editor();
        let mut adapter = adapter(&mut ed, &hub, auth.clone(), 1).with_token("expired");
        assert_that!(adapter.connect(&mut ed).await).is_equal_to(&ConnectionStatus::Connected);
        assert_that!(auth.issued()).is_equal_to(1);
        assert_that!(hub.member_count(ROOM)).is_equal_to(1);
    }

    #[tokio::test]
    async fn offline_edits_are_sent_after_reconnect() {
        let hub = hub();
        let auth = Arc::new(hub.auth());
        auth.set_denied(true);
        let mut ed = editor();
        let mut adapter = adapter(&mut ed, &hub, auth.clone(), 1);

        adapter.connect(&mut ed).await;
        assert!(matches!(adapter.status(), ConnectionStatus::LocalOnly { .. }));
        let notices = ed.take_notices();
        assert!(matches!(notices.as_slice(), [Notice::LocalOnly { .. }]));

        type_at(&mut ed, 3, "c");
        assert_that!(ed.text()).is_equal_to("abc".to_owned());

        auth.set_denied(false);
        assert_that!(adapter.reconnect(&mut ed).await).is_equal_to(&ConnectionStatus::Connected);
        assert_that!(hub.doc(ROOM).unwrap().text_content()).is_equal_to("abc".to_owned());
        assert_that!(ed.sendable_steps()).is_none();
    }

    #[tokio::test]
    async fn presence_is_throttled_and_cleared_on_leave() {
        let hub = hub();
        let auth = Arc::new(hub.auth());
        let (mut a, mut b) = (editor(), editor());
        let mut adapter_a = adapter(&mut a, &hub, auth.clone(), 1);
        let mut adapter_b = adapter(&mut b, &hub, auth, 2);
        adapter_a.connect(&mut a).await;
        adapter_b.connect(&mut b).await;

        a.chain().set_text_selection(2, 2).run().unwrap();
        assert_that!(adapter_a.broadcast_presence(&mut a, 0).await).is_true();
        a.chain().set_text_selection(3, 3).run().unwrap();
        assert_that!(adapter_a.broadcast_presence(&mut a, 100).await).is_false();
        assert_that!(adapter_a.flush_presence(&mut a, 200).await).is_false();
        assert_that!(adapter_a.flush_presence(&mut a, 250).await).is_true();

        assert_that!(adapter_b.pump(&mut b).await).is_equal_to(2);
        let peers = b.peers();
        assert_that!(peers.len()).is_equal_to(1);
        assert_that!(peers[0].selection.head()).is_equal_to(3);
        assert_that!(peers[0].participant.name.as_str()).is_equal_to("writer 1");

        adapter_a.disconnect(&mut a).await;
        adapter_b.pump(&mut b).await;
        assert_that!(b.peers().is_empty()).is_true();
    }

    #[tokio::test]
    async fn a_closed_room_falls_back_to_local_editing() {
        let hub = hub();
        let auth = Arc::new(hub.auth());
        let mut ed = editor();
        let mut adapter = adapter(&mut ed, &hub, auth, 1);
        adapter.connect(&mut ed).await;

        hub.close_room(ROOM);
        adapter.pump(&mut ed).await;
        assert!(matches!(adapter.status(), ConnectionStatus::LocalOnly { .. }));
        type_at(&mut ed, 1, "z");
        assert_that!(ed.text()).is_equal_to("zab".to_owned());
    }
}

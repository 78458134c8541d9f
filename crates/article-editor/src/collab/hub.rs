// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! An in-memory session authority, for tests and local demos.

use std::collections::HashMap;
use std::iter;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

use super::presence::{Participant, PresenceUpdate};
use super::session::{
    AuthExchange, SendOutcome, SessionEvent, SessionLink, SessionProvider, StepBatch,
};
use super::{ClientId, SessionError};
use crate::model::Node;
use crate::transform::Step;

const EVENT_CAPACITY: usize = 256;

struct Room {
    doc: Node,
    steps: Vec<Step>,
    client_ids: Vec<ClientId>,
    members: HashMap<ClientId, Participant>,
    events: broadcast::Sender<(ClientId, SessionEvent)>,
}

impl Room {
    fn version(&self) -> u64 {
        self.steps.len() as u64
    }
}

#[derive(Default)]
struct HubInner {
    rooms: Mutex<HashMap<String, Room>>,
    /// token -> room
    tokens: Mutex<HashMap<String, String>>,
    next_token: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct LocalHub {
    inner: Arc<HubInner>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `room` starting from `doc`. An existing room is left alone.
    pub fn open_room(&self, room: &str, doc: Node) {
        self.inner
            .rooms
            .lock()
            .entry(room.to_owned())
            .or_insert_with(|| Room {
                doc,
                steps: Vec::new(),
                client_ids: Vec::new(),
                members: HashMap::new(),
                events: broadcast::channel(EVENT_CAPACITY).0,
            });
    }

    pub fn doc(&self, room: &str) -> Option<Node> {
        self.inner.rooms.lock().get(room).map(|r| r.doc.clone())
    }

    pub fn version(&self, room: &str) -> Option<u64> {
        self.inner.rooms.lock().get(room).map(Room::version)
    }

    pub fn member_count(&self, room: &str) -> usize {
        self.inner
            .rooms
            .lock()
            .get(room)
            .map_or(0, |r| r.members.len())
    }

    pub fn issue_token(&self, room: &str) -> String {
        let n = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let token = format!("local-{room}-{n}");
        self.inner
            .tokens
            .lock()
            .insert(token.clone(), room.to_owned());
        token
    }

    /// Expire every token issued so far.
    pub fn revoke_tokens(&self) {
        self.inner.tokens.lock().clear();
    }

    /// Drop the session for everyone in `room`.
    pub fn close_room(&self, room: &str) {
        if let Some(r) = self.inner.rooms.lock().remove(room) {
            // no receivers is fine
            let _ = r.events.send((ClientId(0), SessionEvent::Closed));
        }
    }

    pub fn auth(&self) -> LocalAuth {
        LocalAuth {
            hub: self.clone(),
            denied: AtomicBool::new(false),
            issued: AtomicUsize::new(0),
        }
    }

    fn check_token(&self, room: &str, token: &str) -> Result<(), SessionError> {
        match self.inner.tokens.lock().get(token) {
            Some(r) if r == room => Ok(()),
            _ => Err(SessionError::Unauthorized),
        }
    }

    fn with_room<T>(
        &self,
        room: &str,
        f: impl FnOnce(&mut Room) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let mut rooms = self.inner.rooms.lock();
        let r = rooms
            .get_mut(room)
            .ok_or_else(|| SessionError::NoSuchRoom(room.to_owned()))?;
        f(r)
    }
}

#[async_trait]
impl SessionProvider for LocalHub {
    async fn join(
        &self,
        room: &str,
        token: &str,
        participant: &Participant,
    ) -> Result<Box<dyn SessionLink>, SessionError> {
        self.check_token(room, token)?;
        let events = self.with_room(room, |r| {
            let rejoin = r
                .members
                .insert(participant.client_id, participant.clone())
                .is_some();
            debug!(room, client = %participant.client_id, rejoin, "Joined room");
            Ok(r.events.subscribe())
        })?;
        Ok(Box::new(LocalLink {
            hub: self.clone(),
            room: room.to_owned(),
            client_id: participant.client_id,
            events,
        }))
    }
}

struct LocalLink {
    hub: LocalHub,
    room: String,
    client_id: ClientId,
    events: broadcast::Receiver<(ClientId, SessionEvent)>,
}

impl LocalLink {
    fn ensure_member(&self, r: &Room) -> Result<(), SessionError> {
        if r.members.contains_key(&self.client_id) {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    fn catch_up_event(&self) -> SessionEvent {
        SessionEvent::Steps {
            version: self.hub.version(&self.room).unwrap_or(0),
        }
    }
}

#[async_trait]
impl SessionLink for LocalLink {
    async fn send_steps(
        &self,
        version: u64,
        steps: Vec<Step>,
        client_id: ClientId,
    ) -> Result<SendOutcome, SessionError> {
        self.hub.with_room(&self.room, |r| {
            self.ensure_member(r)?;
            let current = r.version();
            if version != current {
                return Ok(SendOutcome::Conflict { version: current });
            }
            let mut doc = r.doc.clone();
            for step in &steps {
                doc = step
                    .apply(&doc)
                    .map_err(|e| SessionError::Rejected(e.to_string()))?
                    .doc;
            }
            let count = steps.len();
            r.doc = doc;
            r.steps.extend(steps);
            r.client_ids.extend(iter::repeat(client_id).take(count));
            let version = r.version();
            let _ = r.events.send((client_id, SessionEvent::Steps { version }));
            Ok(SendOutcome::Accepted { version })
        })
    }

    async fn steps_since(&self, version: u64) -> Result<StepBatch, SessionError> {
        self.hub.with_room(&self.room, |r| {
            self.ensure_member(r)?;
            let from = usize::try_from(version)
                .ok()
                .filter(|v| *v <= r.steps.len())
                .ok_or_else(|| SessionError::Rejected(format!("unknown version {version}")))?;
            Ok(StepBatch {
                version: r.version(),
                steps: r.steps[from..].to_vec(),
                client_ids: r.client_ids[from..].to_vec(),
            })
        })
    }

    async fn send_presence(&self, update: PresenceUpdate) -> Result<(), SessionError> {
        self.hub.with_room(&self.room, |r| {
            self.ensure_member(r)?;
            let _ = r
                .events
                .send((self.client_id, SessionEvent::Presence(update)));
            Ok(())
        })
    }

    async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            match self.events.recv().await {
                Ok((from, _)) if from == self.client_id => continue,
                Ok((_, event)) => return Some(event),
                Err(RecvError::Lagged(missed)) => {
                    debug!(missed, "Session events lagged, catching up");
                    return Some(self.catch_up_event());
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn try_event(&mut self) -> Option<SessionEvent> {
        loop {
            match self.events.try_recv() {
                Ok((from, _)) if from == self.client_id => continue,
                Ok((_, event)) => return Some(event),
                Err(TryRecvError::Lagged(_)) => return Some(self.catch_up_event()),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    async fn leave(&self) -> Result<(), SessionError> {
        self.hub.with_room(&self.room, |r| {
            if r.members.remove(&self.client_id).is_some() {
                let _ = r.events.send((
                    self.client_id,
                    SessionEvent::PeerLeft {
                        client_id: self.client_id,
                    },
                ));
            }
            Ok(())
        })
    }
}

/// Issues tokens from a [`LocalHub`]. Can be switched to refuse, to
/// exercise the local-only fallback.
pub struct LocalAuth {
    hub: LocalHub,
    denied: AtomicBool,
    issued: AtomicUsize,
}

impl LocalAuth {
    pub fn set_denied(&self, denied: bool) {
        self.denied.store(denied, Ordering::Relaxed);
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AuthExchange for LocalAuth {
    async fn token(&self, room: &str) -> Result<String, SessionError> {
        if self.denied.load(Ordering::Relaxed) {
            return Err(SessionError::MissingToken);
        }
        self.issued.fetch_add(1, Ordering::Relaxed);
        Ok(self.hub.issue_token(room))
    }
}

// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The seams to the collaboration service. A web host implements these
//! over its network transport; [`super::LocalHub`] implements them in
//! memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::presence::{Participant, PresenceUpdate};
use super::{ClientId, SessionError};
use crate::transform::Step;

/// Steps the authority holds after some version.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepBatch {
    /// Version after the last step in the batch.
    pub version: u64,
    pub steps: Vec<Step>,
    pub client_ids: Vec<ClientId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SendOutcome {
    Accepted { version: u64 },
    /// The authority is ahead of the version the steps were based on.
    Conflict { version: u64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    /// New steps exist up to `version`.
    Steps { version: u64 },
    Presence(PresenceUpdate),
    PeerLeft { client_id: ClientId },
    Closed,
}

/// Exchanges the host's credentials for a short-lived session token.
#[async_trait]
pub trait AuthExchange: Send + Sync {
    async fn token(&self, room: &str) -> Result<String, SessionError>;
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Join `room`. Joining again with the same client id replaces the
    /// earlier membership rather than adding a second one.
    async fn join(
        &self,
        room: &str,
        token: &str,
        participant: &Participant,
    ) -> Result<Box<dyn SessionLink>, SessionError>;
}

/// A joined session.
#[async_trait]
pub trait SessionLink: Send + Sync {
    async fn send_steps(
        &self,
        version: u64,
        steps: Vec<Step>,
        client_id: ClientId,
    ) -> Result<SendOutcome, SessionError>;

    async fn steps_since(&self, version: u64) -> Result<StepBatch, SessionError>;

    async fn send_presence(&self, update: PresenceUpdate) -> Result<(), SessionError>;

    /// Wait for the next event. `None` once the session is gone.
    async fn next_event(&mut self) -> Option<SessionEvent>;

    /// An event that has already arrived, without waiting.
    fn try_event(&mut self) -> Option<SessionEvent>;

    async fn leave(&self) -> Result<(), SessionError>;
}

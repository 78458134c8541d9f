// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Multi-writer editing against a central authority.
//!
//! The authority keeps a linear list of steps. Each client tracks the
//! version it has seen and the local steps the authority has not confirmed
//! yet. Sending at a stale version is refused; the client then pulls the
//! newer steps, rebases its own over them and sends again. Everyone
//! applies the authority's order, so all documents converge.

pub mod adapter;
pub mod hub;
pub mod presence;
pub mod session;
pub mod state;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use adapter::{CollabAdapter, ConnectionStatus};
pub use hub::{LocalAuth, LocalHub};
pub use presence::{Participant, PeerCursors, PresenceThrottle, PresenceUpdate, RemoteCursor};
pub use session::{
    AuthExchange, SendOutcome, SessionEvent, SessionLink, SessionProvider, StepBatch,
};
pub use state::{CollabState, Outgoing};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no auth token available")]
    MissingToken,
    #[error("auth token rejected")]
    Unauthorized,
    #[error("no such room `{0}`")]
    NoSuchRoom(String),
    #[error("steps rejected by the session: {0}")]
    Rejected(String),
    #[error("session closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}

impl SessionError {
    /// Errors a fresh token may fix.
    pub fn is_auth(&self) -> bool {
        matches!(self, SessionError::MissingToken | SessionError::Unauthorized)
    }
}

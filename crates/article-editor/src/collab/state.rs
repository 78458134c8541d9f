// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::presence::PeerCursors;
use super::ClientId;
use crate::model::Node;
use crate::state::{EditorState, Origin, Transaction};
use crate::transform::Step;

#[derive(Clone, Debug)]
struct Unconfirmed {
    step: Step,
    inverse: Vec<Step>,
    /// History entry of the local transaction the step came from.
    entry: Option<u64>,
}

/// Steps ready to be sent to the authority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outgoing {
    pub version: u64,
    pub client_id: ClientId,
    pub steps: Vec<Step>,
}

/// One client's view of the session: the last confirmed version, the local
/// steps sent or waiting to be sent on top of it, and the other
/// participants' cursors.
#[derive(Clone, Debug)]
pub struct CollabState {
    client_id: ClientId,
    version: u64,
    unconfirmed: Vec<Unconfirmed>,
    peers: PeerCursors,
}

impl CollabState {
    pub fn new(client_id: ClientId, version: u64) -> Self {
        Self {
            client_id,
            version,
            unconfirmed: Vec::new(),
            peers: PeerCursors::default(),
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn unconfirmed_len(&self) -> usize {
        self.unconfirmed.len()
    }

    pub fn peers(&self) -> &PeerCursors {
        &self.peers
    }

    pub fn peers_mut(&mut self) -> &mut PeerCursors {
        &mut self.peers
    }

    pub fn sendable(&self) -> Option<Outgoing> {
        if self.unconfirmed.is_empty() {
            return None;
        }
        Some(Outgoing {
            version: self.version,
            client_id: self.client_id,
            steps: self.unconfirmed.iter().map(|u| u.step.clone()).collect(),
        })
    }

    /// Account for a transaction committed to the local state. `entry` is
    /// the history entry that reverts it, if any.
    pub(crate) fn track(&mut self, tx: &Transaction, entry: Option<u64>) {
        if !tx.doc_changed() {
            return;
        }
        if tx.origin() != Origin::Remote {
            self.unconfirmed.extend(
                tx.steps()
                    .iter()
                    .zip(tx.step_inverses())
                    .map(|(step, inverse)| Unconfirmed {
                        step: step.clone(),
                        inverse: inverse.clone(),
                        entry,
                    }),
            );
        }
        self.peers.map(tx.mapping(), tx.doc());
    }

    /// Take in steps the authority has ordered after our version. Leading
    /// steps from this client confirm our own; the rest are applied under
    /// our unconfirmed steps, which are rebased on top of them.
    ///
    /// Returns the transaction to apply locally, or `None` when the batch
    /// only confirmed our own steps.
    pub(crate) fn receive(
        &mut self,
        state: &EditorState,
        steps: Vec<Step>,
        client_ids: &[ClientId],
    ) -> Option<Transaction> {
        self.version += steps.len() as u64;
        let ours = client_ids
            .iter()
            .take_while(|id| **id == self.client_id)
            .count()
            .min(self.unconfirmed.len())
            .min(steps.len());
        self.unconfirmed.drain(..ours);
        let remote: Vec<Step> = steps.into_iter().skip(ours).map(with_fresh_ids).collect();
        if remote.is_empty() {
            return None;
        }

        let mut tx = state.tr();
        tx.set_origin(Origin::Remote);
        let pending = std::mem::take(&mut self.unconfirmed);

        let mut inverse_at = vec![0; pending.len()];
        for (i, p) in pending.iter().enumerate().rev() {
            inverse_at[i] = tx.steps().len();
            for step in &p.inverse {
                if let Err(e) = tx.step(step.clone()) {
                    error!(error = %e, "Could not take back an unconfirmed step");
                }
            }
        }
        for step in remote {
            if let Err(e) = tx.step(step) {
                error!(error = %e, version = self.version, "Remote step does not apply");
            }
        }
        for (i, p) in pending.into_iter().enumerate() {
            let map_from = inverse_at[i] + p.inverse.len();
            let Some(mapped) = p.step.map(&tx.mapping().slice(map_from)) else {
                debug!(step = ?p.step, "Dropping local step whose target was removed remotely");
                if let Some(id) = p.entry {
                    tx.forget_entry(id);
                }
                continue;
            };
            let first = tx.steps().len();
            match tx.step(mapped.clone()) {
                Ok(_) => {
                    if p.inverse.len() == 1 {
                        tx.set_mirror(inverse_at[i], first);
                    }
                    let inverse = tx.step_inverses()[first].clone();
                    self.unconfirmed.push(Unconfirmed {
                        step: mapped,
                        inverse,
                        entry: p.entry,
                    });
                    continue;
                }
                Err(e) => debug!(error = %e, "Local step no longer applies as it was"),
            }
            // A deletion that now spans a remote split is redone in pieces.
            // Its history entry described the single step and is forgotten.
            if let Step::Delete { from, to } = mapped {
                let saved = tx.clone();
                if tx.delete_range(from, to).is_ok() {
                    let steps = tx.steps()[first..].iter().zip(&tx.step_inverses()[first..]);
                    self.unconfirmed.extend(steps.map(|(step, inverse)| Unconfirmed {
                        step: step.clone(),
                        inverse: inverse.clone(),
                        entry: p.entry,
                    }));
                } else {
                    tx = saved;
                    debug!(from, to, "Dropping local deletion that no longer applies");
                }
            }
            if let Some(id) = p.entry {
                tx.forget_entry(id);
            }
        }
        Some(tx)
    }
}

/// Content arriving from elsewhere gets identities of its own here.
fn with_fresh_ids(step: Step) -> Step {
    match step {
        Step::Insert { pos, content } => Step::Insert {
            pos,
            content: content.iter().map(Node::with_fresh_ids).collect(),
        },
        other => other,
    }
}

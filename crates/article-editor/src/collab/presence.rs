// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Live cursors of other participants. Best effort: updates may be
//! dropped by the throttle and are not ordered against content steps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ClientId;
use crate::model::Node;
use crate::state::Selection;
use crate::transform::Mapping;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub client_id: ClientId,
    pub name: String,
    /// CSS colour for this participant's marker.
    pub colour: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub participant: Participant,
    pub selection: Selection,
}

/// A marker to draw for another participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteCursor {
    pub participant: Participant,
    pub selection: Selection,
}

#[derive(Clone, Debug, Default)]
pub struct PeerCursors {
    cursors: BTreeMap<ClientId, RemoteCursor>,
}

impl PeerCursors {
    pub fn update(&mut self, update: PresenceUpdate, doc: &Node) {
        let selection = update.selection.validated(doc);
        self.cursors.insert(
            update.participant.client_id,
            RemoteCursor {
                participant: update.participant,
                selection,
            },
        );
    }

    pub fn remove(&mut self, client_id: ClientId) -> bool {
        self.cursors.remove(&client_id).is_some()
    }

    pub fn clear(&mut self) {
        self.cursors.clear();
    }

    /// Keep markers on the same content as the document changes.
    pub fn map(&mut self, mapping: &Mapping, doc: &Node) {
        for cursor in self.cursors.values_mut() {
            cursor.selection = cursor.selection.map(doc, mapping);
        }
    }

    pub fn get(&self, client_id: ClientId) -> Option<&RemoteCursor> {
        self.cursors.get(&client_id)
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn markers(&self) -> Vec<RemoteCursor> {
        self.cursors.values().cloned().collect()
    }
}

/// Limits how often the local selection is broadcast. Time is passed in
/// as milliseconds from any monotonic origin.
#[derive(Clone, Debug)]
pub struct PresenceThrottle {
    interval_ms: u64,
    last_sent_at: Option<u64>,
    last_sent: Option<Selection>,
    pending: Option<Selection>,
}

impl PresenceThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent_at: None,
            last_sent: None,
            pending: None,
        }
    }

    /// Offer the current selection. Returns it when it should be sent now;
    /// otherwise it is held until [`PresenceThrottle::due`].
    pub fn offer(&mut self, now_ms: u64, selection: Selection) -> Option<Selection> {
        if self.last_sent == Some(selection) {
            self.pending = None;
            return None;
        }
        if self.ready(now_ms) {
            self.mark_sent(now_ms, selection);
            Some(selection)
        } else {
            self.pending = Some(selection);
            None
        }
    }

    /// A held selection whose wait is over.
    pub fn due(&mut self, now_ms: u64) -> Option<Selection> {
        let selection = self.pending?;
        if !self.ready(now_ms) {
            return None;
        }
        self.mark_sent(now_ms, selection);
        Some(selection)
    }

    /// Forget what was sent, so the next offer goes out immediately.
    pub fn reset(&mut self) {
        self.last_sent_at = None;
        self.last_sent = None;
        self.pending = None;
    }

    fn ready(&self, now_ms: u64) -> bool {
        self.last_sent_at
            .map_or(true, |at| now_ms.saturating_sub(at) >= self.interval_ms)
    }

    fn mark_sent(&mut self, now_ms: u64, selection: Selection) {
        self.last_sent_at = Some(now_ms);
        self.last_sent = Some(selection);
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;
    use crate::transform::Step;

    fn participant(id: u64) -> Participant {
        Participant {
            client_id: ClientId(id),
            name: format!("user {id}"),
            colour: "#ff0000".into(),
        }
    }

    #[test]
    fn throttle_holds_updates_inside_the_interval() {
        let mut throttle = PresenceThrottle::new(250);
        assert_that!(throttle.offer(0, Selection::cursor(1))).is_equal_to(Some(Selection::cursor(1)));
        assert_that!(throttle.offer(100, Selection::cursor(2))).is_none();
        assert_that!(throttle.offer(200, Selection::cursor(3))).is_none();
        assert_that!(throttle.due(249)).is_none();
        assert_that!(throttle.due(250)).is_equal_to(Some(Selection::cursor(3)));
        assert_that!(throttle.due(600)).is_none();
    }

    #[test]
    fn unchanged_selection_is_not_resent() {
        let mut throttle = PresenceThrottle::new(250);
        throttle.offer(0, Selection::cursor(1));
        assert_that!(throttle.offer(1000, Selection::cursor(1))).is_none();
    }

    #[test]
    fn remote_cursors_follow_local_edits() {
        let doc = Node::doc(vec![Node::paragraph_with_text("abcd")]);
        let mut peers = PeerCursors::default();
        peers.update(
            PresenceUpdate {
                participant: participant(2),
                selection: Selection::cursor(3),
            },
            &doc,
        );
        let step = Step::Insert {
            pos: 1,
            content: vec![Node::text("xy", vec![])],
        };
        let after = step.apply(&doc).unwrap().doc;
        peers.map(&Mapping::from(step.get_map()), &after);
        assert_that!(peers.get(ClientId(2)).unwrap().selection).is_equal_to(Selection::cursor(5));

        assert_that!(peers.remove(ClientId(2))).is_true();
        assert_that!(peers.is_empty()).is_true();
    }

    #[test]
    fn out_of_range_cursors_are_clamped_into_the_document() {
        let doc = Node::doc(vec![Node::paragraph_with_text("ab")]);
        let mut peers = PeerCursors::default();
        peers.update(
            PresenceUpdate {
                participant: participant(3),
                selection: Selection::cursor(40),
            },
            &doc,
        );
        assert_that!(peers.get(ClientId(3)).unwrap().selection.is_valid(&doc)).is_true();
    }
}

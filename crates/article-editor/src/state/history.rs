// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Session-scoped undo/redo.
//!
//! Each entry holds the steps that revert one local transaction, expressed
//! against the document as it will be when that entry reaches the top of
//! its stack. Changes that are not undoable here (remote steps, changes
//! made with history disabled) are folded into every entry by rebasing,
//! so undo only ever reverts the local user's own edits. An entry whose
//! change was taken back during a collaborative rebase is forgotten.

use tracing::{debug, warn};

use super::{EditorState, Origin, Selection, Transaction};
use crate::transform::{rebase_steps, Mapping, Step};

pub const DEFAULT_DEPTH: usize = 100;

#[derive(Clone, Debug)]
struct Entry {
    id: u64,
    steps: Vec<Step>,
    selection_before: Selection,
}

#[derive(Clone, Debug)]
pub struct History {
    done: Vec<Entry>,
    undone: Vec<Entry>,
    depth: usize,
    next_id: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl History {
    pub fn new(depth: usize) -> Self {
        Self {
            done: Vec::new(),
            undone: Vec::new(),
            depth: depth.max(1),
            next_id: 0,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.done.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }

    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Account for a committed transaction. Returns the entry that reverts
    /// it, if there is one.
    pub fn record(&mut self, tx: &Transaction) -> Option<u64> {
        if !tx.doc_changed() {
            return None;
        }
        if tx.origin() == Origin::History {
            return tx.history_entry();
        }
        if tx.add_to_history() {
            let id = self.allocate();
            self.done.push(Entry {
                id,
                steps: tx.inverted_steps(),
                selection_before: tx.selection_before(),
            });
            if self.done.len() > self.depth {
                self.done.remove(0);
            }
            self.undone.clear();
            Some(id)
        } else {
            self.remap(tx.mapping(), tx.forgotten_entries());
            None
        }
    }

    /// Rebase every entry over a change that is not itself undoable,
    /// dropping the `forgotten` ones.
    pub fn remap(&mut self, mapping: &Mapping, forgotten: &[u64]) {
        remap_stack(&mut self.done, mapping, forgotten);
        remap_stack(&mut self.undone, mapping, forgotten);
    }

    /// Revert the most recent local transaction. Returns the new state and
    /// the transaction that produced it, so it can be broadcast. The
    /// transaction names the redo entry it created.
    pub fn undo(&mut self, state: &EditorState) -> Option<(EditorState, Transaction)> {
        let entry = self.done.pop()?;
        let (next, mut tx) = replay(state, &entry)?;
        let id = self.allocate();
        tx.set_history_entry(id);
        self.undone.push(Entry {
            id,
            steps: tx.inverted_steps(),
            selection_before: state.selection(),
        });
        Some((next, tx))
    }

    pub fn redo(&mut self, state: &EditorState) -> Option<(EditorState, Transaction)> {
        let entry = self.undone.pop()?;
        let (next, mut tx) = replay(state, &entry)?;
        let id = self.allocate();
        tx.set_history_entry(id);
        self.done.push(Entry {
            id,
            steps: tx.inverted_steps(),
            selection_before: state.selection(),
        });
        Some((next, tx))
    }
}

fn replay(state: &EditorState, entry: &Entry) -> Option<(EditorState, Transaction)> {
    let mut tx = state.tr();
    tx.set_origin(Origin::History);
    for step in &entry.steps {
        if let Err(e) = tx.step(step.clone()) {
            debug!(error = %e, "Skipping history step that no longer applies");
        }
    }
    let selection = entry.selection_before.validated(tx.doc());
    tx.set_selection(selection);
    match state.apply(&tx) {
        Ok(next) => Some((next, tx)),
        Err(e) => {
            warn!(error = %e, "Dropping history entry that would break the document");
            None
        }
    }
}

fn remap_stack(stack: &mut Vec<Entry>, mapping: &Mapping, forgotten: &[u64]) {
    let mut over = mapping.clone();
    for entry in stack.iter_mut().rev() {
        if forgotten.contains(&entry.id) {
            // Entries below were written against the document with this
            // one applied; take it back out of their way.
            let mut next = Mapping::new();
            for step in entry.steps.iter().rev() {
                next.append_map(step.get_map().invert(), None);
            }
            next.append_mapping(&over);
            entry.steps.clear();
            over = next;
            continue;
        }
        let (steps, next) = rebase_steps(&entry.steps, &over);
        entry.steps = steps;
        entry.selection_before = entry.selection_before.map_positions(&next);
        over = next;
    }
    let before = stack.len();
    stack.retain(|entry| !entry.steps.is_empty());
    if stack.len() < before {
        debug!(dropped = before - stack.len(), "Dropped history entries");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::Node;
    use crate::schema::Schema;

    fn state(text: &str) -> EditorState {
        let schema = Arc::new(Schema::article().unwrap());
        EditorState::new(schema, Node::doc(vec![Node::paragraph_with_text(text)]))
    }

    fn commit(state: &EditorState, history: &mut History, tx: Transaction) -> EditorState {
        let next = state.apply(&tx).unwrap();
        history.record(&tx);
        next
    }

    fn text(state: &EditorState) -> String {
        state.doc().text_content()
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let mut history = History::default();
        let start = state("hello");
        let mut tx = start.tr();
        tx.insert_text(6, " world", vec![]).unwrap();
        let typed = commit(&start, &mut history, tx);
        assert_eq!(text(&typed), "hello world");

        let (undone, _) = history.undo(&typed).unwrap();
        assert_eq!(undone.doc(), start.doc());
        assert!(history.can_redo());

        let (redone, _) = history.redo(&undone).unwrap();
        assert_eq!(redone.doc(), typed.doc());
    }

    #[test]
    fn new_local_edit_clears_redo() {
        let mut history = History::default();
        let s = state("a");
        let mut tx = s.tr();
        tx.insert_text(2, "b", vec![]).unwrap();
        let s = commit(&s, &mut history, tx);
        let (s, _) = history.undo(&s).unwrap();
        let mut tx = s.tr();
        tx.insert_text(2, "c", vec![]).unwrap();
        commit(&s, &mut history, tx);
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_skips_remote_changes() {
        let mut history = History::default();
        let s = state("ab");
        let mut tx = s.tr();
        tx.insert_text(2, "L", vec![]).unwrap();
        let s = commit(&s, &mut history, tx);

        let mut remote = s.tr();
        remote.insert_text(1, "RR", vec![]).unwrap();
        remote.set_origin(Origin::Remote);
        let s = commit(&s, &mut history, remote);
        assert_eq!(text(&s), "RRaLb");

        let (s, _) = history.undo(&s).unwrap();
        assert_eq!(text(&s), "RRab");
        assert!(!history.can_undo());
    }

    #[test]
    fn depth_is_capped() {
        let mut history = History::new(2);
        let mut s = state("");
        for _ in 0..3 {
            let mut tx = s.tr();
            tx.insert_text(1, "x", vec![]).unwrap();
            s = commit(&s, &mut history, tx);
        }
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn entries_whose_content_was_removed_remotely_disappear() {
        let mut history = History::default();
        let s = state("ab");
        let mut tx = s.tr();
        tx.insert_text(2, "L", vec![]).unwrap();
        let s = commit(&s, &mut history, tx);

        let mut remote = s.tr();
        remote.delete(1, 4).unwrap();
        remote.set_origin(Origin::Remote);
        commit(&s, &mut history, remote);
        assert!(!history.can_undo());
    }

    #[test]
    fn forgotten_entries_leave_the_history() {
        let mut history = History::default();
        let s = state("abc");
        let mut typed = s.tr();
        typed.insert_text(4, "X", vec![]).unwrap();
        let s = commit(&s, &mut history, typed);

        let mut tx = s.tr();
        tx.delete(1, 2).unwrap();
        let s_next = s.apply(&tx).unwrap();
        let id = history.record(&tx).unwrap();
        assert_eq!(text(&s_next), "bcX");

        let mut remote = s_next.tr();
        remote.insert_text(1, "R", vec![]).unwrap();
        remote.set_origin(Origin::Remote);
        remote.forget_entry(id);
        let s = commit(&s_next, &mut history, remote);
        assert_eq!(history.undo_depth(), 1);

        let (s, _) = history.undo(&s).unwrap();
        assert_eq!(text(&s), "Rbc");
        assert!(!history.can_undo());
    }

    #[test]
    fn undo_names_the_redo_entry_it_created() {
        let mut history = History::default();
        let s = state("a");
        let mut tx = s.tr();
        tx.insert_text(2, "b", vec![]).unwrap();
        let s = commit(&s, &mut history, tx);
        let (_, undo) = history.undo(&s).unwrap();
        let id = undo.history_entry().unwrap();
        assert_eq!(history.record(&undo), Some(id));
    }
}

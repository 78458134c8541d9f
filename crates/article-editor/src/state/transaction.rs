// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::ops::{Deref, DerefMut};

use super::Selection;
use crate::model::{Mark, Node};
use crate::transform::Transform;

/// Where a transaction came from. Only local transactions are undoable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    Local,
    Remote,
    History,
}

/// A [`Transform`] plus the selection and stored-mark changes that go with
/// it. This is the unit of undo, of validation and of transmission.
#[derive(Clone, Debug)]
pub struct Transaction {
    transform: Transform,
    selection_before: Selection,
    /// An explicit selection and the number of steps it was set after.
    selection: Option<(Selection, usize)>,
    stored_marks: Option<Vec<Mark>>,
    stored_marks_set: bool,
    add_to_history: bool,
    origin: Origin,
    /// The history entry that reverts this transaction, once recorded.
    history_entry: Option<u64>,
    /// History entries whose changes this transaction took back.
    forgotten: Vec<u64>,
}

impl Transaction {
    pub fn new(doc: Node, selection: Selection) -> Self {
        Self {
            transform: Transform::new(doc),
            selection_before: selection,
            selection: None,
            stored_marks: None,
            stored_marks_set: false,
            add_to_history: true,
            origin: Origin::Local,
            history_entry: None,
            forgotten: Vec::new(),
        }
    }

    pub fn selection_before(&self) -> Selection {
        self.selection_before
    }

    /// The latest selection (explicit or starting) mapped through every
    /// step added after it.
    pub fn selection(&self) -> Selection {
        let mapping = self.transform.mapping();
        match self.selection {
            Some((selection, at)) if at == mapping.len() => selection,
            Some((selection, at)) => selection.map(self.transform.doc(), &mapping.slice(at)),
            None => self.selection_before.map(self.transform.doc(), mapping),
        }
    }

    pub fn selection_set(&self) -> bool {
        self.selection.is_some()
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = Some((selection, self.transform.mapping().len()));
        self
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn stored_marks_set(&self) -> bool {
        self.stored_marks_set
    }

    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) -> &mut Self {
        self.stored_marks = marks;
        self.stored_marks_set = true;
        self
    }

    pub fn add_to_history(&self) -> bool {
        self.add_to_history && self.origin == Origin::Local
    }

    pub fn set_add_to_history(&mut self, add: bool) -> &mut Self {
        self.add_to_history = add;
        self
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Origin) -> &mut Self {
        self.origin = origin;
        self
    }

    pub fn history_entry(&self) -> Option<u64> {
        self.history_entry
    }

    pub(crate) fn set_history_entry(&mut self, id: u64) -> &mut Self {
        self.history_entry = Some(id);
        self
    }

    /// Entries that no longer describe what happened to the document and
    /// must leave the undo history.
    pub fn forgotten_entries(&self) -> &[u64] {
        &self.forgotten
    }

    pub(crate) fn forget_entry(&mut self, id: u64) -> &mut Self {
        if !self.forgotten.contains(&id) {
            self.forgotten.push(id);
        }
        self
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }
}

impl Deref for Transaction {
    type Target = Transform;

    fn deref(&self) -> &Transform {
        &self.transform
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

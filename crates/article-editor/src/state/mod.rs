// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Editor state: the document, the selection and stored marks, plus the
//! transactions that move between states and the undo history.

pub mod history;
pub mod selection;
pub mod transaction;

use std::sync::Arc;

pub use history::History;
pub use selection::{Bias, Selection};
pub use transaction::{Origin, Transaction};

use crate::model::{Mark, Node};
use crate::schema::{InvalidNode, Schema};

/// One immutable snapshot of an editing session.
#[derive(Clone, Debug)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Node,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
}

impl EditorState {
    /// Create a state over `doc`, which must already fit `schema`.
    pub fn new(schema: Arc<Schema>, doc: Node) -> Self {
        let selection = Selection::at_start(&doc);
        Self {
            schema,
            doc,
            selection,
            stored_marks: None,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn tr(&self) -> Transaction {
        Transaction::new(self.doc.clone(), self.selection)
    }

    /// Marks the next inserted text will carry.
    pub fn marks_at_cursor(&self) -> Vec<Mark> {
        match &self.stored_marks {
            Some(marks) => marks.clone(),
            None => self.doc.marks_at(self.selection.head()),
        }
    }

    /// The state after `tx`. Fails without side effects when the resulting
    /// document does not fit the schema.
    pub fn apply(&self, tx: &Transaction) -> Result<EditorState, InvalidNode> {
        if tx.doc_changed() {
            self.schema.check(tx.doc())?;
        }
        Ok(self.next_state(tx))
    }

    /// Apply steps the session authority has already ordered. They are
    /// applied even if the result breaks the schema, since every other
    /// participant applies them too.
    pub(crate) fn apply_unchecked(&self, tx: &Transaction) -> EditorState {
        if tx.doc_changed() {
            if let Err(e) = self.schema.check(tx.doc()) {
                tracing::warn!(error = %e, "Applying remote steps that break the schema");
            }
        }
        self.next_state(tx)
    }

    fn next_state(&self, tx: &Transaction) -> EditorState {
        let selection = tx.selection();
        let selection = if selection.is_valid(tx.doc()) {
            selection
        } else {
            Selection::near(tx.doc(), selection.head(), Bias::Forward)
        };
        let stored_marks = if tx.stored_marks_set() {
            tx.stored_marks().map(<[Mark]>::to_vec)
        } else if tx.doc_changed() || selection != self.selection {
            None
        } else {
            self.stored_marks.clone()
        };
        EditorState {
            schema: Arc::clone(&self.schema),
            doc: tx.doc().clone(),
            selection,
            stored_marks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MarkType, NodeType};

    fn state() -> EditorState {
        let schema = Arc::new(Schema::article().unwrap());
        EditorState::new(schema, Node::doc(vec![Node::paragraph_with_text("ab")]))
    }

    #[test]
    fn new_state_puts_the_cursor_in_the_first_block() {
        assert_eq!(state().selection(), Selection::cursor(1));
    }

    #[test]
    fn invalid_documents_are_rejected() {
        let state = state();
        let mut tx = state.tr();
        tx.set_node_type(0, NodeType::BulletList, Default::default())
            .unwrap();
        let err = state.apply(&tx).unwrap_err();
        assert_eq!(err.node_type, NodeType::BulletList);
        assert_eq!(state.doc().child(0).unwrap().node_type(), NodeType::Paragraph);
    }

    #[test]
    fn stored_marks_clear_when_the_document_changes() {
        let state = state();
        let mut tx = state.tr();
        tx.set_stored_marks(Some(vec![Mark::new(MarkType::Bold)]));
        let state = state.apply(&tx).unwrap();
        assert_eq!(state.marks_at_cursor(), vec![Mark::new(MarkType::Bold)]);
        let mut tx = state.tr();
        tx.insert_text(1, "x", vec![]).unwrap();
        let state = state.apply(&tx).unwrap();
        assert!(state.stored_marks().is_none());
    }
}

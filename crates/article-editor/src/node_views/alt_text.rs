// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The alt-text editing modal, shared by image nodes and the article cover
//! image. The modal owns a draft; the document (or the cover) owns the
//! committed value, which is passed in on every transition.

use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum AltTextState {
    #[default]
    Closed,
    Open {
        draft: String,
    },
    DiscardConfirm {
        draft: String,
    },
    Saving {
        draft: String,
    },
}

/// The ways a user can try to close the modal. They all behave the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dismissal {
    CloseButton,
    ClickOutside,
    Escape,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AltTextEvent {
    Open,
    Edit(String),
    Dismiss(Dismissal),
    ConfirmDiscard,
    CancelDiscard,
    Save,
    Saved,
    SaveFailed,
}

/// What the owner has to do after a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AltTextEffect {
    None,
    /// Write the draft as the new alt text, then report `Saved` or
    /// `SaveFailed`.
    Commit(String),
}

#[derive(Clone, Debug, Default)]
pub struct AltTextEditor {
    state: AltTextState,
}

impl AltTextEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AltTextState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != AltTextState::Closed
    }

    pub fn draft(&self) -> Option<&str> {
        match &self.state {
            AltTextState::Closed => None,
            AltTextState::Open { draft }
            | AltTextState::DiscardConfirm { draft }
            | AltTextState::Saving { draft } => Some(draft),
        }
    }

    /// The single transition function. `current` is the committed alt text.
    pub fn transition(&mut self, event: AltTextEvent, current: &str) -> AltTextEffect {
        let state = std::mem::take(&mut self.state);
        let (next, effect) = match (state, event) {
            (AltTextState::Closed, AltTextEvent::Open) => (
                AltTextState::Open {
                    draft: current.to_owned(),
                },
                AltTextEffect::None,
            ),
            (AltTextState::Open { .. }, AltTextEvent::Edit(draft)) => {
                (AltTextState::Open { draft }, AltTextEffect::None)
            }
            (AltTextState::Open { draft }, AltTextEvent::Dismiss(_)) => {
                if draft == current {
                    (AltTextState::Closed, AltTextEffect::None)
                } else {
                    (AltTextState::DiscardConfirm { draft }, AltTextEffect::None)
                }
            }
            (AltTextState::Open { draft }, AltTextEvent::Save) => {
                if draft == current {
                    (AltTextState::Closed, AltTextEffect::None)
                } else {
                    (
                        AltTextState::Saving {
                            draft: draft.clone(),
                        },
                        AltTextEffect::Commit(draft),
                    )
                }
            }
            (AltTextState::DiscardConfirm { .. }, AltTextEvent::ConfirmDiscard) => {
                (AltTextState::Closed, AltTextEffect::None)
            }
            (
                AltTextState::DiscardConfirm { draft },
                AltTextEvent::CancelDiscard | AltTextEvent::Dismiss(_),
            ) => (AltTextState::Open { draft }, AltTextEffect::None),
            (AltTextState::Saving { .. }, AltTextEvent::Saved) => {
                (AltTextState::Closed, AltTextEffect::None)
            }
            (AltTextState::Saving { draft }, AltTextEvent::SaveFailed) => {
                (AltTextState::Open { draft }, AltTextEffect::None)
            }
            (state, event) => {
                debug!(?state, ?event, "Ignoring alt text event");
                (state, AltTextEffect::None)
            }
        };
        self.state = next;
        effect
    }

    /// Drop any draft without committing it.
    pub fn reset(&mut self) {
        self.state = AltTextState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;

    fn opened(current: &str) -> AltTextEditor {
        let mut editor = AltTextEditor::new();
        editor.transition(AltTextEvent::Open, current);
        editor
    }

    #[test]
    fn opening_starts_from_the_committed_value() {
        let editor = opened("A cat");
        assert_that!(editor.draft()).is_equal_to(Some("A cat"));
    }

    #[test]
    fn every_dismissal_of_an_edited_draft_asks_for_confirmation() {
        for dismissal in [Dismissal::CloseButton, Dismissal::ClickOutside, Dismissal::Escape] {
            let mut editor = opened("A cat");
            editor.transition(AltTextEvent::Edit("A dog".into()), "A cat");
            let effect = editor.transition(AltTextEvent::Dismiss(dismissal), "A cat");
            assert_that!(effect).is_equal_to(AltTextEffect::None);
            assert_that!(editor.state().clone()).is_equal_to(AltTextState::DiscardConfirm {
                draft: "A dog".into(),
            });
        }
    }

    #[test]
    fn dismissing_an_unchanged_draft_closes_directly() {
        let mut editor = opened("A cat");
        editor.transition(AltTextEvent::Dismiss(Dismissal::Escape), "A cat");
        assert_that!(editor.is_open()).is_false();
    }

    #[test]
    fn confirming_discard_closes_without_commit() {
        let mut editor = opened("");
        editor.transition(AltTextEvent::Edit("x".into()), "");
        editor.transition(AltTextEvent::Dismiss(Dismissal::ClickOutside), "");
        let effect = editor.transition(AltTextEvent::ConfirmDiscard, "");
        assert_that!(effect).is_equal_to(AltTextEffect::None);
        assert_that!(editor.is_open()).is_false();
    }

    #[test]
    fn cancelling_discard_keeps_the_draft() {
        let mut editor = opened("");
        editor.transition(AltTextEvent::Edit("x".into()), "");
        editor.transition(AltTextEvent::Dismiss(Dismissal::CloseButton), "");
        editor.transition(AltTextEvent::CancelDiscard, "");
        assert_that!(editor.draft()).is_equal_to(Some("x"));
    }

    #[test]
    fn saving_commits_once_and_failure_returns_to_open() {
        let mut editor = opened("");
        editor.transition(AltTextEvent::Edit("A bird".into()), "");
        let effect = editor.transition(AltTextEvent::Save, "");
        assert_that!(effect).is_equal_to(AltTextEffect::Commit("A bird".into()));

        // a second save while one is in flight does nothing
        let again = editor.transition(AltTextEvent::Save, "");
        assert_that!(again).is_equal_to(AltTextEffect::None);

        editor.transition(AltTextEvent::SaveFailed, "");
        assert_that!(editor.state().clone()).is_equal_to(AltTextState::Open {
            draft: "A bird".into(),
        });
    }

    #[test]
    fn saving_an_unchanged_draft_commits_nothing() {
        let mut editor = opened("same");
        let effect = editor.transition(AltTextEvent::Save, "same");
        assert_that!(effect).is_equal_to(AltTextEffect::None);
        assert_that!(editor.is_open()).is_false();
    }
}

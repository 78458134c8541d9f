// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The article around the body: title, cover image, tags, and handing the
//! whole thing to the backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::editor::{Editor, EditorError};
use crate::node_views::{AltTextEffect, AltTextEditor, AltTextEvent, AltTextState};
use crate::serialize::to_json_value;

pub const MAX_TAGS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKey {
    Enter,
    Backspace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagOutcome {
    Added,
    Removed,
    Duplicate,
    Full,
    /// Nothing to act on.
    Ignored,
}

/// Free text entry over a suggestion list.
#[derive(Clone, Debug, Default)]
pub struct TagInput {
    tags: Vec<String>,
    input: String,
    suggestions: Vec<String>,
}

impl TagInput {
    pub fn new(suggestions: Vec<String>) -> Self {
        Self {
            suggestions,
            ..Self::default()
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_full(&self) -> bool {
        self.tags.len() >= MAX_TAGS
    }

    /// Suggestions containing the current input, leaving out tags already
    /// chosen. Nothing is suggested for empty input or a full list.
    pub fn suggestions(&self) -> Vec<&str> {
        let needle = self.input.trim().to_lowercase();
        if needle.is_empty() || self.is_full() {
            return Vec::new();
        }
        self.suggestions
            .iter()
            .filter(|s| s.to_lowercase().contains(&needle) && !self.has(s))
            .map(String::as_str)
            .collect()
    }

    pub fn add(&mut self, tag: &str) -> TagOutcome {
        let tag = tag.trim();
        if tag.is_empty() {
            return TagOutcome::Ignored;
        }
        if self.has(tag) {
            return TagOutcome::Duplicate;
        }
        if self.is_full() {
            return TagOutcome::Full;
        }
        self.tags.push(tag.to_owned());
        TagOutcome::Added
    }

    pub fn remove(&mut self, tag: &str) -> TagOutcome {
        match self.position(tag) {
            Some(index) => {
                self.tags.remove(index);
                TagOutcome::Removed
            }
            None => TagOutcome::Ignored,
        }
    }

    /// Enter commits the input as a tag. Backspace on empty input removes
    /// the last tag; otherwise it belongs to the text field.
    pub fn key(&mut self, key: TagKey) -> TagOutcome {
        match key {
            TagKey::Enter => {
                let input = std::mem::take(&mut self.input);
                let outcome = self.add(&input);
                if outcome != TagOutcome::Added {
                    self.input = input;
                }
                outcome
            }
            TagKey::Backspace if self.input.is_empty() => match self.tags.pop() {
                Some(_) => TagOutcome::Removed,
                None => TagOutcome::Ignored,
            },
            TagKey::Backspace => TagOutcome::Ignored,
        }
    }

    fn has(&self, tag: &str) -> bool {
        self.position(tag).is_some()
    }

    /// Tags are the same regardless of case in any script.
    fn position(&self, tag: &str) -> Option<usize> {
        let tag = tag.trim().to_lowercase();
        self.tags.iter().position(|t| t.to_lowercase() == tag)
    }
}

#[derive(Clone, Debug)]
pub struct CoverImage {
    pub src: String,
    alt: String,
    alt_text: AltTextEditor,
}

impl CoverImage {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: String::new(),
            alt_text: AltTextEditor::new(),
        }
    }

    pub fn alt(&self) -> &str {
        &self.alt
    }

    pub fn alt_text_state(&self) -> &AltTextState {
        self.alt_text.state()
    }

    /// The same modal flow as images in the body.
    pub fn alt_text_event(&mut self, event: AltTextEvent) -> &AltTextState {
        if let AltTextEffect::Commit(draft) = self.alt_text.transition(event, &self.alt) {
            self.alt = draft;
            self.alt_text.transition(AltTextEvent::Saved, &self.alt);
        }
        self.alt_text.state()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverPayload {
    pub src: String,
    pub alt: String,
}

/// What the backend receives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePayload {
    pub title: String,
    /// The body in its persisted JSON form.
    pub body: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<CoverPayload>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedArticle {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// The backend refused; its message is shown as is.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("could not reach the server: {0}")]
    Transport(String),
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn save_draft(&self, payload: &ArticlePayload) -> Result<(), PersistenceError>;

    async fn publish(&self, payload: &ArticlePayload)
        -> Result<PublishedArticle, PersistenceError>;
}

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("an article needs a title before it can be published")]
    MissingTitle,
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Clone, Debug, Default)]
pub struct ArticleDraft {
    pub title: String,
    pub cover: Option<CoverImage>,
    pub tags: TagInput,
}

impl ArticleDraft {
    pub fn new(tag_suggestions: Vec<String>) -> Self {
        Self {
            tags: TagInput::new(tag_suggestions),
            ..Self::default()
        }
    }

    pub fn payload(&self, editor: &Editor) -> Result<ArticlePayload, ArticleError> {
        let body = to_json_value(editor.doc()).map_err(EditorError::from)?;
        Ok(ArticlePayload {
            title: self.title.trim().to_owned(),
            body,
            cover: self.cover.as_ref().map(|c| CoverPayload {
                src: c.src.clone(),
                alt: c.alt.clone(),
            }),
            tags: self.tags.tags().to_vec(),
        })
    }

    /// Save without publishing. The editor stays as it is either way.
    pub async fn save_draft(
        &self,
        editor: &Editor,
        store: &dyn ArticleStore,
    ) -> Result<(), ArticleError> {
        let payload = self.payload(editor)?;
        store.save_draft(&payload).await.map_err(|e| {
            warn!(error = %e, "Saving the draft failed");
            ArticleError::from(e)
        })?;
        debug!("Draft saved");
        Ok(())
    }

    /// Publish and end the editing session. On failure the session and its
    /// document are left untouched so the user can retry.
    pub async fn publish(
        &self,
        editor: &mut Editor,
        store: &dyn ArticleStore,
    ) -> Result<PublishedArticle, ArticleError> {
        if self.title.trim().is_empty() {
            return Err(ArticleError::MissingTitle);
        }
        let payload = self.payload(editor)?;
        let published = store.publish(&payload).await.map_err(|e| {
            warn!(error = %e, "Publishing failed");
            ArticleError::from(e)
        })?;
        debug!(id = published.id, "Article published");
        editor.destroy();
        Ok(published)
    }
}

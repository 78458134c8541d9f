// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! A schema-governed document engine for writing long-form articles.
//!
//! Documents are immutable trees checked against a [`Schema`]. An
//! [`Editor`] owns one live document and changes it only through
//! [`Command`] chains, each committed as one [`Transaction`]. Around that
//! sit interactive node views, image ingestion, contextual toolbars,
//! collaboration against a central session authority, and a read-only
//! [`Preview`].

pub mod article;
pub mod collab;
pub mod commands;
pub mod config;
pub mod editor;
pub mod html;
pub mod link_policy;
pub mod markdown;
pub mod media;
pub mod model;
pub mod node_views;
pub mod preview;
pub mod schema;
pub mod serialize;
pub mod state;
pub mod toolbar;
pub mod transform;

pub use article::{
    ArticleDraft, ArticleError, ArticlePayload, ArticleStore, CoverImage, PersistenceError,
    PublishedArticle, TagInput, TagKey, TagOutcome, MAX_TAGS,
};
pub use collab::{
    ClientId, CollabAdapter, ConnectionStatus, LocalHub, Participant, SessionError,
};
pub use commands::{Command, CommandError};
pub use config::{ConfigError, EditorConfig, MediaConfig};
pub use editor::{
    CommandChain, Editor, EditorContent, EditorError, EditorSnapshot, MountToken, Notice,
};
pub use html::{parse_html, to_html};
pub use link_policy::{AutolinkPolicy, LinkAdmission, LinkPolicy, LinkRejection};
pub use markdown::parse_markdown;
pub use media::{DroppedFile, MediaError, MediaPipeline};
pub use model::{AttrValue, Attrs, Mark, MarkType, Node, NodeId, NodeType};
pub use node_views::{AltTextEvent, AltTextState, Dismissal};
pub use preview::Preview;
pub use schema::{Schema, SchemaError};
pub use serialize::{from_json, to_json, DeserializeError};
pub use state::{EditorState, Selection, Transaction};
pub use toolbar::{ToolbarAction, ToolbarController, ToolbarLayout};
pub use transform::{Step, StepError};

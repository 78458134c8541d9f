// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use serde::Deserialize;
use thiserror::Error;

use crate::link_policy::{AutolinkPolicy, LinkPolicy};
use crate::state::history::DEFAULT_DEPTH;

pub const DEFAULT_PRESENCE_THROTTLE_MS: u64 = 250;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed editor config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid editor config: {0}")]
    Invalid(&'static str),
}

/// Ceilings applied to dropped or picked files.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub allowed_mime_types: Vec<String>,
    /// Files of this many bytes or more are refused.
    pub max_file_bytes: u64,
    /// Largest accepted width or height in pixels.
    pub max_dimension: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            allowed_mime_types: vec!["image/jpeg".to_owned(), "image/png".to_owned()],
            max_file_bytes: 10 * 1024 * 1024,
            max_dimension: 5000,
        }
    }
}

impl MediaConfig {
    pub fn allows(&self, mime: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime.trim()))
    }
}

/// Everything an editor instance is configured with. Each instance gets
/// its own copy; nothing here is global.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub editable: bool,
    pub media: MediaConfig,
    pub links: LinkPolicy,
    pub autolink: AutolinkPolicy,
    pub presence_throttle_ms: u64,
    pub history_depth: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            editable: true,
            media: MediaConfig::default(),
            links: LinkPolicy::default(),
            autolink: AutolinkPolicy::default(),
            presence_throttle_ms: DEFAULT_PRESENCE_THROTTLE_MS,
            history_depth: DEFAULT_DEPTH,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_depth == 0 {
            return Err(ConfigError::Invalid("history_depth must be at least 1"));
        }
        if self.media.max_file_bytes == 0 {
            return Err(ConfigError::Invalid("media.max_file_bytes must be positive"));
        }
        if self.media.max_dimension == 0 {
            return Err(ConfigError::Invalid("media.max_dimension must be positive"));
        }
        if self.links.protocols.default_protocol.is_empty()
            || self.autolink.protocols.default_protocol.is_empty()
        {
            return Err(ConfigError::Invalid("default_protocol must not be empty"));
        }
        Ok(())
    }
}

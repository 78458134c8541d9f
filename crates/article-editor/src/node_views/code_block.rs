// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use strum::IntoEnumIterator;

use crate::commands::{Command, CommandError};
use crate::model::{AttrValue, Attrs, Node, NodeId};
use crate::schema::{is_class_safe, CodeLanguage};

/// Language picker state for one code block.
#[derive(Clone, Debug)]
pub struct CodeBlockView {
    id: NodeId,
    picker_open: bool,
}

impl CodeBlockView {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            picker_open: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_picker_open(&self) -> bool {
        self.picker_open
    }

    pub fn open_picker(&mut self) {
        self.picker_open = true;
    }

    pub fn close_picker(&mut self) {
        self.picker_open = false;
    }

    pub fn toggle_picker(&mut self) {
        self.picker_open = !self.picker_open;
    }

    pub fn options() -> impl Iterator<Item = CodeLanguage> {
        CodeLanguage::iter()
    }

    pub fn language<'d>(&self, doc: &'d Node) -> Option<&'d str> {
        doc.find_by_id(self.id)
            .and_then(|(_, node)| node.attrs().get_str("language"))
    }

    /// The command that applies `language`. Closes the picker whether or
    /// not the language is acceptable. An empty string clears it.
    pub fn select_language(&mut self, language: &str) -> Result<Command, CommandError> {
        self.picker_open = false;
        let language = language.trim();
        let value = if language.is_empty() {
            AttrValue::Null
        } else if is_class_safe(language) {
            AttrValue::from(language)
        } else {
            return Err(CommandError::NotApplicable("using that code language"));
        };
        Ok(Command::UpdateAttributes {
            id: self.id,
            attrs: Attrs::new().with("language", value),
        })
    }
}

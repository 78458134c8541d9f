// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Read-only rendering of a persisted document.

use std::sync::Arc;

use tracing::warn;

use crate::html::to_html;
use crate::model::Node;
use crate::schema::Schema;
use crate::serialize::from_json;

pub const PLACEHOLDER_TEXT: &str = "This article could not be displayed.";

/// A document loaded for display only. There is no way to change it.
#[derive(Clone, Debug)]
pub struct Preview {
    schema: Arc<Schema>,
    doc: Node,
    degraded: Option<String>,
}

impl Preview {
    /// Load the persisted JSON form. Input that does not load is replaced
    /// by a single placeholder paragraph.
    pub fn from_json(schema: Arc<Schema>, json: &str) -> Self {
        match from_json(&schema, json) {
            Ok(doc) => Self {
                schema,
                doc,
                degraded: None,
            },
            Err(e) => {
                warn!(error = %e, "Could not load document for preview");
                Self {
                    schema,
                    doc: Node::doc(vec![Node::paragraph_with_text(PLACEHOLDER_TEXT)]),
                    degraded: Some(e.to_string()),
                }
            }
        }
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// Same markup the editor produces for the same document.
    pub fn to_html(&self) -> String {
        to_html(&self.schema, &self.doc)
    }

    pub fn text(&self) -> String {
        self.doc.text_between_blocks("\n\n")
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Why the stored document was replaced, if it was.
    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded.as_deref()
    }
}

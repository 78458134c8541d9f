// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The persisted form of a document: the node tree as JSON,
//! `{"type":"doc","content":[...]}`.

use thiserror::Error;

use crate::model::{Node, NodeType};
use crate::schema::{InvalidNode, Schema};

#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("malformed document json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("top level node is `{0}`, expected `doc`")]
    NotADocument(NodeType),
    #[error(transparent)]
    Invalid(#[from] InvalidNode),
}

pub fn to_json(doc: &Node) -> Result<String, serde_json::Error> {
    serde_json::to_string(doc)
}

pub fn to_json_value(doc: &Node) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(doc)
}

/// Load a persisted document and check it against `schema`.
pub fn from_json(schema: &Schema, json: &str) -> Result<Node, DeserializeError> {
    let doc: Node = serde_json::from_str(json)?;
    if doc.node_type() != NodeType::Doc {
        return Err(DeserializeError::NotADocument(doc.node_type()));
    }
    schema.check(&doc)?;
    Ok(doc)
}

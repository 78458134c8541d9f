// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::str::FromStr;

use super::{NodeSpec, SchemaError};
use crate::model::{Node, NodeType};

/// A parsed content expression: one term (a group or a type name) with a
/// `*` or `+` quantifier, or the empty expression for leaves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentExpr {
    pub allowed: Vec<NodeType>,
    pub min: usize,
}

impl ContentExpr {
    pub fn empty() -> Self {
        Self {
            allowed: Vec::new(),
            min: 0,
        }
    }

    pub(super) fn parse(
        node_type: NodeType,
        expr: &str,
        specs: &[NodeSpec],
    ) -> Result<Self, SchemaError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(Self::empty());
        }
        let malformed = || SchemaError::MalformedContent {
            node_type,
            expr: expr.to_owned(),
        };
        let (name, min) = if let Some(name) = expr.strip_suffix('*') {
            (name, 0)
        } else if let Some(name) = expr.strip_suffix('+') {
            (name, 1)
        } else {
            return Err(malformed());
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(malformed());
        }

        let mut allowed: Vec<NodeType> = specs
            .iter()
            .filter(|s| s.group == Some(name))
            .map(|s| s.node_type)
            .collect();
        if allowed.is_empty() {
            if let Ok(t) = NodeType::from_str(name) {
                if specs.iter().any(|s| s.node_type == t) {
                    allowed.push(t);
                }
            }
        }
        if allowed.is_empty() {
            return Err(SchemaError::UnknownContent {
                node_type,
                name: name.to_owned(),
            });
        }
        Ok(Self { allowed, min })
    }

    pub fn allows(&self, node_type: NodeType) -> bool {
        self.allowed.contains(&node_type)
    }

    pub fn is_leaf(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn inline_content(&self) -> bool {
        self.allowed.iter().any(NodeType::is_inline)
    }

    pub fn matches(&self, content: &[Node]) -> bool {
        content.len() >= self.min && content.iter().all(|c| self.allows(c.node_type()))
    }
}

// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The registry of node and mark types an editor instance accepts, their
//! attributes, content rules, and how they map to and from HTML.

mod content;
pub mod extension;
pub mod languages;

use std::collections::HashMap;

use thiserror::Error;

use crate::html::dom::Element;
use crate::model::{AttrValue, Attrs, Mark, MarkType, Node, NodeType};

pub use content::ContentExpr;
pub use extension::{
    CodeBlockExtension, Extension, ImageExtension, LinkExtension, StarterKit,
};
pub use languages::{is_class_safe, CodeLanguage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema is missing required node type `{0}`")]
    MissingNode(NodeType),
    #[error("content expression `{expr}` of `{node_type}` is malformed")]
    MalformedContent { node_type: NodeType, expr: String },
    #[error("content expression of `{node_type}` names unknown `{name}`")]
    UnknownContent { node_type: NodeType, name: String },
}

/// Why a proposed node does not fit the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {node_type} node: {reason}")]
pub struct InvalidNode {
    pub node_type: NodeType,
    pub reason: String,
}

impl InvalidNode {
    fn new(node_type: NodeType, reason: impl Into<String>) -> Self {
        Self {
            node_type,
            reason: reason.into(),
        }
    }
}

pub struct AttrSpec {
    pub name: &'static str,
    /// `None` makes the attribute required.
    pub default: Option<AttrValue>,
    pub validate: Option<fn(&AttrValue) -> bool>,
}

impl AttrSpec {
    pub fn optional(name: &'static str, default: impl Into<AttrValue>) -> Self {
        Self {
            name,
            default: Some(default.into()),
            validate: None,
        }
    }

    pub fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
            validate: None,
        }
    }

    pub fn validated(mut self, validate: fn(&AttrValue) -> bool) -> Self {
        self.validate = Some(validate);
        self
    }
}

/// Matches an HTML element by tag name. `get_attrs` may refuse the element
/// by returning `None`.
pub struct ParseRule {
    pub tag: &'static str,
    pub get_attrs: Option<fn(&Element) -> Option<Attrs>>,
}

impl ParseRule {
    pub fn tag(tag: &'static str) -> Self {
        Self {
            tag,
            get_attrs: None,
        }
    }

    pub fn with_attrs(
        tag: &'static str,
        get_attrs: fn(&Element) -> Option<Attrs>,
    ) -> Self {
        Self {
            tag,
            get_attrs: Some(get_attrs),
        }
    }

    pub fn matches(&self, element: &Element) -> Option<Attrs> {
        if !element.name.eq_ignore_ascii_case(self.tag) {
            return None;
        }
        match self.get_attrs {
            Some(get_attrs) => get_attrs(element),
            None => Some(Attrs::new()),
        }
    }
}

/// Output shape of a node or mark. Content goes into the innermost element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomSpec {
    pub tag: &'static str,
    pub attrs: Vec<(&'static str, String)>,
    pub inner: Option<Box<DomSpec>>,
}

impl DomSpec {
    pub fn tag(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            inner: None,
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn wrapping(mut self, inner: DomSpec) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }
}

pub struct NodeSpec {
    pub node_type: NodeType,
    pub content: &'static str,
    pub group: Option<&'static str>,
    pub attrs: Vec<AttrSpec>,
    pub parse: Vec<ParseRule>,
    pub render: Option<fn(&Node) -> DomSpec>,
}

impl NodeSpec {
    pub fn new(node_type: NodeType, content: &'static str) -> Self {
        Self {
            node_type,
            content,
            group: None,
            attrs: Vec::new(),
            parse: Vec::new(),
            render: None,
        }
    }

    pub fn group(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }

    pub fn attr(mut self, spec: AttrSpec) -> Self {
        self.attrs.push(spec);
        self
    }

    pub fn parse_rule(mut self, rule: ParseRule) -> Self {
        self.parse.push(rule);
        self
    }

    pub fn render(mut self, render: fn(&Node) -> DomSpec) -> Self {
        self.render = Some(render);
        self
    }
}

pub struct MarkSpec {
    pub mark_type: MarkType,
    pub attrs: Vec<AttrSpec>,
    pub parse: Vec<ParseRule>,
    pub render: fn(&Mark) -> DomSpec,
}

pub struct Schema {
    nodes: Vec<NodeSpec>,
    content: HashMap<NodeType, ContentExpr>,
    marks: Vec<MarkSpec>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field(
                "nodes",
                &self.nodes.iter().map(|n| n.node_type).collect::<Vec<_>>(),
            )
            .field(
                "marks",
                &self.marks.iter().map(|m| m.mark_type).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[derive(Default)]
pub struct SchemaBuilder {
    nodes: Vec<NodeSpec>,
    marks: Vec<MarkSpec>,
}

impl SchemaBuilder {
    /// Register an extension. A later spec for an already registered type
    /// replaces the earlier one in place.
    pub fn extension(mut self, extension: &dyn Extension) -> Self {
        for spec in extension.nodes() {
            match self.nodes.iter().position(|n| n.node_type == spec.node_type) {
                Some(i) => self.nodes[i] = spec,
                None => self.nodes.push(spec),
            }
        }
        for spec in extension.marks() {
            match self.marks.iter().position(|m| m.mark_type == spec.mark_type) {
                Some(i) => self.marks[i] = spec,
                None => self.marks.push(spec),
            }
        }
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        for required in [NodeType::Doc, NodeType::Paragraph, NodeType::Text] {
            if !self.nodes.iter().any(|n| n.node_type == required) {
                return Err(SchemaError::MissingNode(required));
            }
        }
        let mut content = HashMap::new();
        for spec in &self.nodes {
            let expr = ContentExpr::parse(spec.node_type, spec.content, &self.nodes)?;
            content.insert(spec.node_type, expr);
        }
        let mut marks = self.marks;
        marks.sort_by_key(|m| m.mark_type);
        Ok(Schema {
            nodes: self.nodes,
            content,
            marks,
        })
    }
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// The schema used for article bodies.
    pub fn article() -> Result<Schema, SchemaError> {
        Schema::builder()
            .extension(&StarterKit)
            .extension(&CodeBlockExtension)
            .extension(&ImageExtension)
            .extension(&LinkExtension)
            .build()
    }

    pub fn node_spec(&self, node_type: NodeType) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.node_type == node_type)
    }

    pub fn mark_spec(&self, mark_type: MarkType) -> Option<&MarkSpec> {
        self.marks.iter().find(|m| m.mark_type == mark_type)
    }

    pub fn has_node(&self, node_type: NodeType) -> bool {
        self.node_spec(node_type).is_some()
    }

    pub fn has_mark(&self, mark_type: MarkType) -> bool {
        self.mark_spec(mark_type).is_some()
    }

    pub fn node_specs(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter()
    }

    pub fn mark_specs(&self) -> impl Iterator<Item = &MarkSpec> {
        self.marks.iter()
    }

    pub fn content_expr(&self, node_type: NodeType) -> Option<&ContentExpr> {
        self.content.get(&node_type)
    }

    /// Fill defaults for missing attributes and validate the result.
    pub fn compute_attrs(
        &self,
        node_type: NodeType,
        given: &Attrs,
    ) -> Result<Attrs, InvalidNode> {
        let spec = self
            .node_spec(node_type)
            .ok_or_else(|| InvalidNode::new(node_type, "type not in schema"))?;
        build_attrs(node_type, &spec.attrs, given)
    }

    pub fn compute_mark_attrs(
        &self,
        mark_type: MarkType,
        given: &Attrs,
    ) -> Option<Attrs> {
        let spec = self.mark_spec(mark_type)?;
        build_attrs(NodeType::Text, &spec.attrs, given).ok()
    }

    /// Build a node, filling defaults and the minimal required content.
    pub fn create_and_fill(
        &self,
        node_type: NodeType,
        attrs: &Attrs,
        content: Vec<Node>,
    ) -> Result<Node, InvalidNode> {
        let attrs = self.compute_attrs(node_type, attrs)?;
        let content = if content.is_empty() {
            self.fill_content(node_type)
        } else {
            content
        };
        Ok(Node::new(node_type, attrs, content))
    }

    /// Smallest content satisfying `node_type`'s content expression.
    pub fn fill_content(&self, node_type: NodeType) -> Vec<Node> {
        match self.content_expr(node_type) {
            Some(expr) if expr.min > 0 => {
                match expr.allowed.iter().find(|t| !t.is_inline()) {
                    Some(child) => {
                        let attrs = self
                            .compute_attrs(*child, &Attrs::new())
                            .unwrap_or_default();
                        vec![Node::new(*child, attrs, self.fill_content(*child))]
                    }
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    /// An empty document containing one empty paragraph.
    pub fn empty_doc(&self) -> Node {
        Node::doc(vec![Node::paragraph(Vec::new())])
    }

    pub fn allows_child(&self, parent: NodeType, child: NodeType) -> bool {
        self.content_expr(parent)
            .map(|e| e.allows(child))
            .unwrap_or(false)
    }

    pub fn valid_content(&self, parent: NodeType, content: &[Node]) -> bool {
        self.content_expr(parent)
            .map(|e| e.matches(content))
            .unwrap_or(false)
    }

    /// Shallow check of a single node: type, attributes, marks and the
    /// shape of its direct content.
    pub fn check_node(&self, node: &Node) -> Result<(), InvalidNode> {
        let node_type = node.node_type();
        let spec = self
            .node_spec(node_type)
            .ok_or_else(|| InvalidNode::new(node_type, "type not in schema"))?;
        check_attrs(node_type, &spec.attrs, node.attrs())?;
        if node.is_text() && node.text_str().is_empty() {
            return Err(InvalidNode::new(node_type, "empty text run"));
        }
        for mark in node.marks() {
            let mark_spec = self.mark_spec(mark.mark_type).ok_or_else(|| {
                InvalidNode::new(
                    node_type,
                    format!("mark `{}` not in schema", mark.mark_type),
                )
            })?;
            check_attrs(node_type, &mark_spec.attrs, &mark.attrs)?;
        }
        let expr = self
            .content_expr(node_type)
            .ok_or_else(|| InvalidNode::new(node_type, "no content rule"))?;
        if let Some(bad) = node.content().iter().find(|c| !expr.allows(c.node_type())) {
            return Err(InvalidNode::new(
                node_type,
                format!("`{}` is not allowed as a child", bad.node_type()),
            ));
        }
        if node.child_count() < expr.min {
            return Err(InvalidNode::new(node_type, "content may not be empty"));
        }
        if !node_type.allows_marks()
            && node.content().iter().any(|c| !c.marks().is_empty())
        {
            return Err(InvalidNode::new(node_type, "marks are not allowed here"));
        }
        Ok(())
    }

    /// Recursive check of a whole subtree.
    pub fn check(&self, node: &Node) -> Result<(), InvalidNode> {
        self.check_node(node)?;
        node.content().iter().try_for_each(|child| self.check(child))
    }

    /// Contract form of [`Schema::check_node`] for a node not yet built.
    pub fn validate(
        &self,
        node_type: NodeType,
        attrs: &Attrs,
        content: &[Node],
    ) -> Result<(), InvalidNode> {
        let node = Node::new(node_type, attrs.clone(), content.to_vec());
        self.check_node(&node)?;
        content.iter().try_for_each(|child| self.check(child))
    }
}

fn build_attrs(
    node_type: NodeType,
    specs: &[AttrSpec],
    given: &Attrs,
) -> Result<Attrs, InvalidNode> {
    let mut attrs = Attrs::new();
    for spec in specs {
        let value = match (given.get(spec.name), &spec.default) {
            (Some(value), _) => value.clone(),
            (None, Some(default)) => default.clone(),
            (None, None) => {
                return Err(InvalidNode::new(
                    node_type,
                    format!("missing required attribute `{}`", spec.name),
                ))
            }
        };
        attrs.set(spec.name, value);
    }
    check_attrs(node_type, specs, &attrs)?;
    Ok(attrs)
}

fn check_attrs(
    node_type: NodeType,
    specs: &[AttrSpec],
    attrs: &Attrs,
) -> Result<(), InvalidNode> {
    for (name, _) in attrs.iter() {
        if !specs.iter().any(|s| s.name == name) {
            return Err(InvalidNode::new(
                node_type,
                format!("unknown attribute `{name}`"),
            ));
        }
    }
    for spec in specs {
        match attrs.get(spec.name) {
            None if spec.default.is_none() => {
                return Err(InvalidNode::new(
                    node_type,
                    format!("missing required attribute `{}`", spec.name),
                ))
            }
            Some(value) => {
                if let Some(validate) = spec.validate {
                    if !validate(value) {
                        return Err(InvalidNode::new(
                            node_type,
                            format!("bad value `{value}` for `{}`", spec.name),
                        ));
                    }
                }
            }
            None => {}
        }
    }
    Ok(())
}

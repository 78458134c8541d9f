// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::borrow::Cow;
use std::cell::{Ref, RefCell};

use html5ever::interface::NextParserState;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{
    parse_fragment, Attribute, LocalName, Namespace, QualName,
};

use super::dom::{DomNode, Element};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SinkHandle(usize);

#[derive(Clone, Debug)]
enum SinkKind {
    Document,
    Element(Vec<(String, String)>),
    Text(String),
    Comment,
}

#[derive(Clone, Debug)]
struct SinkNode {
    name: QualName,
    kind: SinkKind,
    parent: Option<usize>,
    children: Vec<usize>,
    template_contents: Option<usize>,
}

#[derive(Default)]
struct SinkState {
    nodes: Vec<SinkNode>,
    parse_errors: Vec<String>,
}

impl SinkState {
    fn add(&mut self, name: QualName, kind: SinkKind) -> usize {
        self.nodes.push(SinkNode {
            name,
            kind,
            parent: None,
            children: Vec::new(),
            template_contents: None,
        });
        self.nodes.len() - 1
    }

    fn detach(&mut self, node: usize) {
        if let Some(parent) = self.nodes.get_mut(node).and_then(|n| n.parent.take()) {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|c| *c != node);
            }
        }
    }

    fn accepts_children(&self, node: usize) -> bool {
        matches!(
            self.nodes.get(node).map(|n| &n.kind),
            Some(SinkKind::Document | SinkKind::Element(_))
        )
    }

    /// Insert `child` into `parent` at `index` (or at the end).
    fn insert(&mut self, parent: usize, index: Option<usize>, child: NodeOrText<SinkHandle>) {
        if !self.accepts_children(parent) {
            return;
        }
        let at = index.unwrap_or(self.nodes[parent].children.len());
        match child {
            NodeOrText::AppendNode(SinkHandle(child)) => {
                self.detach(child);
                self.nodes[child].parent = Some(parent);
                self.nodes[parent].children.insert(at, child);
            }
            NodeOrText::AppendText(tendril) => {
                let previous = at
                    .checked_sub(1)
                    .and_then(|i| self.nodes[parent].children.get(i).copied());
                if let Some(prev) = previous {
                    if let SinkKind::Text(text) = &mut self.nodes[prev].kind {
                        text.push_str(tendril.as_ref());
                        return;
                    }
                }
                let text = self.add(
                    empty_name(),
                    SinkKind::Text(tendril.as_ref().to_owned()),
                );
                self.nodes[text].parent = Some(parent);
                self.nodes[parent].children.insert(at, text);
            }
        }
    }

    fn convert(&self, node: usize, out: &mut Vec<DomNode>) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        match &n.kind {
            SinkKind::Text(text) => out.push(DomNode::Text(text.clone())),
            SinkKind::Comment => {}
            SinkKind::Document => {
                for child in &n.children {
                    self.convert(*child, out);
                }
            }
            SinkKind::Element(attrs) => {
                let name = n.name.local.as_ref().to_ascii_lowercase();
                // The fragment root is transparent.
                if name == "html" && n.parent == Some(0) {
                    for child in &n.children {
                        self.convert(*child, out);
                    }
                    return;
                }
                let mut children = Vec::new();
                for child in &n.children {
                    self.convert(*child, &mut children);
                }
                out.push(DomNode::Element(Element {
                    name,
                    attrs: attrs.clone(),
                    children,
                }));
            }
        }
    }
}

fn empty_name() -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(""))
}

/// Tree sink building a parent-linked arena. Every callback is total: an
/// operation that makes no sense for the target node is ignored.
pub(crate) struct ArenaSink {
    state: RefCell<SinkState>,
}

impl ArenaSink {
    pub fn parse(html: &str) -> Vec<DomNode> {
        let body = QualName::new(
            None,
            Namespace::from("http://www.w3.org/1999/xhtml"),
            LocalName::from("body"),
        );
        parse_fragment(ArenaSink::default(), Default::default(), body, vec![])
            .from_utf8()
            .one(html.as_bytes())
    }
}

impl Default for ArenaSink {
    fn default() -> Self {
        let mut state = SinkState::default();
        state.add(empty_name(), SinkKind::Document);
        Self {
            state: RefCell::new(state),
        }
    }
}

impl TreeSink for ArenaSink {
    type Handle = SinkHandle;
    type Output = Vec<DomNode>;
    type ElemName<'a> = Ref<'a, QualName>;

    fn finish(self) -> Self::Output {
        let state = self.state.into_inner();
        if !state.parse_errors.is_empty() {
            tracing::debug!(
                errors = state.parse_errors.len(),
                first = %state.parse_errors[0],
                "recovered from malformed html"
            );
        }
        let mut out = Vec::new();
        state.convert(0, &mut out);
        out
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.state.borrow_mut().parse_errors.push(msg.into_owned());
    }

    fn get_document(&self) -> Self::Handle {
        SinkHandle(0)
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        Ref::map(self.state.borrow(), |state| match state.nodes.get(target.0) {
            Some(node) => &node.name,
            None => &state.nodes[0].name,
        })
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Self::Handle {
        let mut state = self.state.borrow_mut();
        let attrs = attrs
            .into_iter()
            .map(|a| (a.name.local.as_ref().to_owned(), a.value.as_ref().to_owned()))
            .collect();
        let element = state.add(name, SinkKind::Element(attrs));
        if flags.template {
            let contents = state.add(empty_name(), SinkKind::Document);
            state.nodes[element].template_contents = Some(contents);
        }
        SinkHandle(element)
    }

    fn create_comment(&self, _text: StrTendril) -> Self::Handle {
        SinkHandle(self.state.borrow_mut().add(empty_name(), SinkKind::Comment))
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        SinkHandle(self.state.borrow_mut().add(empty_name(), SinkKind::Comment))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        self.state.borrow_mut().insert(parent.0, None, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self
            .state
            .borrow()
            .nodes
            .get(element.0)
            .is_some_and(|n| n.parent.is_some());
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        let state = self.state.borrow();
        state
            .nodes
            .get(target.0)
            .and_then(|n| n.template_contents)
            .map(SinkHandle)
            .unwrap_or(*target)
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(
        &self,
        sibling: &Self::Handle,
        new_node: NodeOrText<Self::Handle>,
    ) {
        let mut state = self.state.borrow_mut();
        let Some(parent) = state.nodes.get(sibling.0).and_then(|n| n.parent) else {
            return;
        };
        if let NodeOrText::AppendNode(SinkHandle(node)) = &new_node {
            state.detach(*node);
        }
        let index = state.nodes[parent]
            .children
            .iter()
            .position(|c| *c == sibling.0);
        state.insert(parent, index, new_node);
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut state = self.state.borrow_mut();
        if let Some(SinkKind::Element(existing)) =
            state.nodes.get_mut(target.0).map(|n| &mut n.kind)
        {
            for attr in attrs {
                let name = attr.name.local.as_ref();
                if !existing.iter().any(|(n, _)| n == name) {
                    existing.push((name.to_owned(), attr.value.as_ref().to_owned()));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.state.borrow_mut().detach(target.0);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut state = self.state.borrow_mut();
        if !state.accepts_children(new_parent.0) {
            return;
        }
        let children = match state.nodes.get_mut(node.0) {
            Some(n) => std::mem::take(&mut n.children),
            None => return,
        };
        for child in children {
            state.nodes[child].parent = Some(new_parent.0);
            state.nodes[new_parent.0].children.push(child);
        }
    }

    fn is_mathml_annotation_xml_integration_point(&self, _handle: &Self::Handle) -> bool {
        false
    }

    fn complete_script(&self, _node: &Self::Handle) -> NextParserState {
        NextParserState::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(name: &str, children: Vec<DomNode>) -> DomNode {
        let mut e = Element::new(name);
        e.children = children;
        DomNode::Element(e)
    }

    fn tx(text: &str) -> DomNode {
        DomNode::Text(text.to_owned())
    }

    #[test]
    fn parsing_an_empty_string_creates_nothing() {
        assert!(ArenaSink::parse("").is_empty());
    }

    #[test]
    fn parsing_nested_structures_produces_them() {
        assert_eq!(
            ArenaSink::parse("A<i>B<b>C</b>D</i>E"),
            vec![
                tx("A"),
                el("i", vec![tx("B"), el("b", vec![tx("C")]), tx("D")]),
                tx("E"),
            ]
        );
    }

    #[test]
    fn parsing_text_node_with_escaped_html_entities() {
        assert_eq!(
            ArenaSink::parse("aaa&lt;strong&gt;bbb"),
            vec![tx("aaa<strong>bbb")]
        );
    }

    #[test]
    fn comments_and_templates_do_not_panic() {
        let out = ArenaSink::parse("<!-- c --><template><p>t</p></template><p>x</p>");
        assert_eq!(out.last(), Some(&el("p", vec![tx("x")])));
    }

    #[test]
    fn misnested_formatting_is_repaired() {
        let out = ArenaSink::parse("<b>1<p>2</b>3</p>");
        assert!(out
            .iter()
            .any(|n| matches!(n, DomNode::Element(e) if e.name == "p")));
    }

    #[test]
    fn attributes_are_kept() {
        let out = ArenaSink::parse("<a href='https://x.org'>x</a>");
        match &out[0] {
            DomNode::Element(a) => assert_eq!(a.get_attr("href"), Some("https://x.org")),
            DomNode::Text(_) => panic!("expected an element"),
        }
    }
}

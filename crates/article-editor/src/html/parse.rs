// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::link_policy::{LinkAdmission, LinkPolicy};
use crate::model::{Attrs, Mark, MarkType, Node, NodeType};
use crate::schema::Schema;

use super::builder::DocBuilder;
use super::dom::{DomNode, Element};

const IGNORED: [&str; 7] = ["script", "style", "head", "meta", "title", "template", "noscript"];

/// Parse external HTML into a document valid for `schema`. Never fails:
/// unrecognised elements are unwrapped, unrecognisable content becomes
/// text, and hyperlinks are admitted through `links`.
pub fn parse_html(schema: &Schema, links: &LinkPolicy, html: &str) -> Node {
    let dom = dom_from_html(html);
    let mut walker = Walker {
        builder: DocBuilder::new(schema),
        schema,
        links,
    };
    walker.walk_all(&dom);
    walker.builder.finish()
}

fn dom_from_html(html: &str) -> Vec<DomNode> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "sys")] {
            super::sink::ArenaSink::parse(html)
        } else {
            text_fallback(html)
        }
    }
}

/// Without an HTML parser, keep the text and one paragraph per line.
#[cfg_attr(feature = "sys", allow(dead_code))]
fn text_fallback(html: &str) -> Vec<DomNode> {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static BREAKS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)<br\s*/?>|</(p|div|h[1-6]|li|pre|blockquote)\s*>").unwrap()
    });
    static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

    let with_breaks = BREAKS.replace_all(html, "\n");
    let stripped = TAGS.replace_all(&with_breaks, "");
    let text = html_escape::decode_html_entities(&stripped);
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| DomNode::Element(Element::new("p").with_child(DomNode::Text(line.to_owned()))))
        .collect()
}

struct Walker<'a> {
    builder: DocBuilder<'a>,
    schema: &'a Schema,
    links: &'a LinkPolicy,
}

impl Walker<'_> {
    fn walk_all(&mut self, nodes: &[DomNode]) {
        for node in nodes {
            match node {
                DomNode::Text(text) => self.builder.text(text),
                DomNode::Element(element) => self.element(element),
            }
        }
    }

    fn element(&mut self, element: &Element) {
        if IGNORED.contains(&element.name.as_str()) {
            return;
        }
        if let Some((node_type, attrs)) = self.match_node(element) {
            self.node(node_type, attrs, element);
        } else if let Some(mark) = self.match_mark(element) {
            let depth = mark.map(|mark| self.builder.push_mark(mark));
            self.walk_all(&element.children);
            if let Some(depth) = depth {
                self.builder.pop_marks_to(depth);
            }
        } else {
            self.walk_all(&element.children);
        }
    }

    fn node(&mut self, node_type: NodeType, attrs: Attrs, element: &Element) {
        if node_type.is_leaf() {
            self.builder.leaf(node_type, attrs);
        } else if node_type == NodeType::CodeBlock {
            let depth = self.builder.open(node_type, attrs);
            self.builder.text(&element.text_content());
            if let Some(depth) = depth {
                self.builder.close_to(depth);
            }
        } else {
            let depth = self.builder.open(node_type, attrs);
            self.walk_all(&element.children);
            if let Some(depth) = depth {
                self.builder.close_to(depth);
            }
        }
    }

    fn match_node(&self, element: &Element) -> Option<(NodeType, Attrs)> {
        self.schema.node_specs().find_map(|spec| {
            spec.parse
                .iter()
                .find_map(|rule| rule.matches(element))
                .map(|attrs| (spec.node_type, attrs))
        })
    }

    /// `Some(None)` for a recognised mark element whose mark was refused
    /// (a link that failed admission): its content is kept unmarked.
    fn match_mark(&self, element: &Element) -> Option<Option<Mark>> {
        let (mark_type, attrs) = self.schema.mark_specs().find_map(|spec| {
            spec.parse
                .iter()
                .find_map(|rule| rule.matches(element))
                .map(|attrs| (spec.mark_type, attrs))
        })?;
        if mark_type != MarkType::Link {
            return Some(Some(Mark::with_attrs(mark_type, attrs)));
        }
        let href = attrs.get_str("href").unwrap_or("");
        match self.links.admit(href) {
            LinkAdmission::Accepted { href, protocol } => Some(Some(Mark::link(&href, &protocol))),
            LinkAdmission::Rejected(reason) => {
                tracing::warn!(%reason, "dropping link from parsed html");
                Some(None)
            }
        }
    }
}

#[cfg(all(test, feature = "sys"))]
mod tests {
    use indoc::indoc;

    use super::*;

    fn parse(html: &str) -> Node {
        parse_html(&Schema::article().unwrap(), &LinkPolicy::default(), html)
    }

    #[test]
    fn unknown_markup_falls_back_to_paragraphs() {
        let doc = parse("<div><span>plain</span></div><custom-el>more</custom-el>");
        assert_eq!(doc, Node::doc(vec![Node::paragraph_with_text("plainmore")]));
    }

    #[test]
    fn code_language_is_read_from_the_class() {
        let doc = parse(r#"<pre><code class="language-rust">fn main() {}</code></pre>"#);
        let code = doc.child(0).unwrap();
        assert_eq!(code.node_type(), NodeType::CodeBlock);
        assert_eq!(code.attrs().get_str("language"), Some("rust"));
        assert_eq!(code.text_content(), "fn main() {}");
    }

    #[test]
    fn javascript_links_lose_their_mark() {
        let doc = parse(r#"<p><a href="javascript:alert(1)">click</a></p>"#);
        let text = doc.child(0).unwrap().child(0).unwrap();
        assert_eq!(text.text_str(), "click");
        assert!(text.marks().is_empty());
    }

    #[test]
    fn scripts_are_ignored() {
        let doc = parse("<p>a</p><script>alert(1)</script><style>p{}</style>");
        assert_eq!(doc.text_content(), "a");
    }

    #[test]
    fn pasted_document_keeps_structure() {
        let doc = parse(indoc! {r#"
            <h2>Title</h2>
            <ul>
              <li>one</li>
              <li><p>two</p></li>
            </ul>
            <img src="a.png" alt="A cat">
        "#});
        let types: Vec<NodeType> = doc.content().iter().map(Node::node_type).collect();
        assert_eq!(types, vec![NodeType::Heading, NodeType::BulletList, NodeType::Image]);
        assert_eq!(doc.child(0).unwrap().attrs().get_int("level"), Some(2));
        assert_eq!(doc.child(1).unwrap().child_count(), 2);
        assert_eq!(doc.child(2).unwrap().attrs().get_str("alt"), Some("A cat"));
    }

    #[test]
    fn images_without_src_are_dropped() {
        let doc = parse(r#"<p>x</p><img alt="nothing">"#);
        assert_eq!(doc.child_count(), 1);
    }
}

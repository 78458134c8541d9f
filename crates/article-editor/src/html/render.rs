// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::model::{Mark, Node};
use crate::schema::{DomSpec, Schema};

/// Render `node` (usually a doc) to HTML using the schema's render specs.
/// Editor and preview both go through here.
pub fn to_html(schema: &Schema, node: &Node) -> String {
    let mut out = String::new();
    render_node(schema, node, &mut out);
    out
}

fn render_node(schema: &Schema, node: &Node, out: &mut String) {
    if node.is_text() {
        out.push_str(&encode_text(node.text_str()));
        return;
    }
    let spec = schema
        .node_spec(node.node_type())
        .and_then(|s| s.render)
        .map(|render| render(node));
    if let Some(spec) = &spec {
        open_tags(spec, out);
        if node.is_leaf() {
            return;
        }
    }
    if node.is_textblock() {
        render_inline(schema, node.content(), out);
    } else {
        for child in node.content() {
            render_node(schema, child, out);
        }
    }
    if let Some(spec) = &spec {
        close_tags(spec, out);
    }
}

fn render_inline(schema: &Schema, content: &[Node], out: &mut String) {
    let mut active: Vec<(Mark, DomSpec)> = Vec::new();
    for node in content {
        let marks: Vec<&Mark> = node
            .marks()
            .iter()
            .filter(|m| schema.has_mark(m.mark_type))
            .collect();
        let keep = active
            .iter()
            .zip(marks.iter())
            .take_while(|((a, _), b)| a == **b)
            .count();
        while active.len() > keep {
            if let Some((_, spec)) = active.pop() {
                close_tags(&spec, out);
            }
        }
        for mark in &marks[keep..] {
            if let Some(spec) = schema.mark_spec(mark.mark_type).map(|s| (s.render)(mark)) {
                open_tags(&spec, out);
                active.push(((*mark).clone(), spec));
            }
        }
        render_node(schema, node, out);
    }
    while let Some((_, spec)) = active.pop() {
        close_tags(&spec, out);
    }
}

fn open_tags(spec: &DomSpec, out: &mut String) {
    out.push('<');
    out.push_str(spec.tag);
    for (name, value) in &spec.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');
    if let Some(inner) = &spec.inner {
        open_tags(inner, out);
    }
}

fn close_tags(spec: &DomSpec, out: &mut String) {
    if let Some(inner) = &spec.inner {
        close_tags(inner, out);
    }
    out.push_str("</");
    out.push_str(spec.tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attrs, MarkType, NodeType};

    fn schema() -> Schema {
        Schema::article().unwrap()
    }

    #[test]
    fn marks_nest_across_runs() {
        let bold = Mark::new(MarkType::Bold);
        let italic = Mark::new(MarkType::Italic);
        let doc = Node::doc(vec![Node::paragraph(vec![
            Node::text("a", vec![bold.clone()]),
            Node::text("b", vec![bold.clone(), italic.clone()]),
            Node::text("c", vec![]),
        ])]);
        assert_eq!(
            to_html(&schema(), &doc),
            "<p><strong>a<em>b</em></strong>c</p>"
        );
    }

    #[test]
    fn code_blocks_carry_their_language_class() {
        let code = Node::new(
            NodeType::CodeBlock,
            Attrs::new().with("language", "rust"),
            vec![Node::text("let x = 1 < 2;", vec![])],
        );
        assert_eq!(
            to_html(&schema(), &Node::doc(vec![code])),
            r#"<pre><code class="language-rust">let x = 1 &lt; 2;</code></pre>"#
        );
    }

    #[test]
    fn links_render_safe_attributes() {
        let doc = Node::doc(vec![Node::paragraph(vec![Node::text(
            "x",
            vec![Mark::link("https://a.org/?q=\"", "https")],
        )])]);
        assert_eq!(
            to_html(&schema(), &doc),
            "<p><a href=\"https://a.org/?q=&quot;\" rel=\"noopener noreferrer nofollow\" target=\"_blank\">x</a></p>"
        );
    }

    #[test]
    fn images_are_void() {
        let image = Node::leaf(
            NodeType::Image,
            Attrs::new().with("src", "a.png").with("alt", "A & B"),
        );
        assert_eq!(
            to_html(&schema(), &Node::doc(vec![image])),
            r#"<img src="a.png" alt="A &amp; B">"#
        );
    }
}

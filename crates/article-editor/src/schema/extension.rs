// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::languages::is_class_safe;
use super::{AttrSpec, DomSpec, MarkSpec, NodeSpec, ParseRule};
use crate::html::dom::Element;
use crate::model::{AttrValue, Attrs, Mark, MarkType, Node, NodeType};

/// A bundle of node and mark types registered together.
pub trait Extension {
    fn name(&self) -> &'static str;

    fn nodes(&self) -> Vec<NodeSpec> {
        Vec::new()
    }

    fn marks(&self) -> Vec<MarkSpec> {
        Vec::new()
    }
}

/// The basic article blocks and formatting marks.
pub struct StarterKit;

/// Code blocks carrying a `language` attribute.
pub struct CodeBlockExtension;

/// Block images with `src`, `alt` and `title`.
pub struct ImageExtension;

/// Hyperlink marks.
pub struct LinkExtension;

impl Extension for StarterKit {
    fn name(&self) -> &'static str {
        "starterKit"
    }

    fn nodes(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(NodeType::Doc, "block+"),
            NodeSpec::new(NodeType::Paragraph, "inline*")
                .group("block")
                .parse_rule(ParseRule::tag("p"))
                .render(|_| DomSpec::tag("p")),
            NodeSpec::new(NodeType::Text, "").group("inline"),
            NodeSpec::new(NodeType::Heading, "inline*")
                .group("block")
                .attr(AttrSpec::optional("level", 1).validated(|v| {
                    v.as_int().is_some_and(|l| (1..=6).contains(&l))
                }))
                .parse_rule(ParseRule::with_attrs("h1", |_| Some(level(1))))
                .parse_rule(ParseRule::with_attrs("h2", |_| Some(level(2))))
                .parse_rule(ParseRule::with_attrs("h3", |_| Some(level(3))))
                .parse_rule(ParseRule::with_attrs("h4", |_| Some(level(4))))
                .parse_rule(ParseRule::with_attrs("h5", |_| Some(level(5))))
                .parse_rule(ParseRule::with_attrs("h6", |_| Some(level(6))))
                .render(|node| DomSpec::tag(heading_tag(node))),
            NodeSpec::new(NodeType::Blockquote, "block+")
                .group("block")
                .parse_rule(ParseRule::tag("blockquote"))
                .render(|_| DomSpec::tag("blockquote")),
            NodeSpec::new(NodeType::BulletList, "listItem+")
                .group("block")
                .parse_rule(ParseRule::tag("ul"))
                .render(|_| DomSpec::tag("ul")),
            NodeSpec::new(NodeType::OrderedList, "listItem+")
                .group("block")
                .attr(
                    AttrSpec::optional("start", 1)
                        .validated(|v| v.as_int().is_some_and(|s| s >= 0)),
                )
                .parse_rule(ParseRule::with_attrs("ol", |el| {
                    let start = el
                        .get_attr("start")
                        .and_then(|s| s.trim().parse::<i64>().ok())
                        .filter(|s| *s >= 0)
                        .unwrap_or(1);
                    Some(Attrs::new().with("start", start))
                }))
                .render(|node| {
                    let spec = DomSpec::tag("ol");
                    match node.attrs().get_int("start") {
                        Some(start) if start != 1 => spec.attr("start", start.to_string()),
                        _ => spec,
                    }
                }),
            NodeSpec::new(NodeType::ListItem, "block+")
                .parse_rule(ParseRule::tag("li"))
                .render(|_| DomSpec::tag("li")),
            NodeSpec::new(NodeType::HorizontalRule, "")
                .group("block")
                .parse_rule(ParseRule::tag("hr"))
                .render(|_| DomSpec::tag("hr")),
            NodeSpec::new(NodeType::HardBreak, "")
                .group("inline")
                .parse_rule(ParseRule::tag("br"))
                .render(|_| DomSpec::tag("br")),
        ]
    }

    fn marks(&self) -> Vec<MarkSpec> {
        vec![
            simple_mark(MarkType::Bold, &["strong", "b"], "strong"),
            simple_mark(MarkType::Italic, &["em", "i"], "em"),
            simple_mark(MarkType::Strike, &["s", "del", "strike"], "s"),
            simple_mark(MarkType::Underline, &["u"], "u"),
            simple_mark(MarkType::Code, &["code"], "code"),
        ]
    }
}

impl Extension for CodeBlockExtension {
    fn name(&self) -> &'static str {
        "codeBlock"
    }

    fn nodes(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::new(NodeType::CodeBlock, "text*")
            .group("block")
            .attr(AttrSpec::optional("language", AttrValue::Null).validated(|v| {
                v.is_null() || v.as_str().is_some_and(is_class_safe)
            }))
            .parse_rule(ParseRule::with_attrs("pre", |el| {
                let language = language_of(el);
                Some(Attrs::new().with("language", language))
            }))
            .render(|node| {
                let code = match node.attrs().get_str("language") {
                    Some(language) => DomSpec::tag("code")
                        .attr("class", format!("language-{language}")),
                    None => DomSpec::tag("code"),
                };
                DomSpec::tag("pre").wrapping(code)
            })]
    }
}

impl Extension for ImageExtension {
    fn name(&self) -> &'static str {
        "image"
    }

    fn nodes(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::new(NodeType::Image, "")
            .group("block")
            .attr(
                AttrSpec::required("src")
                    .validated(|v| v.as_str().is_some_and(|s| !s.trim().is_empty())),
            )
            .attr(AttrSpec::optional("alt", "").validated(|v| v.as_str().is_some()))
            .attr(AttrSpec::optional("title", AttrValue::Null))
            .parse_rule(ParseRule::with_attrs("img", |el| {
                let src = el.get_attr("src").filter(|s| !s.trim().is_empty())?;
                Some(
                    Attrs::new()
                        .with("src", src)
                        .with("alt", el.get_attr("alt").unwrap_or(""))
                        .with("title", el.get_attr("title")),
                )
            }))
            .render(|node| {
                let attrs = node.attrs();
                let mut spec = DomSpec::tag("img")
                    .attr("src", attrs.get_str("src").unwrap_or(""))
                    .attr("alt", attrs.get_str("alt").unwrap_or(""));
                if let Some(title) = attrs.get_str("title") {
                    spec = spec.attr("title", title);
                }
                spec
            })]
    }
}

impl Extension for LinkExtension {
    fn name(&self) -> &'static str {
        "link"
    }

    fn marks(&self) -> Vec<MarkSpec> {
        vec![MarkSpec {
            mark_type: MarkType::Link,
            attrs: vec![
                AttrSpec::required("href").validated(|v| v.as_str().is_some()),
                AttrSpec::optional("protocol", AttrValue::Null),
            ],
            parse: vec![ParseRule::with_attrs("a", |el| {
                let href = el.get_attr("href")?;
                Some(Attrs::new().with("href", href))
            })],
            render: |mark: &Mark| {
                DomSpec::tag("a")
                    .attr("href", mark.attrs.get_str("href").unwrap_or(""))
                    .attr("rel", "noopener noreferrer nofollow")
                    .attr("target", "_blank")
            },
        }]
    }
}

fn level(level: i64) -> Attrs {
    Attrs::new().with("level", level)
}

fn heading_tag(node: &Node) -> &'static str {
    match node.attrs().get_int("level") {
        Some(2) => "h2",
        Some(3) => "h3",
        Some(4) => "h4",
        Some(5) => "h5",
        Some(6) => "h6",
        _ => "h1",
    }
}

fn simple_mark(
    mark_type: MarkType,
    tags: &[&'static str],
    render_tag: &'static str,
) -> MarkSpec {
    let render: fn(&Mark) -> DomSpec = match render_tag {
        "strong" => |_| DomSpec::tag("strong"),
        "em" => |_| DomSpec::tag("em"),
        "s" => |_| DomSpec::tag("s"),
        "u" => |_| DomSpec::tag("u"),
        _ => |_| DomSpec::tag("code"),
    };
    MarkSpec {
        mark_type,
        attrs: Vec::new(),
        parse: tags.iter().map(|&t| ParseRule::tag(t)).collect(),
        render,
    }
}

/// Language of a `<pre>` element: `data-language` on the element itself or
/// a `language-*` class on it or its `<code>` child.
fn language_of(pre: &Element) -> Option<String> {
    if let Some(lang) = pre.get_attr("data-language") {
        return Some(lang.to_owned()).filter(|l| is_class_safe(l));
    }
    pre.class_with_prefix("language-")
        .or_else(|| {
            pre.child_elements()
                .find(|c| c.name == "code")
                .and_then(|code| code.class_with_prefix("language-"))
        })
        .map(str::to_owned)
        .filter(|l| is_class_safe(l))
}

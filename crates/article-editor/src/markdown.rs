// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Markdown paste: a `pulldown-cmark` event stream driving the same
//! [`DocBuilder`] the HTML parser uses.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

use crate::html::DocBuilder;
use crate::link_policy::{LinkAdmission, LinkPolicy};
use crate::model::{Attrs, Mark, MarkType, Node, NodeType};
use crate::schema::languages::is_class_safe;
use crate::schema::Schema;

enum Frame {
    Node(Option<usize>),
    Mark(usize),
    Code {
        depth: Option<usize>,
        text: String,
    },
    Image {
        src: String,
        title: String,
        alt: String,
    },
    Transparent,
}

pub fn parse_markdown(schema: &Schema, links: &LinkPolicy, markdown: &str) -> Node {
    let mut builder = DocBuilder::new(schema);
    let mut frames: Vec<Frame> = Vec::new();

    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(tag) => {
                let frame = start(&mut builder, links, tag);
                frames.push(frame);
            }
            Event::End(_) => match frames.pop() {
                Some(Frame::Node(Some(depth))) => builder.close_to(depth),
                Some(Frame::Mark(depth)) => builder.pop_marks_to(depth),
                Some(Frame::Code { depth, text }) => {
                    builder.text(text.strip_suffix('\n').unwrap_or(&text));
                    if let Some(depth) = depth {
                        builder.close_to(depth);
                    }
                }
                Some(Frame::Image { src, title, alt }) => {
                    let title = Some(title).filter(|t| !t.is_empty());
                    builder.leaf(
                        NodeType::Image,
                        Attrs::new()
                            .with("src", src)
                            .with("alt", alt)
                            .with("title", title),
                    );
                }
                _ => {}
            },
            Event::Text(text) => match frames.last_mut() {
                Some(Frame::Code { text: buffer, .. }) => buffer.push_str(&text),
                Some(Frame::Image { alt, .. }) => alt.push_str(&text),
                _ => builder.text(&text),
            },
            Event::Code(code) => {
                if let Some(Frame::Image { alt, .. }) = frames.last_mut() {
                    alt.push_str(&code);
                } else {
                    let depth = builder.push_mark(Mark::new(MarkType::Code));
                    builder.text(&code);
                    builder.pop_marks_to(depth);
                }
            }
            Event::SoftBreak => match frames.last_mut() {
                Some(Frame::Image { alt, .. }) => alt.push(' '),
                _ => builder.text(" "),
            },
            Event::HardBreak => builder.leaf(NodeType::HardBreak, Attrs::new()),
            Event::Rule => builder.leaf(NodeType::HorizontalRule, Attrs::new()),
            _ => {}
        }
    }
    builder.finish()
}

fn start(builder: &mut DocBuilder<'_>, links: &LinkPolicy, tag: Tag<'_>) -> Frame {
    match tag {
        Tag::Paragraph => Frame::Node(builder.open(NodeType::Paragraph, Attrs::new())),
        Tag::Heading { level, .. } => Frame::Node(builder.open(
            NodeType::Heading,
            Attrs::new().with("level", level as i64),
        )),
        Tag::BlockQuote(_) => Frame::Node(builder.open(NodeType::Blockquote, Attrs::new())),
        Tag::CodeBlock(kind) => {
            let language = match kind {
                CodeBlockKind::Fenced(info) => info
                    .split_whitespace()
                    .next()
                    .filter(|l| is_class_safe(l))
                    .map(str::to_owned),
                CodeBlockKind::Indented => None,
            };
            Frame::Code {
                depth: builder.open(NodeType::CodeBlock, Attrs::new().with("language", language)),
                text: String::new(),
            }
        }
        Tag::List(Some(start)) => Frame::Node(builder.open(
            NodeType::OrderedList,
            Attrs::new().with("start", i64::try_from(start).unwrap_or(1)),
        )),
        Tag::List(None) => Frame::Node(builder.open(NodeType::BulletList, Attrs::new())),
        Tag::Item => Frame::Node(builder.open(NodeType::ListItem, Attrs::new())),
        Tag::Emphasis => Frame::Mark(builder.push_mark(Mark::new(MarkType::Italic))),
        Tag::Strong => Frame::Mark(builder.push_mark(Mark::new(MarkType::Bold))),
        Tag::Strikethrough => Frame::Mark(builder.push_mark(Mark::new(MarkType::Strike))),
        Tag::Link { dest_url, .. } => match links.admit(&dest_url) {
            LinkAdmission::Accepted { href, protocol } => {
                Frame::Mark(builder.push_mark(Mark::link(&href, &protocol)))
            }
            LinkAdmission::Rejected(reason) => {
                tracing::warn!(%reason, "dropping link from pasted markdown");
                Frame::Transparent
            }
        },
        Tag::Image {
            dest_url, title, ..
        } => Frame::Image {
            src: dest_url.to_string(),
            title: title.to_string(),
            alt: String::new(),
        },
        _ => Frame::Transparent,
    }
}

// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::{ImageFormat, RgbImage};
use indoc::indoc;
use speculoos::prelude::*;

use article_editor::collab::{ClientId, CollabAdapter, LocalHub, Participant};
use article_editor::link_policy::LinkAdmission;
use article_editor::media::{DroppedFile, MediaError, MediaPipeline};
use article_editor::preview::PLACEHOLDER_TEXT;
use article_editor::{
    parse_html, to_html, AltTextEvent, AltTextState, AutolinkPolicy, Command, Dismissal, Editor,
    EditorConfig, EditorContent, LinkPolicy, MarkType, MediaConfig, Node, NodeType, Preview,
    Schema,
};

fn schema() -> Arc<Schema> {
    Arc::new(Schema::article().unwrap())
}

fn editor_with(config: EditorConfig, doc: Node) -> Editor {
    Editor::new(schema(), Arc::new(config), EditorContent::Doc(doc))
}

fn editor(doc: Node) -> Editor {
    editor_with(EditorConfig::default(), doc)
}

fn png(width: u32, height: u32) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    Bytes::from(out.into_inner())
}

#[test]
fn undo_restores_the_previous_document() {
    let mut editor = editor(Node::doc(vec![
        Node::paragraph_with_text("first"),
        Node::paragraph_with_text("second"),
    ]));
    let before = editor.doc().clone();

    editor
        .chain()
        .set_text_selection(2, 10)
        .toggle_mark(MarkType::Bold)
        .run()
        .unwrap();
    editor.chain().toggle_bullet_list().run().unwrap();
    editor.chain().insert_text("!").run().unwrap();
    assert_that!(editor.doc()).is_not_equal_to(&before);

    for _ in 0..3 {
        assert_that!(editor.undo().unwrap()).is_true();
    }
    assert_that!(editor.undo().unwrap()).is_false();
    assert_that!(editor.doc()).is_equal_to(&before);

    editor.redo().unwrap();
    editor.redo().unwrap();
    assert_that!(editor.doc().child(0).unwrap().node_type()).is_equal_to(NodeType::BulletList);
}

#[test]
fn rendered_html_parses_back_to_the_same_document() {
    let schema = schema();
    let links = LinkPolicy::default();
    let doc = parse_html(
        &schema,
        &links,
        indoc! {r#"
            <h2>Title</h2>
            <p>Plain <strong>bold</strong> <em>italic</em> <s>gone</s> <u>under</u>
            <code>x = 1</code> <a href="https://example.org/a">link</a><br>next</p>
            <blockquote><p>Quoted</p></blockquote>
            <ul><li><p>one</p></li><li><p>two</p></li></ul>
            <ol start="3"><li><p>three</p></li></ol>
            <pre><code class="language-rust">let x = 1;</code></pre>
            <hr>
            <img src="https://img.example/harbour.png" alt="A harbour" title="Harbour">
        "#},
    );
    let types: Vec<NodeType> = doc.content().iter().map(Node::node_type).collect();
    assert_that!(types).is_equal_to(vec![
        NodeType::Heading,
        NodeType::Paragraph,
        NodeType::Blockquote,
        NodeType::BulletList,
        NodeType::OrderedList,
        NodeType::CodeBlock,
        NodeType::HorizontalRule,
        NodeType::Image,
    ]);

    let reparsed = parse_html(&schema, &links, &to_html(&schema, &doc));
    assert_that!(reparsed).is_equal_to(&doc);
    assert_that!(reparsed.child(5).unwrap().attrs().get_str("language")).is_equal_to(Some("rust"));
    assert_that!(reparsed.child(7).unwrap().attrs().get_str("alt")).is_equal_to(Some("A harbour"));
    assert_that!(reparsed.child(4).unwrap().attrs().get_int("start")).is_equal_to(Some(3));
}

#[tokio::test]
async fn a_bad_file_in_a_batch_only_skips_its_own_slot() {
    let config = EditorConfig {
        media: MediaConfig {
            max_file_bytes: 1024,
            ..MediaConfig::default()
        },
        ..EditorConfig::default()
    };
    let rule = || Node::leaf(NodeType::HorizontalRule, Default::default());
    let mut editor = editor_with(
        config.clone(),
        Node::doc(vec![rule(), rule(), rule(), rule(), Node::paragraph(vec![])]),
    );
    let pipeline = MediaPipeline::new(config.media);
    let files = vec![
        DroppedFile::new("one.png", "image/png", png(4, 4)),
        DroppedFile::new("two.png", "image/png", vec![0u8; 4096]),
        DroppedFile::new("three.png", "image/png", png(4, 4)),
    ];

    let results = pipeline.ingest(&mut editor, &files, 1).await;
    assert_that!(results[0]).is_equal_to(Ok(1));
    assert!(matches!(results[1], Err(MediaError::TooLarge { .. })));
    assert_that!(results[2]).is_equal_to(Ok(3));

    let images: Vec<usize> = editor
        .doc()
        .content()
        .iter()
        .enumerate()
        .filter(|(_, n)| n.node_type() == NodeType::Image)
        .map(|(i, _)| i)
        .collect();
    assert_that!(images).is_equal_to(vec![1, 3]);
    assert_that!(pipeline.object_urls().live_count()).is_equal_to(0);
}

#[tokio::test]
async fn nothing_is_inserted_after_the_editor_is_destroyed() {
    let config = EditorConfig::default();
    let mut editor = editor_with(config.clone(), Node::doc(vec![Node::paragraph(vec![])]));
    let pipeline = MediaPipeline::new(config.media);
    let files = [DroppedFile::new("late.png", "image/png", png(2, 2))];

    let batch = pipeline.prepare_batch(&files, 0).await;
    editor.destroy();
    let results = pipeline.commit(&mut editor, batch);
    assert!(matches!(results[0], Err(MediaError::Cancelled { .. })));
    assert_that!(editor.is_empty()).is_true();
}

#[test]
fn javascript_urls_are_refused_on_every_path() {
    let candidate = "javascript:alert(1)";
    assert!(matches!(
        LinkPolicy::default().admit(candidate),
        LinkAdmission::Rejected(_)
    ));
    assert!(matches!(
        AutolinkPolicy::default().admit(candidate),
        LinkAdmission::Rejected(_)
    ));

    let mut editor = editor(Node::doc(vec![Node::paragraph_with_text("click")]));
    let result = editor
        .chain()
        .set_text_selection(1, 6)
        .set_link(candidate)
        .run();
    assert_that!(result).is_err();

    editor.chain().set_text_selection(6, 6).insert_text(" javascript:alert(1) ").run().unwrap();
    assert_that!(editor.to_html()).does_not_contain("href");
}

#[test]
fn malformed_documents_preview_as_a_placeholder() {
    let preview = Preview::from_json(schema(), r#"{"type":"doc","content":[{"ty"#);
    assert_that!(preview.is_degraded()).is_true();
    assert_that!(preview.to_html()).is_equal_to(format!("<p>{PLACEHOLDER_TEXT}</p>"));
}

#[test]
fn alt_text_is_only_written_on_save() {
    let image = Node::leaf(
        NodeType::Image,
        article_editor::Attrs::new()
            .with("src", "https://img.example/a.png")
            .with("alt", "original"),
    );
    let mut editor = editor(Node::doc(vec![image, Node::paragraph(vec![])]));
    let id = editor.doc().child(0).unwrap().id();
    let alt = |editor: &Editor| {
        editor
            .doc()
            .child(0)
            .unwrap()
            .attrs()
            .get_str("alt")
            .unwrap()
            .to_owned()
    };

    editor.alt_text_event(id, AltTextEvent::Open).unwrap();
    editor
        .alt_text_event(id, AltTextEvent::Edit("changed".into()))
        .unwrap();
    let state = editor
        .alt_text_event(id, AltTextEvent::Dismiss(Dismissal::ClickOutside))
        .unwrap();
    assert!(matches!(state, AltTextState::DiscardConfirm { .. }));
    editor.alt_text_event(id, AltTextEvent::ConfirmDiscard).unwrap();
    assert_that!(alt(&editor)).is_equal_to("original".to_owned());
    assert_that!(editor.can_undo()).is_false();

    editor.alt_text_event(id, AltTextEvent::Open).unwrap();
    editor
        .alt_text_event(id, AltTextEvent::Edit("A harbour at dusk".into()))
        .unwrap();
    let state = editor.alt_text_event(id, AltTextEvent::Save).unwrap();
    assert_that!(state).is_equal_to(AltTextState::Closed);
    assert_that!(alt(&editor)).is_equal_to("A harbour at dusk".to_owned());

    assert_that!(editor.undo().unwrap()).is_true();
    assert_that!(editor.can_undo()).is_false();
    assert_that!(alt(&editor)).is_equal_to("original".to_owned());
}

#[tokio::test]
async fn concurrent_inserts_converge_and_undo_stays_local() {
    let initial = || Node::doc(vec![Node::paragraph_with_text("ab")]);
    let hub = LocalHub::new();
    hub.open_room("room", initial());
    let auth = Arc::new(hub.auth());
    let participant = |id: u64| Participant {
        client_id: ClientId(id),
        name: format!("writer {id}"),
        colour: "#aa3300".into(),
    };

    let (mut a, mut b) = (editor(initial()), editor(initial()));
    let mut sync_a = CollabAdapter::new(
        &mut a,
        "room",
        participant(1),
        Arc::new(hub.clone()),
        auth.clone(),
    );
    let mut sync_b = CollabAdapter::new(
        &mut b,
        "room",
        participant(2),
        Arc::new(hub.clone()),
        auth,
    );
    sync_a.connect(&mut a).await;
    sync_b.connect(&mut b).await;

    a.run(&[
        Command::SetTextSelection { anchor: 1, head: 1 },
        Command::InsertText { text: "X".into() },
    ])
    .unwrap();
    b.run(&[
        Command::SetTextSelection { anchor: 1, head: 1 },
        Command::InsertText { text: "Y".into() },
    ])
    .unwrap();

    sync_a.pump(&mut a).await;
    sync_b.pump(&mut b).await;
    sync_a.pump(&mut a).await;
    assert_that!(a.doc()).is_equal_to(b.doc());
    assert_that!(a.text()).contains("X");
    assert_that!(a.text()).contains("Y");

    assert_that!(a.undo().unwrap()).is_true();
    assert_that!(a.text()).does_not_contain("X");
    assert_that!(a.text()).contains("Y");

    sync_a.pump(&mut a).await;
    sync_b.pump(&mut b).await;
    assert_that!(b.doc()).is_equal_to(a.doc());
    assert_that!(hub.doc("room").unwrap()).is_equal_to(a.doc().clone());
}

#[tokio::test]
async fn a_deletion_rebased_over_a_split_undoes_without_duplicating() {
    let initial = || Node::doc(vec![Node::paragraph_with_text("hello world")]);
    let hub = LocalHub::new();
    hub.open_room("room", initial());
    let auth = Arc::new(hub.auth());
    let participant = |id: u64| Participant {
        client_id: ClientId(id),
        name: format!("writer {id}"),
        colour: "#0055aa".into(),
    };

    let (mut a, mut b) = (editor(initial()), editor(initial()));
    let mut sync_a = CollabAdapter::new(
        &mut a,
        "room",
        participant(1),
        Arc::new(hub.clone()),
        auth.clone(),
    );
    let mut sync_b = CollabAdapter::new(
        &mut b,
        "room",
        participant(2),
        Arc::new(hub.clone()),
        auth,
    );
    sync_a.connect(&mut a).await;
    sync_b.connect(&mut b).await;

    a.run(&[
        Command::SetTextSelection { anchor: 4, head: 4 },
        Command::SplitBlock,
    ])
    .unwrap();
    b.run(&[
        Command::SetTextSelection { anchor: 6, head: 6 },
        Command::InsertText { text: "BB".into() },
    ])
    .unwrap();
    b.run(&[
        Command::SetTextSelection { anchor: 2, head: 9 },
        Command::DeleteSelection,
    ])
    .unwrap();
    assert_that!(b.text()).is_equal_to("hworld".to_owned());

    sync_a.pump(&mut a).await;
    sync_b.pump(&mut b).await;
    sync_a.pump(&mut a).await;
    assert_that!(a.doc()).is_equal_to(b.doc());
    assert_that!(b.text()).is_equal_to("hworld".to_owned());

    while b.undo().unwrap() {}
    assert_that!(b.text()).does_not_contain("BB");
    assert_that!(b.text()).is_equal_to("hworld".to_owned());

    sync_b.pump(&mut b).await;
    sync_a.pump(&mut a).await;
    assert_that!(a.doc()).is_equal_to(b.doc());
    assert_that!(hub.doc("room").unwrap()).is_equal_to(b.doc().clone());
}

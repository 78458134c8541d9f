// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::sync::Arc;

use article_editor::{Command, Editor, EditorConfig, EditorContent, Notice, Preview, Schema};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Parse a JSON array of commands. Commands that address nodes by identity
/// are Rust-only and are refused by name.
fn parse_commands(json: &str) -> Result<Vec<Command>, String> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json).map_err(|e| e.to_string())?;
    if let Some(name) = values
        .iter()
        .filter_map(|v| v.get("command").and_then(|c| c.as_str()))
        .find(|name| RUST_ONLY_COMMANDS.contains(name))
    {
        return Err(format!(
            "`{name}` addresses nodes by identity and is not available from JavaScript"
        ));
    }
    values
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()
        .map_err(|e| e.to_string())
}

const RUST_ONLY_COMMANDS: &[&str] = &["updateAttributes"];

fn article_schema() -> Result<Arc<Schema>, JsValue> {
    Schema::article().map(Arc::new).map_err(js_error)
}

/// Render a stored document as read-only HTML. Malformed input renders a
/// placeholder rather than failing.
#[wasm_bindgen(js_name = renderPreview)]
pub fn render_preview(json: &str) -> Result<String, JsValue> {
    Ok(Preview::from_json(article_schema()?, json).to_html())
}

#[wasm_bindgen]
pub struct EditorHandle {
    inner: Editor,
}

#[wasm_bindgen]
impl EditorHandle {
    /// `config` is the JSON editor configuration (`{}` for defaults);
    /// `content` is the stored document, or empty for a new one.
    #[wasm_bindgen(constructor)]
    pub fn new(config: &str, content: &str) -> Result<EditorHandle, JsValue> {
        let config = EditorConfig::from_json(config).map_err(js_error)?;
        let content = if content.trim().is_empty() {
            EditorContent::Empty
        } else {
            EditorContent::Json(content.to_owned())
        };
        Ok(EditorHandle {
            inner: Editor::new(article_schema()?, Arc::new(config), content),
        })
    }

    /// Run a JSON array of commands as one change.
    #[wasm_bindgen(js_name = runCommands)]
    pub fn run_commands(&mut self, commands: &str) -> Result<(), JsValue> {
        let commands = parse_commands(commands).map_err(js_error)?;
        self.inner.run(&commands).map_err(js_error)
    }

    #[wasm_bindgen(js_name = canRun)]
    pub fn can_run(&self, commands: &str) -> bool {
        parse_commands(commands)
            .map(|commands| self.inner.can(&commands))
            .unwrap_or(false)
    }

    pub fn undo(&mut self) -> Result<bool, JsValue> {
        self.inner.undo().map_err(js_error)
    }

    pub fn redo(&mut self) -> Result<bool, JsValue> {
        self.inner.redo().map_err(js_error)
    }

    #[wasm_bindgen(js_name = setEditable)]
    pub fn set_editable(&mut self, editable: bool) {
        self.inner.set_editable(editable);
    }

    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        self.inner.to_json().map_err(js_error)
    }

    #[wasm_bindgen(js_name = toHtml)]
    pub fn to_html(&self) -> String {
        self.inner.to_html()
    }

    #[wasm_bindgen(js_name = selectionJson)]
    pub fn selection_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.selection()).map_err(js_error)
    }

    /// Messages for the user collected since the last call, as a JSON
    /// array of strings.
    #[wasm_bindgen(js_name = takeNotices)]
    pub fn take_notices(&mut self) -> Result<String, JsValue> {
        let reasons: Vec<String> = self
            .inner
            .take_notices()
            .into_iter()
            .map(|notice| match notice {
                Notice::ContentRecovered { reason } | Notice::LocalOnly { reason } => reason,
            })
            .collect();
        serde_json::to_string(&reasons).map_err(js_error)
    }

    pub fn destroy(&mut self) {
        self.inner.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_arrive_as_json() {
        let mut handle = EditorHandle::new("{}", "").unwrap();
        handle
            .run_commands(r#"[{"command":"insertText","text":"hi"},{"command":"toggleHeading","level":2}]"#)
            .unwrap();
        assert_eq!(handle.to_html(), "<h2>hi</h2>");
        assert!(handle.undo().unwrap());
        assert_eq!(handle.to_html(), "<p></p>");
    }

    #[test]
    fn rust_only_commands_are_refused_by_name() {
        let err = parse_commands(r#"[{"command":"updateAttributes","attrs":{"alt":"x"}}]"#)
            .unwrap_err();
        assert!(err.contains("`updateAttributes`"));
        assert!(err.contains("not available from JavaScript"));

        let handle = EditorHandle::new("{}", "").unwrap();
        assert!(!handle.can_run(r#"[{"command":"updateAttributes","attrs":{}}]"#));
        assert!(handle.can_run(r#"[{"command":"insertText","text":"ok"}]"#));
    }

    #[test]
    fn broken_documents_preview_as_a_placeholder() {
        let html = render_preview("not json").unwrap();
        assert!(html.starts_with("<p>"));
    }
}

// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Ingestion of dropped or picked image files.
//!
//! Every file in a batch is checked and read on its own, concurrently, and
//! a bad file only affects itself. File `i` of a batch dropped at `pos`
//! targets `pos + i`, whatever order the reads finish in. Targets are
//! fitted against the document as it is when the insert is committed.

pub mod object_url;

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use futures::future::join_all;
use mime_sniffer::MimeTypeSniffer;
use thiserror::Error;
use tracing::{debug, warn};

pub use object_url::{ObjectUrl, ObjectUrlRegistry};

use crate::commands::Command;
use crate::config::MediaConfig;
use crate::editor::Editor;
use crate::model::{Attrs, Node, NodeType, ResolvedPos};
use crate::schema::Schema;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("{name}: files of type `{mime}` are not allowed")]
    UnsupportedType { name: String, mime: String },
    #[error("{name}: content is `{sniffed}` but was declared as `{declared}`")]
    MismatchedType {
        name: String,
        declared: String,
        sniffed: String,
    },
    #[error("{name}: {size} bytes is over the limit of {max}")]
    TooLarge { name: String, size: u64, max: u64 },
    #[error("{name}: could not read the image ({reason})")]
    Undecodable { name: String, reason: String },
    #[error("{name}: {width}x{height} is larger than {max}px")]
    DimensionsTooLarge {
        name: String,
        width: u32,
        height: u32,
        max: u32,
    },
    #[error("{name}: the editor was closed before the image was added")]
    Cancelled { name: String },
    #[error("{name}: could not add the image ({reason})")]
    InsertFailed { name: String, reason: String },
}

#[derive(Clone, Debug)]
pub struct DroppedFile {
    pub name: String,
    /// The type the browser declared.
    pub mime: String,
    pub bytes: Bytes,
}

impl DroppedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// A file that has been read, waiting to be committed.
#[derive(Debug)]
pub struct PreparedImage {
    pub name: String,
    /// Intended position: the drop position plus the file's index.
    pub target: usize,
    pub image: Result<Node, MediaError>,
}

/// One ingestion policy, owned by one editor instance.
#[derive(Clone, Debug)]
pub struct MediaPipeline {
    config: MediaConfig,
    urls: Arc<ObjectUrlRegistry>,
}

impl MediaPipeline {
    pub fn new(config: MediaConfig) -> Self {
        Self {
            config,
            urls: ObjectUrlRegistry::new(),
        }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    pub fn object_urls(&self) -> &Arc<ObjectUrlRegistry> {
        &self.urls
    }

    /// Type and size checks that need no decoding.
    pub fn validate(&self, file: &DroppedFile) -> Result<(), MediaError> {
        let declared = normalize_mime(&file.mime);
        if !self.config.allows(&declared) {
            return Err(MediaError::UnsupportedType {
                name: file.name.clone(),
                mime: file.mime.clone(),
            });
        }
        let size = file.bytes.len() as u64;
        if size >= self.config.max_file_bytes {
            return Err(MediaError::TooLarge {
                name: file.name.clone(),
                size,
                max: self.config.max_file_bytes,
            });
        }
        if let Some(sniffed) = file.bytes.sniff_mime_type() {
            let sniffed = normalize_mime(sniffed);
            if sniffed != "application/octet-stream" && sniffed != declared {
                return Err(MediaError::MismatchedType {
                    name: file.name.clone(),
                    declared,
                    sniffed,
                });
            }
        }
        Ok(())
    }

    /// Read the image header off the async thread to learn its size. A
    /// temporary object URL is held for the duration and released on
    /// every path out.
    pub async fn decode(&self, file: &DroppedFile) -> Result<ImageInfo, MediaError> {
        let url = self.urls.create(&file.mime);
        debug!(file = file.name, url = url.as_str(), "Reading dropped image");
        let bytes = file.bytes.clone();
        let undecodable = |reason: String| MediaError::Undecodable {
            name: file.name.clone(),
            reason,
        };
        let (width, height) = tokio::task::spawn_blocking(move || read_dimensions(&bytes))
            .await
            .map_err(|e| undecodable(e.to_string()))?
            .map_err(undecodable)?;
        let max = self.config.max_dimension;
        if width > max || height > max {
            return Err(MediaError::DimensionsTooLarge {
                name: file.name.clone(),
                width,
                height,
                max,
            });
        }
        drop(url);
        Ok(ImageInfo { width, height })
    }

    /// Check and read one file into the image node to insert.
    pub async fn prepare(&self, file: &DroppedFile) -> Result<Node, MediaError> {
        self.validate(file)?;
        self.decode(file).await?;
        Ok(image_node(file))
    }

    /// Read a whole batch concurrently. Results come back in file order.
    pub async fn prepare_batch(&self, files: &[DroppedFile], drop_pos: usize) -> Vec<PreparedImage> {
        let reads = files.iter().map(|file| self.prepare(file));
        join_all(reads)
            .await
            .into_iter()
            .zip(files)
            .enumerate()
            .map(|(index, (image, file))| PreparedImage {
                name: file.name.clone(),
                target: drop_pos + index,
                image,
            })
            .collect()
    }

    /// Insert prepared images in batch order. Each one is placed at its own
    /// target, fitted to the current document. Returns the fitted target
    /// for each image, or why it was not inserted.
    pub fn commit(
        &self,
        editor: &mut Editor,
        batch: Vec<PreparedImage>,
    ) -> Vec<Result<usize, MediaError>> {
        batch
            .into_iter()
            .map(|prepared| {
                let result = commit_one(editor, prepared);
                if let Err(e) = &result {
                    warn!(error = %e, "Dropped file was not inserted");
                }
                result
            })
            .collect()
    }

    /// Read and insert `files` dropped at `drop_pos`.
    pub async fn ingest(
        &self,
        editor: &mut Editor,
        files: &[DroppedFile],
        drop_pos: usize,
    ) -> Vec<Result<usize, MediaError>> {
        let batch = self.prepare_batch(files, drop_pos).await;
        self.commit(editor, batch)
    }
}

fn commit_one(editor: &mut Editor, prepared: PreparedImage) -> Result<usize, MediaError> {
    let image = prepared.image?;
    if editor.is_destroyed() {
        return Err(MediaError::Cancelled {
            name: prepared.name,
        });
    }
    let pos = fit_insert_position(editor.schema(), editor.doc(), prepared.target);
    editor
        .run(&[Command::InsertContentAt {
            pos,
            content: vec![image],
        }])
        .map_err(|e| MediaError::InsertFailed {
            name: prepared.name,
            reason: e.to_string(),
        })?;
    Ok(pos)
}

/// The position nearest to `pos` where an image block can go: inside a
/// textblock (which the insert splits) or in a container that takes
/// blocks. Out of range positions are clamped to the document end.
pub fn fit_insert_position(schema: &Schema, doc: &Node, pos: usize) -> usize {
    let pos = pos.min(doc.content_size());
    let Some(rp) = ResolvedPos::resolve(doc, pos) else {
        return doc.content_size();
    };
    let accepts = |node: &Node| {
        node.is_textblock() || schema.allows_child(node.node_type(), NodeType::Image)
    };
    let mut depth = rp.depth();
    while depth > 0 && !accepts(rp.node(depth)) {
        depth -= 1;
    }
    if depth == rp.depth() {
        return pos;
    }
    let (before, after) = (rp.before(depth + 1), rp.after(depth + 1));
    if pos - before < after - pos {
        before
    } else {
        after
    }
}

fn image_node(file: &DroppedFile) -> Node {
    let mime = normalize_mime(&file.mime);
    let src = format!("data:{mime};base64,{}", STANDARD.encode(&file.bytes));
    let title = Path::new(&file.name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    Node::leaf(
        NodeType::Image,
        Attrs::new()
            .with("src", src)
            .with("alt", "")
            .with("title", title),
    )
}

fn normalize_mime(mime: &str) -> String {
    let mime = mime.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_owned(),
        _ => mime,
    }
}

fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), String> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Cursor;

    use bytes::Bytes;
    use image::{ImageFormat, RgbImage};

    use super::DroppedFile;

    pub fn png(width: u32, height: u32) -> Bytes {
        let mut out = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        Bytes::from(out.into_inner())
    }

    pub fn png_file(name: &str, width: u32, height: u32) -> DroppedFile {
        DroppedFile::new(name, "image/png", png(width, height))
    }
}

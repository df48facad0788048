//! # Frame Library
//!
//! Raw frames are images extracted from video, organised in folders such as
//! `street/0001/f1.png`. A frame may carry a sibling `f1.json` describing it
//! (size, capture time, ...). Converting a frame creates its annotation
//! document in the dataset store:
//!
//! ```json
//! {
//!   "frame": { "...sibling record...", "path": "street/0001/f1.png" },
//!   "name": "f1",
//!   "keywords": ["street", "f1"],
//!   "annotations": []
//! }
//! ```
//!
//! Keywords are the folder names plus the stem, minus purely numeric
//! entries. Once converted, a frame disappears from [`FrameLibrary::list`].

use crate::dataset::DatasetStore;
use crate::errors::{WorkspaceError, WorkspaceResult};
use crate::paths::{resolve_within, split_relative, with_json_extension};
use annotate_editor::{Document, Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Extensions recognised as frame images, compared case-insensitively
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

/// Marker for difference images produced during extraction
const DIFF_MARKER: &str = "_diff";

/// Result of converting one frame
#[derive(Debug, Clone)]
pub struct Conversion {
    pub identifier: String,
    pub document: Document,
}

#[derive(Debug, Clone)]
pub struct FrameLibrary {
    root: PathBuf,
    datasets: DatasetStore,
}

impl FrameLibrary {
    pub fn new(root: impl Into<PathBuf>, datasets: DatasetStore) -> Self {
        Self {
            root: root.into(),
            datasets,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folders and unconverted frame images directly inside `folder`
    pub async fn list(&self, folder: &str) -> WorkspaceResult<Vec<String>> {
        let dir = resolve_within(&self.root, folder)?;
        let mut entries = fs::read_dir(&dir).await.map_err(|e| WorkspaceError::io(&dir, e))?;

        let mut items = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| WorkspaceError::io(&dir, e))? {
            let file_type = entry.file_type().await.map_err(|e| WorkspaceError::io(entry.path(), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();

            if file_type.is_dir() {
                items.push(name);
                continue;
            }
            if !is_frame_image(&name) {
                continue;
            }
            let relative = join_relative(folder, &name);
            if self.datasets.contains(&with_json_extension(&relative)) {
                tracing::debug!("Skipping converted frame {}", relative);
                continue;
            }
            items.push(name);
        }
        items.sort();
        Ok(items)
    }

    /// Build the document for a frame without writing it
    pub async fn prepare(&self, relative: &str) -> WorkspaceResult<Conversion> {
        let image = resolve_within(&self.root, relative)?;
        if !image.is_file() {
            return Err(WorkspaceError::NotFound(image));
        }
        if !has_image_extension(relative) {
            return Err(WorkspaceError::NotAnImage(relative.to_string()));
        }

        let record_path = resolve_within(&self.root, &with_json_extension(relative))?;
        let mut frame = read_frame_record(&record_path).await?;
        frame.insert("path".to_string(), Value::from(relative));

        let (folders, stem) = split_relative(relative);
        let keywords: Vec<Value> = frame_keywords(&folders, &stem).into_iter().map(Value::from).collect();

        let mut root = Map::new();
        root.insert("frame".to_string(), Value::Map(frame));
        root.insert("name".to_string(), Value::from(stem));
        root.insert("keywords".to_string(), Value::List(keywords));
        root.insert("annotations".to_string(), Value::list());

        Ok(Conversion {
            identifier: with_json_extension(relative),
            document: Document::from_value(Value::Map(root))?,
        })
    }

    /// Create and persist the annotation document for a frame
    pub async fn convert(&self, relative: &str) -> WorkspaceResult<Conversion> {
        let conversion = self.prepare(relative).await?;
        self.datasets.save(&conversion.identifier, &conversion.document).await?;
        tracing::info!("Converted {} to {}", relative, conversion.identifier);
        Ok(conversion)
    }
}

/// Folder names plus the stem, without purely numeric entries
pub fn frame_keywords(folders: &[String], stem: &str) -> Vec<String> {
    folders
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(stem))
        .filter(|k| !k.is_empty() && !k.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

async fn read_frame_record(path: &Path) -> WorkspaceResult<Map> {
    let source = match fs::read_to_string(path).await {
        Ok(source) => source,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(WorkspaceError::io(path, e)),
    };
    let value: serde_json::Value = serde_json::from_str(&source).map_err(|e| WorkspaceError::json(path, e))?;
    match Value::from(value) {
        Value::Map(map) => Ok(map),
        _ => Err(WorkspaceError::InvalidFrameRecord(path.to_path_buf())),
    }
}

fn has_image_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

fn is_frame_image(name: &str) -> bool {
    has_image_extension(name) && !name.contains(DIFF_MARKER)
}

fn join_relative(folder: &str, name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

//! # Dataset Store
//!
//! Annotation documents live under a datasets root as pretty-printed JSON,
//! one file per frame, in the same folder layout as the frames they were
//! converted from. The store is the persistence collaborator an
//! [`EditSession`](annotate_editor::EditSession) saves through.

use crate::errors::{WorkspaceError, WorkspaceResult};
use crate::paths::resolve_within;
use annotate_editor::{Document, DocumentStore, StoreError};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a document
    pub fn locate(&self, identifier: &str) -> WorkspaceResult<PathBuf> {
        resolve_within(&self.root, identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.locate(identifier).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Read one document back
    pub async fn load(&self, identifier: &str) -> WorkspaceResult<Document> {
        let path = self.locate(identifier)?;
        let source = fs::read_to_string(&path)
            .await
            .map_err(|e| WorkspaceError::io(&path, e))?;
        let value: serde_json::Value =
            serde_json::from_str(&source).map_err(|e| WorkspaceError::json(&path, e))?;
        let document = Document::from_value(value.into())?;

        tracing::debug!("Loaded {} ({} annotations)", identifier, document.annotation_count());
        Ok(document)
    }

    /// Folders and `.json` documents directly inside `folder`
    pub async fn list(&self, folder: &str) -> WorkspaceResult<Vec<String>> {
        let dir = self.locate(folder)?;
        let mut entries = fs::read_dir(&dir).await.map_err(|e| WorkspaceError::io(&dir, e))?;

        let mut items = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| WorkspaceError::io(&dir, e))? {
            let file_type = entry.file_type().await.map_err(|e| WorkspaceError::io(entry.path(), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if file_type.is_dir() || is_json(&name) {
                items.push(name);
            }
        }
        items.sort();
        Ok(items)
    }

    /// Write a document, creating parent folders as needed
    pub async fn save(&self, identifier: &str, document: &Document) -> WorkspaceResult<()> {
        let path = self.locate(identifier)?;
        let json = serde_json::to_string_pretty(document.root()).map_err(|e| WorkspaceError::json(&path, e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkspaceError::io(parent, e))?;
        }
        fs::write(&path, json).await.map_err(|e| WorkspaceError::io(&path, e))?;

        tracing::info!("Saved {}", path.display());
        Ok(())
    }
}

impl DocumentStore for DatasetStore {
    async fn store(&self, identifier: &str, document: &Document) -> Result<(), StoreError> {
        self.save(identifier, document).await.map_err(|e| match e {
            WorkspaceError::Io { source, .. } => StoreError::Io(source),
            WorkspaceError::Json { source, .. } => StoreError::Serialize(source),
            other => StoreError::Rejected(other.to_string()),
        })
    }
}

fn is_json(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotate_editor::Value;
    use tempfile::TempDir;

    fn sample() -> Document {
        Document::from_json(
            r#"{"name":"f1","keywords":["street"],"frame":{"path":"street/f1.png"},"annotations":[]}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_creates_folders_and_loads_back() {
        let dir = TempDir::new().unwrap();
        let store = DatasetStore::new(dir.path());

        store.save("street/0001/f1.json", &sample()).await.unwrap();

        assert!(dir.path().join("street/0001/f1.json").is_file());
        assert!(store.contains("street/0001/f1.json"));
        assert_eq!(store.load("street/0001/f1.json").await.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_written_json_is_indented_two_spaces() {
        let dir = TempDir::new().unwrap();
        let store = DatasetStore::new(dir.path());

        store.save("f1.json", &sample()).await.unwrap();
        let written = std::fs::read_to_string(dir.path().join("f1.json")).unwrap();

        assert!(written.starts_with("{\n  \""));
        assert!(written.contains("\n  \"name\": \"f1\""));
    }

    #[tokio::test]
    async fn test_list_keeps_folders_and_json() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("street")).unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.JSON"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join("f1.png"), "").unwrap();

        let store = DatasetStore::new(dir.path());
        assert_eq!(store.list("").await.unwrap(), vec!["a.JSON", "b.json", "street"]);
    }

    #[tokio::test]
    async fn test_missing_document_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = DatasetStore::new(dir.path());

        let err = store.load("nope.json").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound(_)));

        let err = store.list("missing").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_non_mapping_document_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("list.json"), "[1, 2]").unwrap();
        let store = DatasetStore::new(dir.path());

        let err = store.load("list.json").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Editor(_)));
    }

    #[tokio::test]
    async fn test_store_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let store = DatasetStore::new(dir.path().join("datasets"));

        let err = store.store("../escape.json", &sample()).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert!(!dir.path().join("escape.json").exists());
    }

    #[tokio::test]
    async fn test_pixel_values_stay_integral() {
        let dir = TempDir::new().unwrap();
        let store = DatasetStore::new(dir.path());
        let doc = Document::from_json(
            r#"{"annotations":[{"id":0,"bounding_box":{"x":10,"y":10,"width":50,"height":50}}]}"#,
        )
        .unwrap();

        store.store("f.json", &doc).await.unwrap();
        let loaded = store.load("f.json").await.unwrap();

        assert_eq!(
            loaded.get("$.annotations.0.bounding_box.width").unwrap(),
            Some(&Value::Int(50))
        );
    }
}

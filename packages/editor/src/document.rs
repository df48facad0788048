//! # Annotation Document
//!
//! A Document is the full annotation record for one frame. It is loaded
//! wholesale, then mutated in place through [`Mutation`]s.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Edit → Post-effects → Snapshot → Store
//!   ↓      ↓          ↓            ↓         ↓
//! JSON  Mutation  Selection    Arc<Doc>   DocumentStore
//! ```

use crate::model::{annotation_title, Annotation, Metadata};
use crate::mutations::{Mutation, MutationOutcome};
use crate::path::Path;
use crate::value::{Map, Value};
use crate::{EditorError, MutationError};

/// Editable annotation document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
}

impl Document {
    /// Wrap a document value; the root must be a mapping
    pub fn from_value(root: Value) -> Result<Self, EditorError> {
        match root {
            Value::Map(_) => Ok(Self { root }),
            other => Err(EditorError::InvalidDocument(format!(
                "expected a mapping at the root, found {}",
                other.kind()
            ))),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        let root: Value = serde_json::from_str(json)?;
        Self::from_value(root)
    }

    pub fn from_metadata(metadata: &Metadata) -> Result<Self, EditorError> {
        Self::from_value(Value::from_serialize(metadata)?)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Read any path
    pub fn get(&self, path: &str) -> Result<Option<&Value>, EditorError> {
        Ok(Path::parse(path)?.resolve(&self.root)?)
    }

    pub fn name(&self) -> Option<&str> {
        self.root.get("name").and_then(Value::as_str)
    }

    pub fn keywords(&self) -> Vec<&str> {
        self.root
            .get("keywords")
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Raw annotation entries
    pub fn annotations(&self) -> &[Value] {
        self.root
            .get("annotations")
            .and_then(Value::as_list)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn annotation_count(&self) -> usize {
        self.annotations().len()
    }

    /// Typed view of one annotation
    pub fn annotation(&self, index: usize) -> Result<Annotation, EditorError> {
        let value = self
            .annotations()
            .get(index)
            .ok_or(EditorError::AnnotationNotFound(index))?;
        Ok(value.to_typed()?)
    }

    /// Panel title of an annotation, tolerant of retyped fields
    pub fn annotation_title(&self, index: usize) -> Option<String> {
        let value = self.annotations().get(index)?;
        let id = value.get("id").and_then(Value::as_i64).unwrap_or_default();
        let parent = value.get("parent_id").and_then(Value::as_i64);
        let name = value.get("name").map(Value::to_string).unwrap_or_default();
        Some(annotation_title(id, parent, &name))
    }

    /// Index of the annotation with the given id
    pub fn index_of(&self, id: i64) -> Option<usize> {
        self.annotations()
            .iter()
            .position(|a| a.get("id").and_then(Value::as_i64) == Some(id))
    }

    /// `max(existing ids) + 1`, or `0` for a document without annotations
    pub fn next_annotation_id(&self) -> Result<i64, EditorError> {
        match self
            .annotations()
            .iter()
            .filter_map(|a| a.get("id").and_then(Value::as_i64))
            .max()
        {
            Some(max) => max.checked_add(1).ok_or(EditorError::IdsExhausted),
            None => Ok(0),
        }
    }

    /// Indices of annotations with `isSelected == true`
    pub fn selected_indices(&self) -> Vec<usize> {
        self.annotations()
            .iter()
            .enumerate()
            .filter(|(_, a)| a.get("isSelected") == Some(&Value::Bool(true)))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_indices().first().copied()
    }

    /// Typed view of the whole document
    pub fn metadata(&self) -> Result<Metadata, EditorError> {
        Ok(self.root.to_typed()?)
    }

    pub fn to_json_pretty(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    /// Apply one mutation, without post-effects
    pub fn apply(&mut self, mutation: &Mutation) -> Result<MutationOutcome, MutationError> {
        mutation.apply(&mut self.root)
    }

    pub(crate) fn root_mut(&mut self) -> &mut Value {
        &mut self.root
    }
}

impl Default for Document {
    fn default() -> Self {
        let mut root = Map::new();
        root.insert("name".into(), Value::from(""));
        root.insert("keywords".into(), Value::list());
        root.insert("frame".into(), Value::map());
        root.insert("annotations".into(), Value::list());
        Self {
            root: Value::Map(root),
        }
    }
}

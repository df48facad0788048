//! # Edit Session Management
//!
//! An EditSession owns one loaded document and everything needed to edit
//! it: the post-effect engine, the canvas zoom, an in-progress drag and the
//! save coalescer the document is persisted through.
//!
//! Every change, whether it comes from a property field, a panel button or
//! a pointer drag, goes through [`EditSession::apply`].

use crate::document::Document;
use crate::geometry::{screen_to_model, ClampPolicy, GrowthFactor, HandleAction, Point, ZoomState};
use crate::gesture::DragGesture;
use crate::model::{Annotation, BoundingBox};
use crate::mutations::{Edit, Mutation, MutationError};
use crate::path::Path;
use crate::persistence::{DocumentStore, FlushReport, RetryPolicy, SaveCoalescer, SaveStatus, Snapshot};
use crate::post_effects::PostEffectEngine;
use crate::value::Value;
use crate::EditorError;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Value given to a newly added property
pub const NEW_PROPERTY_VALUE: &str = "value";

/// Base name for newly added properties
pub const NEW_PROPERTY_NAME: &str = "name";

/// Single-user editing session over one document
#[derive(Debug)]
pub struct EditSession {
    /// Where the document is persisted, e.g. `street/f1.json`
    identifier: String,

    document: Document,

    /// Increments on every applied change
    version: u64,

    effects: PostEffectEngine,
    coalescer: Option<SaveCoalescer>,
    clamp: ClampPolicy,
    zoom: ZoomState,
    drag: Option<DragGesture>,
}

impl EditSession {
    /// Session whose edits are not persisted
    pub fn new(identifier: impl Into<String>, document: Document) -> Self {
        Self {
            identifier: identifier.into(),
            document,
            version: 0,
            effects: PostEffectEngine::new(),
            coalescer: None,
            clamp: ClampPolicy::default(),
            zoom: ZoomState::default(),
            drag: None,
        }
    }

    /// Session persisting every change through `store`.
    ///
    /// Spawns the save coalescer, so it must be called inside a tokio
    /// runtime.
    pub fn with_store<S, P>(identifier: impl Into<String>, document: Document, store: Arc<S>, policy: P) -> Self
    where
        S: DocumentStore,
        P: RetryPolicy,
    {
        let mut session = Self::new(identifier, document);
        session.coalescer = Some(SaveCoalescer::spawn_shared(store, policy));
        session
    }

    pub fn with_clamp(mut self, clamp: ClampPolicy) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Apply a mutation and its post-effects, then request a save.
    ///
    /// Returns the mutations that changed the document; empty for a no-op,
    /// which is not persisted.
    pub fn apply(&mut self, mutation: Mutation) -> Result<Vec<Mutation>, EditorError> {
        let applied = match self.effects.apply_with_effects(mutation.clone(), &mut self.document) {
            Ok(applied) => applied,
            Err(e) => {
                tracing::warn!("Rejected {}: {}", mutation, e);
                return Err(e.into());
            }
        };

        if applied.is_empty() {
            tracing::debug!("No change from {}", mutation);
            return Ok(applied);
        }

        self.version += 1;
        for m in &applied {
            tracing::debug!("Applied {} (v{})", m, self.version);
        }
        self.persist()?;
        Ok(applied)
    }

    /// Sole edit entry point for path/value pairs
    pub fn apply_edit(&mut self, path: &str, edit: Edit) -> Result<Vec<Mutation>, EditorError> {
        self.apply(Mutation::new(Path::parse(path)?, edit))
    }

    fn persist(&self) -> Result<(), EditorError> {
        let Some(coalescer) = &self.coalescer else {
            return Ok(());
        };
        coalescer.request(Snapshot {
            version: self.version,
            identifier: self.identifier.clone(),
            document: Arc::new(self.document.clone()),
        })
    }

    /// Append a default annotation with the next free id
    pub fn add_annotation(&mut self) -> Result<i64, EditorError> {
        let id = self.document.next_annotation_id()?;
        let index = self.document.annotation_count();
        self.apply(Mutation::new(
            Path::annotation(index, &[]),
            Edit::Set(Annotation::new(id).to_value()),
        ))?;
        Ok(id)
    }

    pub fn delete_annotation(&mut self, index: usize) -> Result<(), EditorError> {
        self.annotation_at(index)?;
        self.apply(Mutation::new(Path::annotation(index, &[]), Edit::Delete))?;
        Ok(())
    }

    pub fn select(&mut self, index: usize) -> Result<(), EditorError> {
        self.annotation_at(index)?;
        self.apply(Mutation::new(
            Path::annotation(index, &["isSelected"]),
            Edit::Set(Value::Bool(true)),
        ))?;
        Ok(())
    }

    /// Flip `isSelected`; returns the new state
    pub fn toggle_selected(&mut self, index: usize) -> Result<bool, EditorError> {
        self.toggle_flag(index, "isSelected")
    }

    /// Flip `hidden`; returns the new state
    pub fn toggle_hidden(&mut self, index: usize) -> Result<bool, EditorError> {
        self.toggle_flag(index, "hidden")
    }

    fn toggle_flag(&mut self, index: usize, flag: &str) -> Result<bool, EditorError> {
        let current = self
            .annotation_at(index)?
            .get(flag)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        self.apply(Mutation::new(Path::annotation(index, &[flag]), Edit::Set(Value::Bool(!current))))?;
        Ok(!current)
    }

    /// Add a placeholder property to the mapping or list at `path`.
    ///
    /// Mappings get the first free key of `name`, `name1`, `name2`, …;
    /// lists get a new last element. Returns the path of the new entry.
    pub fn add_property(&mut self, path: &str) -> Result<Path, EditorError> {
        let container = Path::parse(path)?;
        let target = match container.resolve(self.document.root())? {
            Some(Value::Map(map)) => {
                let key = (0..)
                    .map(|n| match n {
                        0 => NEW_PROPERTY_NAME.to_string(),
                        n => format!("{}{}", NEW_PROPERTY_NAME, n),
                    })
                    .find(|key| !map.contains_key(key))
                    .unwrap_or_else(|| NEW_PROPERTY_NAME.to_string());
                container.join(key)
            }
            Some(Value::List(items)) => container.join(items.len()),
            Some(other) => {
                return Err(crate::PathError::NotAContainer {
                    path: container.to_string(),
                    segment: container.last().to_string(),
                    kind: other.kind(),
                }
                .into())
            }
            None => return Err(MutationError::MissingKey(container.to_string()).into()),
        };

        self.apply(Mutation::new(target.clone(), Edit::Set(NEW_PROPERTY_VALUE.into())))?;
        Ok(target)
    }

    /// Append a keyword; blank keywords are ignored
    pub fn add_keyword(&mut self, keyword: &str) -> Result<bool, EditorError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(false);
        }
        let index = self
            .document
            .root()
            .get("keywords")
            .and_then(Value::as_list)
            .map_or(0, Vec::len);
        let path = Path::from_segments(["keywords".to_string(), index.to_string()])?;
        Ok(!self.apply(Mutation::new(path, Edit::Set(keyword.into())))?.is_empty())
    }

    pub fn remove_keyword(&mut self, index: usize) -> Result<bool, EditorError> {
        let path = Path::from_segments(["keywords".to_string(), index.to_string()])?;
        Ok(!self.apply(Mutation::new(path, Edit::Delete))?.is_empty())
    }

    fn annotation_at(&self, index: usize) -> Result<&Value, EditorError> {
        self.document
            .annotations()
            .get(index)
            .ok_or(EditorError::AnnotationNotFound(index))
    }

    /// Native frame size, if the document records one
    pub fn frame_size(&self) -> Option<(f64, f64)> {
        let frame = self.document.root().get("frame")?;
        Some((frame.get("width")?.as_f64()?, frame.get("height")?.as_f64()?))
    }

    pub fn zoom(&self) -> ZoomState {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: ZoomState) {
        self.zoom = zoom;
    }

    /// Wheel event over the canvas; returns whether the zoom changed
    pub fn on_wheel(&mut self, delta_y: f64, ctrl: bool, shift: bool) -> bool {
        self.zoom.on_wheel(delta_y, ctrl, shift)
    }

    /// Growth factor at the current zoom; identity without a frame size
    pub fn growth(&self) -> GrowthFactor {
        self.frame_size()
            .and_then(|(w, h)| self.zoom.growth(w, h))
            .unwrap_or_default()
    }

    /// Pointer position on the canvas in frame pixels
    pub fn pointer_position(&self, screen: Point) -> Point {
        screen_to_model(screen, self.growth())
    }

    /// Pointer-down on an annotation's body or handle
    pub fn begin_drag(&mut self, index: usize, action: HandleAction, pointer: Point) -> Result<(), EditorError> {
        self.annotation_at(index)?;
        self.drag = Some(DragGesture::begin(index, action, pointer).with_clamp(self.clamp));
        Ok(())
    }

    /// Pointer move during a drag; returns whether the box changed
    pub fn drag_to(&mut self, pointer: Point, now: Instant) -> Result<bool, EditorError> {
        let growth = self.growth();
        let Some(drag) = self.drag.as_mut() else {
            return Ok(false);
        };
        let index = drag.index();

        let current = self
            .document
            .annotations()
            .get(index)
            .and_then(|a| a.get("bounding_box"))
            .and_then(BoundingBox::from_value)
            .ok_or_else(|| EditorError::InvalidDocument(format!("annotation {} has no bounding box", index)))?;

        match drag.pointer_move(pointer, current, growth, now) {
            Some(mutation) => Ok(!self.apply(mutation)?.is_empty()),
            None => Ok(false),
        }
    }

    /// Pointer-up; a drag that never moved toggles selection
    pub fn end_drag(&mut self) -> Result<(), EditorError> {
        let Some(drag) = self.drag.take() else {
            return Ok(());
        };
        let is_selected = self
            .document
            .annotations()
            .get(drag.index())
            .and_then(|a| a.get("isSelected"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if let Some(toggle) = drag.release(is_selected) {
            self.apply(toggle)?;
        }
        Ok(())
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Current save state; always idle for a session without a store
    pub fn save_status(&self) -> SaveStatus {
        self.coalescer
            .as_ref()
            .map(SaveCoalescer::status)
            .unwrap_or_default()
    }

    /// Save status updates; `None` for a session without a store
    pub fn subscribe_status(&self) -> Option<watch::Receiver<SaveStatus>> {
        self.coalescer.as_ref().map(SaveCoalescer::subscribe)
    }

    /// Wait for all requested saves to settle
    pub async fn flush(&self) -> Result<FlushReport, EditorError> {
        match &self.coalescer {
            Some(coalescer) => coalescer.flush().await,
            None => Ok(FlushReport::default()),
        }
    }

    /// Settle pending saves and stop the coalescer
    pub async fn close(self) -> Result<FlushReport, EditorError> {
        match self.coalescer {
            Some(coalescer) => coalescer.close().await,
            None => Ok(FlushReport::default()),
        }
    }
}

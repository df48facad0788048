//! # Annotate Editor
//!
//! Core editing engine for frame annotation documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ gesture / panels: pointer drags, fields     │
//! │  - geometry: screen delta → model delta     │
//! │  - coerce: field text → typed value         │
//! └─────────────────────────────────────────────┘
//!                     ↓  (path, edit)
//! ┌─────────────────────────────────────────────┐
//! │ session: one document, one writer           │
//! │  - mutations: create / write / delete /     │
//! │    rename along dotted paths                │
//! │  - post_effects: single selection           │
//! └─────────────────────────────────────────────┘
//!                     ↓  snapshot
//! ┌─────────────────────────────────────────────┐
//! │ persistence: coalesced, one write in flight │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Document is source of truth**: screen geometry is derived, never stored
//! 2. **One entry point**: every change is a path-addressed [`Mutation`]
//! 3. **Validate, then apply**: a rejected edit leaves the document untouched
//! 4. **Latest state wins**: the store only ever sees the newest snapshot
//!
//! ## Usage
//!
//! ```rust,ignore
//! use annotate_editor::{Document, Edit, EditSession, MemoryStore, NoRetry};
//! use std::sync::Arc;
//!
//! let doc = Document::from_json(&json)?;
//! let mut session = EditSession::with_store("street/f1.json", doc, Arc::new(MemoryStore::new()), NoRetry);
//!
//! let id = session.add_annotation()?;
//! session.apply_edit("$.annotations.0.attributes.plate", Edit::Input("1234".into()))?;
//! session.select(0)?;
//!
//! let report = session.flush().await?;
//! ```

mod coerce;
mod document;
mod errors;
pub mod geometry;
mod gesture;
mod model;
mod mutations;
mod path;
mod persistence;
mod post_effects;
mod session;
mod value;

pub use coerce::{coerce, InputKind};
pub use document::Document;
pub use errors::EditorError;
pub use geometry::{ClampPolicy, GrowthFactor, HandleAction, Point, ZoomState};
pub use gesture::{DragGesture, MOVE_THROTTLE};
pub use model::{annotation_title, Annotation, BoundingBox, FrameRef, Metadata};
pub use mutations::{is_protected_key, Edit, Mutation, MutationError, MutationOutcome, PROTECTED_KEYS};
pub use path::{ContainerKind, Path, PathError};
pub use persistence::{
    DocumentStore, FailedWrite, FixedDelay, FlushReport, MemoryStore, NoRetry, RetryPolicy, SaveCoalescer,
    SaveStatus, Snapshot, StoreError,
};
pub use post_effects::{enforce_single_selection, PostEffect, PostEffectEngine, SingleSelection};
pub use session::EditSession;
pub use value::{Map, Value};

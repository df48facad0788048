//! File-system collaborators for the annotation editor.
//!
//! ```text
//! frames/                     datasets/
//!   street/0001/f1.png  ──convert──▶  street/0001/f1.json
//!   street/0001/f1.json (frame record)
//! ```
//!
//! [`FrameLibrary`] lists raw frames and turns one into a fresh document;
//! [`DatasetStore`] loads, lists and persists documents and is the
//! [`DocumentStore`](annotate_editor::DocumentStore) an editing session
//! saves through.

pub mod dataset;
pub mod errors;
pub mod frames;
pub mod paths;

pub use dataset::DatasetStore;
pub use errors::{WorkspaceError, WorkspaceResult};
pub use frames::{frame_keywords, Conversion, FrameLibrary, IMAGE_EXTENSIONS};
pub use paths::{document_identifier, resolve_within};

//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Mutation error: {0}")]
    Mutation(#[from] crate::mutations::MutationError),

    #[error("Path error: {0}")]
    Path(#[from] crate::path::PathError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] crate::persistence::StoreError),

    #[error("No annotation at index {0}")]
    AnnotationNotFound(usize),

    #[error("Annotation ids exhausted")]
    IdsExhausted,

    #[error("Save coalescer has shut down")]
    CoalescerClosed,
}

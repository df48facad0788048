use annotate_editor::EditorError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Path '{0}' does not exist")]
    NotFound(PathBuf),

    #[error("Path '{0}' escapes its root")]
    Traversal(String),

    #[error("'{0}' is not a frame image")]
    NotAnImage(String),

    #[error("Frame record {0} is not a JSON object")]
    InvalidFrameRecord(PathBuf),

    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

impl WorkspaceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

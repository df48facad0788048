pub mod annotation;
pub mod datasets;
pub mod drag;
pub mod edit;
pub mod frames;
pub mod init;
pub mod keyword;
pub mod show;

pub use annotation::{annotation, AnnotationArgs};
pub use datasets::{datasets, DatasetsArgs};
pub use drag::{drag, DragArgs};
pub use edit::{edit, EditArgs};
pub use frames::{convert, frames, ConvertArgs, FramesArgs};
pub use init::{init, InitArgs};
pub use keyword::{keyword, KeywordArgs};
pub use show::{show, ShowArgs};

use crate::config::Config;
use annotate_editor::{EditSession, FlushReport};
use annotate_workspace::{DatasetStore, FrameLibrary};
use anyhow::{anyhow, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

/// Resolved directories and settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub frames_dir: PathBuf,
    pub datasets_dir: PathBuf,
}

impl Context {
    pub fn new(cwd: &str, frames_dir: Option<String>, datasets_dir: Option<String>) -> Result<Self> {
        let mut config = Config::load(cwd)?;
        if let Some(dir) = frames_dir {
            config.frames_dir = dir;
        }
        if let Some(dir) = datasets_dir {
            config.datasets_dir = dir;
        }
        Ok(Self {
            frames_dir: config.get_frames_dir(cwd),
            datasets_dir: config.get_datasets_dir(cwd),
            config,
        })
    }

    pub fn datasets(&self) -> DatasetStore {
        DatasetStore::new(&self.datasets_dir)
    }

    pub fn frames(&self) -> FrameLibrary {
        FrameLibrary::new(&self.frames_dir, self.datasets())
    }

    /// Load a document and start a session that saves back to it
    pub async fn open(&self, identifier: &str) -> Result<EditSession> {
        let store = self.datasets();
        let document = store.load(identifier).await?;
        Ok(EditSession::with_store(identifier, document, Arc::new(store), self.config.retry_policy())
            .with_clamp(self.config.clamp_policy()))
    }
}

/// Wait for the last save and report it
pub async fn finish(session: EditSession) -> Result<FlushReport> {
    let identifier = session.identifier().to_string();
    let report = session.close().await?;

    if let Some(failure) = &report.last_error {
        return Err(anyhow!("could not save {} (v{}): {}", identifier, failure.version, failure.error));
    }
    match report.last_written {
        Some(version) => println!("  {} Saved {} (v{})", "✓".green(), identifier, version),
        None => println!("  {} No changes to {}", "•".dimmed(), identifier),
    }
    Ok(report)
}

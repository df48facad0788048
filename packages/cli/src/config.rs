use annotate_editor::{ClampPolicy, FixedDelay, NoRetry, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "annotate.config.json";

/// Annotate configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding raw frame images
    #[serde(default = "default_frames_dir")]
    pub frames_dir: String,

    /// Directory holding annotation documents
    #[serde(default = "default_datasets_dir")]
    pub datasets_dir: String,

    /// Keep width and height at zero or above while resizing
    #[serde(default)]
    pub clamp_negative_size: bool,

    /// Retry behaviour for failed saves
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_frames_dir() -> String {
    "frames".to_string()
}

fn default_datasets_dir() -> String {
    "datasets".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Retries after the first failed write; 0 disables retrying
    #[serde(default)]
    pub attempts: u32,

    #[serde(default)]
    pub delay_ms: u64,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            tracing::debug!("Loaded {}", config_path.display());
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn get_frames_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.frames_dir)
    }

    pub fn get_datasets_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.datasets_dir)
    }

    pub fn clamp_policy(&self) -> ClampPolicy {
        if self.clamp_negative_size {
            ClampPolicy::ClampToZero
        } else {
            ClampPolicy::Unclamped
        }
    }

    pub fn retry_policy(&self) -> Box<dyn RetryPolicy> {
        if self.retry.attempts == 0 {
            Box::new(NoRetry)
        } else {
            Box::new(FixedDelay {
                attempts: self.retry.attempts,
                delay: Duration::from_millis(self.retry.delay_ms),
            })
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frames_dir: default_frames_dir(),
            datasets_dir: default_datasets_dir(),
            clamp_negative_size: false,
            retry: RetryConfig::default(),
        }
    }
}

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_OEMBED_TIMEOUT_SECS};

fn default_port() -> u16 {
    8080
}

/// Server configuration file structure (TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct ServeConfig {
    /// Directory holding the SQLite database and audio attachments (default: data)
    pub data_dir: Option<PathBuf>,
    /// Port to listen on (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory of built frontend assets to serve alongside the API (optional)
    pub static_dir: Option<PathBuf>,
    /// Cap on an uploaded audio attachment in bytes (default: 10 MiB)
    pub max_upload_bytes: Option<usize>,
    /// Timeout for the video metadata lookup in seconds (default: 10)
    pub oembed_timeout_secs: Option<u64>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            port: default_port(),
            static_dir: None,
            max_upload_bytes: None,
            oembed_timeout_secs: None,
        }
    }
}

impl ServeConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("annotations.sqlite")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir().join("audio")
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn oembed_timeout(&self) -> Duration {
        Duration::from_secs(
            self.oembed_timeout_secs
                .unwrap_or(DEFAULT_OEMBED_TIMEOUT_SECS),
        )
    }
}

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::StorageError;

/// Default length of the upcoming view, in days after today.
pub const DEFAULT_UPCOMING_WINDOW: u32 = 7;

/// Runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Where user data, the user directory and logs live.
    pub data_dir: PathBuf,
    /// Days after today covered by the upcoming view.
    pub upcoming_window: u32,
}

/// Optional `config.json` in the data directory.
#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FileConfig {
    upcoming_window: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        FileConfig {
            upcoming_window: DEFAULT_UPCOMING_WINDOW,
        }
    }
}

/// Returns the data directory.
///
/// The path is determined in the following order:
/// 1. `TASKCAL_DIR` environment variable.
/// 2. `~/.local/share/taskcal` (on Linux).
/// 3. `./taskcal` (fallback).
pub fn data_dir() -> PathBuf {
    std::env::var("TASKCAL_DIR").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("taskcal")
    })
}

impl Config {
    /// Loads settings for the current environment.
    ///
    /// `TASKCAL_WINDOW` overrides the window from `config.json`.
    pub fn load() -> Result<Self, StorageError> {
        let mut config = Self::from_dir(&data_dir())?;
        if let Ok(raw) = std::env::var("TASKCAL_WINDOW") {
            match raw.trim().parse() {
                Ok(days) => config.upcoming_window = days,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid TASKCAL_WINDOW"),
            }
        }
        Ok(config)
    }

    /// Reads `config.json` from `dir`, defaulting anything missing.
    pub fn from_dir(dir: &Path) -> Result<Self, StorageError> {
        let file: FileConfig = match std::fs::read_to_string(dir.join("config.json")) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => return Err(StorageError::Io(e)),
        };
        Ok(Config {
            data_dir: dir.to_path_buf(),
            upcoming_window: file.upcoming_window,
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{BackupError, StorageError};
use crate::models::UserData;

/// Durable home for each user's [`UserData`].
pub trait Persistence {
    /// Loads a user's data. Missing or unreadable data yields an empty root.
    fn load(&self, username: &str) -> UserData;

    /// Writes a user's data, replacing what was there.
    fn save(&self, username: &str, data: &UserData) -> Result<(), StorageError>;
}

/// Decodes a persisted blob. A root object without `tasks` counts as empty.
fn decode_blob(raw: &str) -> Result<UserData, StorageError> {
    let value: Value = serde_json::from_str(raw)?;
    match UserData::from_value(value) {
        Ok(data) => Ok(data),
        Err(BackupError::MissingTasks) => Ok(UserData::default()),
        Err(e) => Err(StorageError::Parse(serde::de::Error::custom(e))),
    }
}

/// Stores each user as `calendarData_<username>.json` inside one directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonDirStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a user's data file.
    pub fn path_for(&self, username: &str) -> PathBuf {
        self.dir.join(format!("calendarData_{}.json", username))
    }

    fn read(&self, username: &str) -> Result<Option<UserData>, StorageError> {
        let path = self.path_for(username);
        if !path.exists() {
            return Ok(None);
        }
        let mut f = OpenOptions::new().read(true).open(&path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        if s.trim().is_empty() {
            return Ok(None);
        }
        decode_blob(&s).map(Some)
    }
}

impl Persistence for JsonDirStore {
    fn load(&self, username: &str) -> UserData {
        match self.read(username) {
            Ok(Some(data)) => {
                tracing::info!(user = username, tasks = data.task_count(), "Loaded user data");
                data
            }
            Ok(None) => {
                tracing::info!(user = username, "No stored data, starting fresh");
                UserData::default()
            }
            Err(e) => {
                tracing::error!(user = username, error = %e, "Failed reading user data; starting fresh");
                UserData::default()
            }
        }
    }

    fn save(&self, username: &str, data: &UserData) -> Result<(), StorageError> {
        ensure_dir(&self.dir)?;
        let s = serde_json::to_string_pretty(data)?;
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.path_for(username))?;
        f.write_all(s.as_bytes())?;
        tracing::debug!(user = username, "Saved user data");
        Ok(())
    }
}

/// Keeps serialized blobs in memory. Useful for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RefCell<HashMap<String, String>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every save fails, as a full or disabled disk would.
    pub fn failing() -> Self {
        MemoryStore {
            blobs: RefCell::default(),
            fail_writes: true,
        }
    }

    /// Seeds a raw blob for a user, bypassing encoding.
    pub fn insert_raw(&self, username: &str, raw: impl Into<String>) {
        self.blobs.borrow_mut().insert(username.to_string(), raw.into());
    }

    pub fn raw(&self, username: &str) -> Option<String> {
        self.blobs.borrow().get(username).cloned()
    }
}

impl Persistence for MemoryStore {
    fn load(&self, username: &str) -> UserData {
        let Some(raw) = self.raw(username) else {
            return UserData::default();
        };
        decode_blob(&raw).unwrap_or_else(|e| {
            tracing::error!(user = username, error = %e, "Failed parsing user data; starting fresh");
            UserData::default()
        })
    }

    fn save(&self, username: &str, data: &UserData) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "storage is read-only",
            )));
        }
        let s = serde_json::to_string(data)?;
        self.insert_raw(username, s);
        Ok(())
    }
}

/// Creates a directory (and parents) if it doesn't exist yet.
pub fn ensure_dir(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| StorageError::directory(format!("{}: {}", path.display(), e)))?;
    }
    Ok(())
}

/// Default file name for a user's backup.
pub fn backup_file_name(username: &str) -> String {
    format!("{}_calendar.json", username)
}

/// Encodes a backup document. Same shape as the persisted data.
pub fn export_backup(data: &UserData) -> Result<String, StorageError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Decodes a backup document.
///
/// Only the outer shape is checked: an object with a `tasks` field.
pub fn import_backup(raw: &str) -> Result<UserData, BackupError> {
    let value: Value = serde_json::from_str(raw)?;
    UserData::from_value(value)
}


use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AuthError, StorageError};
use crate::storage::ensure_dir;

/// Decides who may open a session. Kept apart from task data.
pub trait Authenticator {
    fn verify(&self, username: &str, password: &str) -> bool;
    fn register(&mut self, username: &str, password: &str) -> Result<(), AuthError>;
}

/// Whether `username` can name a per-user data file.
///
/// Rejects blank names, `.`/`..`, path separators, control characters and
/// characters Windows forbids in file names.
pub fn is_valid_username(username: &str) -> bool {
    let name = username.trim();
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name
            .chars()
            .any(|c| c.is_control() || matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*'))
}

/// Username to password mapping, persisted as `users.json`.
#[derive(Debug, Default)]
pub struct UserDirectory {
    path: Option<PathBuf>,
    users: HashMap<String, String>,
}

impl UserDirectory {
    /// A directory that lives only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens `users.json` in `dir`. A missing file means no users yet.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        let path = dir.join("users.json");
        let users = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => HashMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StorageError::Io(e)),
        };
        Ok(UserDirectory {
            path: Some(path),
            users,
        })
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username.trim())
    }

    fn persist(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.users)?)?;
        Ok(())
    }
}

impl Authenticator for UserDirectory {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username.trim())
            .is_some_and(|stored| stored == password)
    }

    fn register(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        let username = username.trim();
        if !is_valid_username(username) {
            return Err(AuthError::InvalidUsername);
        }
        if self.users.contains_key(username) {
            return Err(AuthError::AlreadyExists(username.to_string()));
        }
        self.users.insert(username.to_string(), password.to_string());
        if let Err(e) = self.persist() {
            self.users.remove(username);
            return Err(e.into());
        }
        tracing::info!(user = username, "Registered user");
        Ok(())
    }
}

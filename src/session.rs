use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::auth::{is_valid_username, Authenticator};
use crate::error::{AuthError, BackupError, StorageError};
use crate::models::{DayKey, NewTask, Task, TaskId, TaskPatch};
use crate::recurrence;
use crate::storage::{self, ensure_dir, Persistence};
use crate::store::TaskStore;
use crate::views::{DatedTask, ViewCache};

/// One signed-in user's working state.
///
/// Every mutation goes to the store first and is then saved through the
/// persistence backend. A failed save is logged and otherwise ignored: the
/// in-memory data stays authoritative for the rest of the session.
pub struct Session<P: Persistence> {
    username: String,
    persistence: P,
    store: TaskStore,
    views: ViewCache,
    recurrence_materialized: bool,
}

impl<P: Persistence> Session<P> {
    /// Checks credentials, then boots the user's session.
    pub fn login<A: Authenticator>(
        auth: &A,
        persistence: P,
        username: &str,
        password: &str,
        today: NaiveDate,
    ) -> Result<Self, AuthError> {
        let username = username.trim();
        if !is_valid_username(username) || !auth.verify(username, password) {
            tracing::warn!(user = username, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(Self::boot(username, persistence, today))
    }

    /// Loads the user's data and runs the recurrence pass for `today`.
    pub fn boot(username: &str, persistence: P, today: NaiveDate) -> Self {
        let mut session = Self::open(username, persistence);
        session.materialize_recurring(today);
        session
    }

    /// Loads the user's data without touching recurring tasks.
    pub fn open(username: &str, persistence: P) -> Self {
        let data = persistence.load(username);
        tracing::info!(user = username, tasks = data.task_count(), "Session started");
        Session {
            username: username.to_string(),
            persistence,
            store: TaskStore::from_data(data),
            views: ViewCache::new(),
            recurrence_materialized: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    fn persist(&self) {
        if let Err(e) = self.persistence.save(&self.username, &self.store.to_data()) {
            tracing::warn!(user = %self.username, error = %e, "Failed saving user data");
        }
    }

    /// Clones recurring tasks onto `today`, once per session.
    ///
    /// Later calls return 0 without scanning.
    pub fn materialize_recurring(&mut self, today: NaiveDate) -> usize {
        if self.recurrence_materialized {
            return 0;
        }
        self.recurrence_materialized = true;
        let added = recurrence::materialize(&mut self.store, today);
        if added > 0 {
            self.persist();
        }
        added
    }

    pub fn add_task(&mut self, key: DayKey, new: NewTask) -> TaskId {
        let id = self.store.add_task(key, new);
        self.persist();
        id
    }

    pub fn update_task(&mut self, key: DayKey, id: &str, patch: TaskPatch) -> bool {
        let found = self.store.update_task(key, id, patch);
        if found {
            self.persist();
        }
        found
    }

    pub fn toggle_task(&mut self, key: DayKey, id: &str, completed: bool) -> bool {
        let found = self.store.toggle_task(key, id, completed);
        if found {
            self.persist();
        }
        found
    }

    pub fn delete_task(&mut self, key: DayKey, id: &str) -> bool {
        let removed = self.store.delete_task(key, id);
        if removed {
            self.persist();
        }
        removed
    }

    pub fn move_task(&mut self, from: DayKey, id: &str, to: DayKey) -> bool {
        let moved = self.store.move_task(from, id, to);
        if moved && from != to {
            self.persist();
        }
        moved
    }

    pub fn day_tasks(&self, key: DayKey) -> &[Task] {
        self.store.day_tasks(key)
    }

    pub fn upcoming(&mut self, today: NaiveDate, window_days: u32) -> &[DatedTask] {
        self.views.upcoming(&self.store, today, window_days)
    }

    pub fn all_tasks(&mut self) -> &[DatedTask] {
        self.views.all_tasks(&self.store)
    }

    pub fn search(&mut self, query: &str) -> Vec<DatedTask> {
        self.views.search(&self.store, query)
    }

    /// The user's data as a backup document.
    pub fn export_backup(&self) -> Result<String, StorageError> {
        storage::export_backup(&self.store.to_data())
    }

    /// Writes `<username>_calendar.json` into `dir` and returns its path.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf, StorageError> {
        ensure_dir(dir)?;
        let path = dir.join(storage::backup_file_name(&self.username));
        std::fs::write(&path, self.export_backup()?)?;
        tracing::info!(user = %self.username, path = %path.display(), "Exported backup");
        Ok(path)
    }

    /// Replaces all data with a backup document. On error nothing changes.
    pub fn import_backup(&mut self, raw: &str) -> Result<usize, BackupError> {
        let data = storage::import_backup(raw)?;
        let count = data.task_count();
        self.store.replace(data);
        self.persist();
        tracing::info!(user = %self.username, tasks = count, "Imported backup");
        Ok(count)
    }

    pub fn import_file(&mut self, path: &Path) -> Result<usize, BackupError> {
        let raw = std::fs::read_to_string(path)?;
        self.import_backup(&raw)
    }

    /// Ends the session. The in-memory data is simply dropped.
    pub fn logout(self) {
        tracing::info!(user = %self.username, "Session ended");
    }
}

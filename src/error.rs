use thiserror::Error;

/// Failures of the persistence layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to create directory: {0}")]
    Directory(String),
}

impl StorageError {
    pub fn directory(msg: impl Into<String>) -> Self {
        StorageError::Directory(msg.into())
    }
}

/// Reasons a backup document is rejected on import.
///
/// Any of these leaves the current task data untouched.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to read backup file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backup is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Backup must be a JSON object")]
    NotAnObject,

    #[error("Backup has no \"tasks\" field")]
    MissingTasks,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User '{0}' already exists")]
    AlreadyExists(String),

    #[error("Username must be non-blank and usable as a file name")]
    InvalidUsername,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

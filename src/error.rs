use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the snapshot, scanning and interop layers.
#[derive(Error, Debug)]
pub enum HashDbError {
    #[error("Couldn't find '{filename}' in '{}' or any parent directories", start.display())]
    NotFound { filename: String, start: PathBuf },

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Hash database already exists: {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("Hash database version {found} is newer than supported version {current}")]
    UnsupportedVersion { found: u32, current: u32 },

    #[error("No migration registered for hash database version {0}")]
    MissingMigration(u32),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed hash database {}: {source}", path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl HashDbError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, HashDbError>;

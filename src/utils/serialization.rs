use crate::error::{HashDbError, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Serialize data as compact JSON
///
/// # Errors
///
/// Returns an error if:
/// - Serialization fails
pub fn serialize<T: serde::Serialize>(data: &T, path: &Path) -> Result<Vec<u8>> {
    serde_json::to_vec(data).map_err(|source| HashDbError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Deserialize JSON read from `path`
///
/// # Errors
///
/// Returns an error if:
/// - Data is malformed or has the wrong shape
pub fn deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8], path: &Path) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|source| HashDbError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with `data` in a single rename.
///
/// The bytes go to a temporary file in the same directory, are synced, and
/// only then renamed over the target, so readers see either the old file or
/// the complete new one.
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory is missing or not writable
/// - Writing, syncing or renaming fails
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| HashDbError::io(dir, e))?;
    temp.write_all(data)
        .map_err(|e| HashDbError::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| HashDbError::io(temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| HashDbError::io(path, e.error))?;

    Ok(())
}

use crate::error::{HashDbError, Result};
use crate::storage::Snapshot;
use std::path::Path;

/// Extracts the entries under `subdir` into a new snapshot rooted there.
///
/// Membership is a path-component prefix match, so `/data/foo2/x` is not
/// under `/data/foo`. `subdir` must be absolute and normalized. The source
/// snapshot is left untouched.
///
/// # Errors
///
/// Returns [`HashDbError::NotADirectory`] if `subdir` is not an existing
/// directory.
pub fn split(snapshot: &Snapshot, subdir: &Path) -> Result<Snapshot> {
    if !subdir.is_dir() {
        return Err(HashDbError::NotADirectory(subdir.to_path_buf()));
    }

    let mut extracted = Snapshot::new(subdir.to_path_buf());
    extracted.entries = snapshot
        .entries
        .iter()
        .filter(|(path, _)| path.starts_with(subdir))
        .map(|(path, entry)| (path.clone(), entry.clone()))
        .collect();
    Ok(extracted)
}

//! Change detection between a stored snapshot and the live tree.
//!
//! Scanning only compares `lstat` metadata against each stored entry. Files
//! whose size, mtime or kind differ become *candidates*; deciding whether
//! their content really changed is left to the reconciler, which is the only
//! place that pays for hashing.

use crate::error::{HashDbError, Result};
use crate::storage::{Entry, LiveMetadata, Snapshot};
use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use tracing::{Level, debug, span, warn};
use walkdir::WalkDir;

/// Outcome of one walk over the snapshot root.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanResult {
    /// Untracked paths found on disk, stamped with the metadata seen during
    /// the walk and no digest
    pub added: Vec<Entry>,
    /// Tracked paths that were not seen
    pub removed: BTreeSet<PathBuf>,
    /// Tracked paths whose live metadata no longer matches
    pub candidates: BTreeSet<PathBuf>,
}

impl ScanResult {
    /// True when nothing was added, removed or flagged.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.candidates.is_empty()
    }
}

/// Walks a snapshot's root and classifies every file and symlink in it.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    /// Files with this name are the databases themselves and never tracked
    db_filename: String,
}

impl ChangeDetector {
    #[must_use]
    pub fn new(db_filename: impl Into<String>) -> Self {
        Self {
            db_filename: db_filename.into(),
        }
    }

    /// Compares `snapshot` with the tree under its root. Never mutates it.
    ///
    /// Symlinks are reported as themselves and never followed. Directories
    /// that cannot be read are skipped with a warning, and paths that vanish
    /// mid-walk are treated as never seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be walked at all, or an `lstat`
    /// fails for a reason other than the path vanishing.
    pub fn scan(&self, snapshot: &Snapshot) -> Result<ScanResult> {
        let span = span!(Level::DEBUG, "scan", root = %snapshot.root.display());
        let _guard = span.enter();

        if !snapshot.root.is_dir() {
            return Err(HashDbError::NotADirectory(snapshot.root.clone()));
        }

        let mut result = ScanResult::default();
        let mut seen = BTreeSet::new();

        for entry in WalkDir::new(&snapshot.root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(PathBuf::from).unwrap_or_default();
                    match err.into_io_error() {
                        Some(io_err) if io_err.kind() == io::ErrorKind::NotFound => continue,
                        Some(io_err) if io_err.kind() == io::ErrorKind::PermissionDenied => {
                            warn!(path = %path.display(), "Skipping unreadable path");
                            continue;
                        }
                        Some(io_err) => return Err(HashDbError::io(path, io_err)),
                        None => {
                            warn!(path = %path.display(), "Skipping filesystem loop");
                            continue;
                        }
                    }
                }
            };

            let file_type = entry.file_type();
            if !(file_type.is_file() || file_type.is_symlink()) {
                continue;
            }
            if entry.file_name() == self.db_filename.as_str() {
                continue;
            }

            let live = match entry.metadata() {
                Ok(metadata) => LiveMetadata::from_metadata(&metadata),
                Err(err) => match err.into_io_error() {
                    Some(io_err) if io_err.kind() == io::ErrorKind::NotFound => continue,
                    Some(io_err) => return Err(HashDbError::io(entry.path(), io_err)),
                    None => continue,
                },
            };

            let path = entry.into_path();
            match snapshot.get(&path) {
                Some(stored) => {
                    if !stored.matches_live_metadata(&live) {
                        result.candidates.insert(path.clone());
                    }
                    seen.insert(path);
                }
                None => result.added.push(Entry::with_metadata(path, &live)),
            }
        }

        result.removed = snapshot
            .entries
            .keys()
            .filter(|path| !seen.contains(*path))
            .cloned()
            .collect();

        debug!(
            added = result.added.len(),
            removed = result.removed.len(),
            candidates = result.candidates.len(),
            "Scan complete"
        );
        Ok(result)
    }
}

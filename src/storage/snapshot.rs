//! The record set of tracked entries and its on-disk form.
//!
//! A snapshot is persisted as one JSON document in its root directory:
//!
//! ```json
//! {"files": {"sub/a.txt": {"hash": "cf83...", "mtime": 1700000000.5,
//!                          "size": 2, "type": 0}},
//!  "version": 2}
//! ```
//!
//! Keys under `files` are relative to the root so the tree can be moved.
//! Unknown keys are ignored on read.

use super::migrations::{self, CURRENT_VERSION};
use super::{Entry, EntryKind};
use crate::error::{HashDbError, Result};
use crate::utils::hash::Hasher;
use crate::utils::paths::{
    decode_path, encode_path, find_in_ancestors, normalize_lexically, relative_to,
};
use crate::utils::serialization;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, info, span};

/// Schema version assumed for files written before `version` existed.
const fn unversioned() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    files: BTreeMap<String, EntryRecord>,
    #[serde(default = "unversioned")]
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    hash: Option<String>,
    mtime: Option<f64>,
    size: Option<u64>,
    #[serde(rename = "type")]
    kind: Option<EntryKind>,
}

/// Mapping from absolute path to [`Entry`] for every file under `root`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Directory all persisted relative paths are resolved against
    pub root: PathBuf,
    /// Schema version the entries conform to
    pub version: u32,
    /// Tracked entries keyed by absolute path
    pub entries: BTreeMap<PathBuf, Entry>,
}

impl Snapshot {
    /// Creates an empty record set at the current schema version.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            root,
            version: CURRENT_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Inserts or replaces the entry stored under `entry.path`.
    pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.path.clone(), entry)
    }

    pub fn remove(&mut self, path: &Path) -> Option<Entry> {
        self.entries.remove(path)
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Entry> {
        self.entries.get(path)
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges every entry of `other`, replacing entries with the same path.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Path of `entry_path` relative to the root, as persisted.
    #[must_use]
    pub fn relative_path(&self, entry_path: &Path) -> PathBuf {
        relative_to(entry_path, &self.root)
    }
}

/// Loads and saves snapshots under a configured database filename.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    db_filename: String,
    hasher: Hasher,
}

impl SnapshotStore {
    /// `hasher` is handed to migrations that need to re-hash entries.
    #[must_use]
    pub fn new(db_filename: impl Into<String>, hasher: Hasher) -> Self {
        Self {
            db_filename: db_filename.into(),
            hasher,
        }
    }

    #[must_use]
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    #[must_use]
    pub const fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Where `snapshot` is persisted.
    #[must_use]
    pub fn db_path(&self, snapshot: &Snapshot) -> PathBuf {
        snapshot.root.join(&self.db_filename)
    }

    /// Finds the database file in `start` or the nearest ancestor.
    ///
    /// # Errors
    ///
    /// Returns [`HashDbError::NotFound`] if no directory up to the filesystem
    /// root holds one.
    pub fn locate(&self, start: &Path) -> Result<PathBuf> {
        find_in_ancestors(start, &self.db_filename).ok_or_else(|| HashDbError::NotFound {
            filename: self.db_filename.clone(),
            start: start.to_path_buf(),
        })
    }

    /// Locates and loads the snapshot governing `start`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No database file is found (see [`Self::locate`])
    /// - The file cannot be read or parsed
    /// - Migration to the current schema fails
    pub fn load(&self, start: &Path) -> Result<Snapshot> {
        let db_path = self.locate(start)?;
        self.load_file(&db_path)
    }

    /// Loads a specific database file, rooted at its parent directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or migration fails.
    pub fn load_file(&self, db_path: &Path) -> Result<Snapshot> {
        let span = span!(Level::DEBUG, "load", path = %db_path.display());
        let _guard = span.enter();

        let root = db_path
            .parent()
            .map_or_else(|| PathBuf::from("/"), normalize_lexically);
        let data = std::fs::read(db_path).map_err(|e| HashDbError::io(db_path, e))?;
        let file: SnapshotFile = serialization::deserialize(&data, db_path)?;

        let mut snapshot = Snapshot {
            root,
            version: file.version,
            entries: BTreeMap::new(),
        };
        for (relative, record) in file.files {
            let path = normalize_lexically(&snapshot.root.join(decode_path(&relative)));
            snapshot.insert(Entry {
                path,
                size: record.size,
                mtime: record.mtime,
                digest: record.hash,
                kind: record.kind,
            });
        }
        debug!(entries = snapshot.len(), version = snapshot.version, "Loaded");

        migrations::migrate(&mut snapshot, &self.hasher)?;
        Ok(snapshot)
    }

    /// Writes `snapshot` to `<root>/<db_filename>` atomically, stamped with
    /// the current schema version. Returns the file written.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic replace fails; the
    /// previous file is left intact in that case.
    pub fn save(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let db_path = self.db_path(snapshot);
        let span = span!(Level::DEBUG, "save", path = %db_path.display());
        let _guard = span.enter();

        let files = snapshot
            .entries
            .values()
            .map(|entry| {
                let record = EntryRecord {
                    hash: entry.digest.clone(),
                    mtime: entry.mtime,
                    size: entry.size,
                    kind: entry.kind,
                };
                (encode_path(&snapshot.relative_path(&entry.path)), record)
            })
            .collect();
        let file = SnapshotFile {
            files,
            version: CURRENT_VERSION,
        };

        let data = serialization::serialize(&file, &db_path)?;
        serialization::write_atomic(&db_path, &data)?;
        info!(entries = snapshot.len(), "Saved hash database");
        Ok(db_path)
    }

    /// Starts an empty snapshot rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`HashDbError::AlreadyInitialized`] if `dir` already holds a
    /// database file.
    pub fn create(&self, dir: &Path) -> Result<Snapshot> {
        let db_path = dir.join(&self.db_filename);
        if db_path.exists() {
            return Err(HashDbError::AlreadyInitialized(db_path));
        }
        Ok(Snapshot::new(dir.to_path_buf()))
    }

    /// Loads the snapshot governing `start`, or starts an empty one rooted
    /// at `start` if none exists.
    ///
    /// # Errors
    ///
    /// Returns any load error other than [`HashDbError::NotFound`].
    pub fn load_or_new(&self, start: &Path) -> Result<Snapshot> {
        match self.load(start) {
            Ok(snapshot) => Ok(snapshot),
            Err(HashDbError::NotFound { .. }) => Ok(Snapshot::new(start.to_path_buf())),
            Err(e) => Err(e),
        }
    }
}

/// Ordered schema migrations applied on load
pub mod migrations;
/// Record set and its JSON persistence
pub mod snapshot;

use crate::utils::hash::Hasher;
use serde::{Deserialize, Serialize};
use std::fs::{FileType, Metadata};
use std::io;
use std::path::{Path, PathBuf};

pub use snapshot::{Snapshot, SnapshotStore};

/// Kind of filesystem object an entry tracks.
///
/// Persisted as the integer `type` field: `0` for a regular file, `1` for a
/// symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EntryKind {
    /// Regular file; digest covers its content
    File,
    /// Symbolic link; digest covers its target string
    Symlink,
}

impl EntryKind {
    /// Classifies an `lstat` file type. Directories and special files yield `None`.
    #[must_use]
    pub fn from_file_type(file_type: FileType) -> Option<Self> {
        if file_type.is_symlink() {
            Some(Self::Symlink)
        } else if file_type.is_file() {
            Some(Self::File)
        } else {
            None
        }
    }
}

impl From<EntryKind> for u8 {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::File => 0,
            EntryKind::Symlink => 1,
        }
    }
}

impl TryFrom<u8> for EntryKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::File),
            1 => Ok(Self::Symlink),
            other => Err(format!("unknown entry type {other}")),
        }
    }
}

/// Modification time as fractional seconds since the Unix epoch.
///
/// Computed the same way for every probe so that two reads of an untouched
/// file compare equal bit for bit.
#[must_use]
pub fn mtime_of(metadata: &Metadata) -> f64 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        #[allow(clippy::cast_precision_loss)]
        let mtime = metadata.mtime() as f64 + metadata.mtime_nsec() as f64 * 1e-9;
        mtime
    }
    #[cfg(not(unix))]
    {
        match metadata.modified() {
            Ok(time) => match time.duration_since(std::time::UNIX_EPOCH) {
                Ok(d) => d.as_secs() as f64 + f64::from(d.subsec_nanos()) * 1e-9,
                Err(e) => {
                    let d = e.duration();
                    -(d.as_secs() as f64 + f64::from(d.subsec_nanos()) * 1e-9)
                }
            },
            Err(_) => 0.0,
        }
    }
}

/// What `lstat` currently reports for a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveMetadata {
    /// Byte length (the target string length for a symlink)
    pub size: u64,
    /// See [`mtime_of`]
    pub mtime: f64,
    /// `None` for anything that is neither a regular file nor a symlink
    pub kind: Option<EntryKind>,
}

impl LiveMetadata {
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            size: metadata.len(),
            mtime: mtime_of(metadata),
            kind: EntryKind::from_file_type(metadata.file_type()),
        }
    }

    /// Probes `path` without following symlinks.
    ///
    /// # Errors
    ///
    /// Returns the underlying `lstat` error, including `NotFound`.
    pub fn probe(path: &Path) -> io::Result<Self> {
        std::fs::symlink_metadata(path).map(|m| Self::from_metadata(&m))
    }
}

/// One tracked file or symlink.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Absolute, normalized path; the key within a [`Snapshot`]
    pub path: PathBuf,
    /// Size at the last digest computation
    pub size: Option<u64>,
    /// Modification time at the last digest computation
    pub mtime: Option<f64>,
    /// Hex digest, absent only for entries whose content was never read
    pub digest: Option<String>,
    /// Object kind, absent only in snapshots older than schema 2
    pub kind: Option<EntryKind>,
}

impl Entry {
    /// Creates an entry with nothing recorded yet.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            size: None,
            mtime: None,
            digest: None,
            kind: None,
        }
    }

    /// Creates an entry stamped with already-probed metadata and no digest.
    #[must_use]
    pub const fn with_metadata(path: PathBuf, live: &LiveMetadata) -> Self {
        Self {
            path,
            size: Some(live.size),
            mtime: Some(live.mtime),
            digest: None,
            kind: live.kind,
        }
    }

    /// Cheap pre-check: recorded size, mtime and kind all equal the live ones.
    ///
    /// Never reads file content.
    #[must_use]
    pub fn matches_live_metadata(&self, live: &LiveMetadata) -> bool {
        self.size == Some(live.size)
            && self.mtime == Some(live.mtime)
            && self.kind.is_some()
            && self.kind == live.kind
    }

    /// Copies size, mtime and kind from a live probe, leaving the digest alone.
    pub const fn stamp(&mut self, live: &LiveMetadata) {
        self.size = Some(live.size);
        self.mtime = Some(live.mtime);
        self.kind = live.kind;
    }

    /// Digest of the entry's current on-disk content.
    ///
    /// Uses the recorded kind and size, so an empty regular file gets the
    /// fixed empty-content digest without being opened. Without a recorded
    /// kind the path is probed first. `Ok(None)` means the path is gone.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than `NotFound`.
    pub fn compute_digest(&self, hasher: &Hasher) -> io::Result<Option<String>> {
        match (self.kind, self.size) {
            (Some(kind), Some(size)) => hasher.digest_kind(&self.path, kind, size),
            _ => hasher.digest_path(&self.path),
        }
    }

    /// Re-reads live metadata and recomputes the digest in place.
    ///
    /// If the path disappears first, the recorded metadata is kept and the
    /// digest is cleared; a later run will classify it as removed.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than `NotFound`.
    pub fn refresh(&mut self, hasher: &Hasher) -> io::Result<()> {
        match LiveMetadata::probe(&self.path) {
            Ok(live) => {
                self.stamp(&live);
                self.digest = self.compute_digest(hasher)?;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.digest = None;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Backfills `kind` from the live filesystem; a missing path counts as a file.
    pub fn probe_kind(&mut self) {
        let is_symlink = std::fs::symlink_metadata(&self.path)
            .is_ok_and(|m| m.file_type().is_symlink());
        self.kind = Some(if is_symlink {
            EntryKind::Symlink
        } else {
            EntryKind::File
        });
    }
}

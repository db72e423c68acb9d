//! Exchange with other checksum tools.
//!
//! - [`manifest`]: read and write `sha512sum`-compatible manifests
//! - [`split`]: carve a subtree out into its own snapshot
//!
//! [`Importer`] ties discovery and merging together for the `import` command.

pub mod manifest;
pub mod split;

pub use manifest::{ManifestLine, export_manifest, import_manifest, parse_manifest};
pub use split::split;

use crate::error::{HashDbError, Result};
use crate::storage::{Snapshot, SnapshotStore};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{Level, info, span, warn};
use walkdir::WalkDir;

/// What one import pass picked up.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Each source file with the number of entries taken from it, in
    /// discovery order
    pub sources: Vec<(PathBuf, usize)>,
}

impl ImportReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.sources.iter().map(|(_, count)| count).sum()
    }
}

/// Discovers foreign manifests and nested databases and merges them into a
/// snapshot.
pub struct Importer<'a> {
    store: &'a SnapshotStore,
    patterns: Vec<glob::Pattern>,
}

impl<'a> Importer<'a> {
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid glob.
    pub fn new(store: &'a SnapshotStore, patterns: &[String]) -> anyhow::Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { store, patterns })
    }

    fn matches(&self, file_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(file_name))
    }

    /// Files under `dir` whose name matches a pattern, sorted by path.
    ///
    /// Symlinks are not followed and unreadable directories are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` itself cannot be walked.
    pub fn find_sources(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() > 0 => {
                    warn!(error = %err, "Skipping unreadable path");
                    continue;
                }
                Err(err) => {
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other("filesystem loop"));
                    return Err(HashDbError::io(dir, source));
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_str().is_some_and(|name| self.matches(name)) {
                found.push(entry.into_path());
            }
        }
        Ok(found)
    }

    /// Merges every source found under `dir` into `snapshot`.
    ///
    /// A file named like the database is loaded as a snapshot of its own and
    /// all its entries copied over; anything else is parsed as a manifest.
    /// Later sources overwrite earlier ones for the same path.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails or a source cannot be read or
    /// parsed.
    pub fn import_all(&self, snapshot: &mut Snapshot, dir: &Path) -> Result<ImportReport> {
        let span = span!(Level::DEBUG, "import", dir = %dir.display());
        let _guard = span.enter();

        let mut report = ImportReport::default();
        for source in self.find_sources(dir)? {
            let is_database = source
                .file_name()
                .is_some_and(|name| name == self.store.db_filename());
            let count = if is_database {
                let nested = self.store.load_file(&source)?;
                let count = nested.len();
                snapshot.extend(nested);
                count
            } else {
                import_manifest(snapshot, &source, self.store.hasher().algorithm())?
            };
            info!(source = %source.display(), count, "Imported");
            report.sources.push((source, count));
        }
        Ok(report)
    }
}

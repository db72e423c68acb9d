//! Update, status and verify passes over a snapshot.
//!
//! `update` is the two-phase pass: a metadata scan picks out candidates, then
//! only those candidates (and newly added files) are hashed. A candidate is
//! reported as modified only when its digest actually changed; metadata-only
//! drift is absorbed silently, since some filesystems (vfat in particular)
//! report unstable timestamps.
//!
//! `verify` skips the metadata shortcut and re-hashes every tracked entry.

use crate::error::{HashDbError, Result};
use crate::output;
use crate::scanner::ChangeDetector;
use crate::storage::{Entry, LiveMetadata, Snapshot};
use crate::utils::hash::Hasher;
use crate::utils::thread_pool::run_in_pool;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use tracing::{Level, debug, info, span};

/// Entries hashed between progress bar redraws.
const PROGRESS_CHUNK: usize = 64;

/// Paths classified by one pass. The three sets are disjoint.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub added: BTreeSet<PathBuf>,
    pub removed: BTreeSet<PathBuf>,
    pub modified: BTreeSet<PathBuf>,
}

impl DiffResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Options for [`Reconciler::verify`].
#[derive(Debug, Default, Clone, Copy)]
pub struct VerifyOptions {
    /// Print each failure as soon as it is found, before the summary
    pub report_each: bool,
}

/// Result of an exhaustive content check.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VerifyReport {
    /// Tracked paths whose content no longer matches the stored digest
    pub modified: BTreeSet<PathBuf>,
    /// Tracked paths that no longer exist
    pub removed: BTreeSet<PathBuf>,
    /// Entries whose content verified but whose size, mtime or kind drifted,
    /// already restamped with live metadata. Not applied to the snapshot
    /// until [`VerifyReport::apply_refreshed`] is called.
    pub refreshed: Vec<Entry>,
}

impl VerifyReport {
    /// True if every tracked entry verified.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty() && self.removed.is_empty()
    }

    /// Writes the restamped metadata into `snapshot`. Returns how many
    /// entries were updated.
    pub fn apply_refreshed(&self, snapshot: &mut Snapshot) -> usize {
        let mut applied = 0;
        for entry in &self.refreshed {
            if snapshot.contains(&entry.path) {
                snapshot.insert(entry.clone());
                applied += 1;
            }
        }
        applied
    }
}

enum VerifyOutcome {
    Verified(Option<Entry>),
    Modified(PathBuf),
    Removed(PathBuf),
}

/// Drives the change detector and the hasher to reconcile a snapshot with
/// the live tree.
#[derive(Debug, Clone)]
pub struct Reconciler {
    detector: ChangeDetector,
    hasher: Hasher,
}

impl Reconciler {
    #[must_use]
    pub fn new(db_filename: impl Into<String>, hasher: Hasher) -> Self {
        Self {
            detector: ChangeDetector::new(db_filename),
            hasher,
        }
    }

    /// Read-only report of the metadata scan. `modified` holds every
    /// candidate, hashed or not, so it may include metadata-only drift.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails.
    pub fn status(&self, snapshot: &Snapshot) -> Result<DiffResult> {
        let scan = self.detector.scan(snapshot)?;
        Ok(DiffResult {
            added: scan.added.into_iter().map(|entry| entry.path).collect(),
            removed: scan.removed,
            modified: scan.candidates,
        })
    }

    /// Brings `snapshot` in line with the live tree and reports what changed.
    ///
    /// Added files are hashed and inserted, removed files dropped, and
    /// candidates re-hashed. Candidates whose digest is unchanged keep their
    /// place but get fresh metadata and are not reported.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails or a file cannot be read for a
    /// reason other than vanishing. The snapshot may then be partially
    /// updated and should not be saved.
    pub fn update(&self, snapshot: &mut Snapshot) -> Result<DiffResult> {
        let span = span!(Level::DEBUG, "update", root = %snapshot.root.display());
        let _guard = span.enter();

        let scan = self.detector.scan(snapshot)?;
        let mut diff = DiffResult::default();

        let mut added = scan.added;
        self.refresh_all("Hashing new entries", &mut added)?;
        for entry in added {
            diff.added.insert(entry.path.clone());
            snapshot.insert(entry);
        }

        for path in scan.removed {
            snapshot.remove(&path);
            diff.removed.insert(path);
        }

        let mut candidates: Vec<Entry> = scan
            .candidates
            .iter()
            .filter_map(|path| snapshot.get(path).cloned())
            .collect();
        let previous: Vec<Option<String>> =
            candidates.iter().map(|entry| entry.digest.clone()).collect();
        self.refresh_all("Hashing modified entries", &mut candidates)?;

        for (entry, old_digest) in candidates.into_iter().zip(previous) {
            if entry.digest == old_digest {
                debug!(path = %entry.path.display(), "Metadata changed, content did not");
            } else {
                diff.modified.insert(entry.path.clone());
            }
            snapshot.insert(entry);
        }

        info!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            modified = diff.modified.len(),
            "Update complete"
        );
        Ok(diff)
    }

    /// Re-hashes every tracked entry and compares it with its stored digest.
    ///
    /// Never adds untracked files and never touches `snapshot`; entries that
    /// verified with drifted metadata come back in
    /// [`VerifyReport::refreshed`] for the caller to apply or ignore.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read for a reason other than
    /// vanishing.
    pub fn verify(&self, snapshot: &Snapshot, options: VerifyOptions) -> Result<VerifyReport> {
        let span = span!(Level::DEBUG, "verify", root = %snapshot.root.display());
        let _guard = span.enter();

        let entries: Vec<&Entry> = snapshot.entries.values().collect();
        let mut report = VerifyReport::default();
        let mut progress = output::start_progress("Verifying", entries.len());
        let mut checked = 0;

        for chunk in entries.chunks(PROGRESS_CHUNK) {
            let outcomes = run_in_pool(|| {
                chunk
                    .par_iter()
                    .map(|entry| self.verify_entry(entry, options))
                    .collect::<Result<Vec<_>>>()
            })?;

            for outcome in outcomes {
                match outcome {
                    VerifyOutcome::Verified(Some(entry)) => report.refreshed.push(entry),
                    VerifyOutcome::Verified(None) => {}
                    VerifyOutcome::Modified(path) => {
                        report.modified.insert(path);
                    }
                    VerifyOutcome::Removed(path) => {
                        report.removed.insert(path);
                    }
                }
            }
            checked += chunk.len();
            progress.update(checked);
        }
        progress.finish();

        info!(
            checked,
            modified = report.modified.len(),
            removed = report.removed.len(),
            "Verify complete"
        );
        Ok(report)
    }

    fn verify_entry(&self, entry: &Entry, options: VerifyOptions) -> Result<VerifyOutcome> {
        let path = &entry.path;
        let live = match LiveMetadata::probe(path) {
            Ok(live) => live,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(self.removed(entry, options));
            }
            Err(e) => return Err(HashDbError::io(path, e)),
        };

        let Some(kind) = live.kind else {
            return Ok(self.removed(entry, options));
        };
        let Some(digest) = self
            .hasher
            .digest_kind(path, kind, live.size)
            .map_err(|e| HashDbError::io(path, e))?
        else {
            return Ok(self.removed(entry, options));
        };

        if entry.digest.as_deref() != Some(digest.as_str()) {
            if options.report_each {
                output::warning(&format!("{} failed hash verification", path.display()));
            }
            return Ok(VerifyOutcome::Modified(path.clone()));
        }

        if entry.matches_live_metadata(&live) {
            Ok(VerifyOutcome::Verified(None))
        } else {
            let mut refreshed = entry.clone();
            refreshed.stamp(&live);
            Ok(VerifyOutcome::Verified(Some(refreshed)))
        }
    }

    #[allow(clippy::unused_self)]
    fn removed(&self, entry: &Entry, options: VerifyOptions) -> VerifyOutcome {
        if options.report_each {
            output::warning(&format!("{} is missing", entry.path.display()));
        }
        VerifyOutcome::Removed(entry.path.clone())
    }

    /// Refreshes metadata and digest of every entry, in parallel.
    fn refresh_all(&self, title: &str, entries: &mut [Entry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let hasher = self.hasher;
        let mut progress = output::start_progress(title, entries.len());
        let mut done = 0;
        for chunk in entries.chunks_mut(PROGRESS_CHUNK) {
            let len = chunk.len();
            run_in_pool(|| {
                chunk.par_iter_mut().try_for_each(|entry| {
                    entry
                        .refresh(&hasher)
                        .map_err(|e| HashDbError::io(&entry.path, e))
                })
            })?;
            done += len;
            progress.update(done);
        }
        progress.finish();
        Ok(())
    }
}

//! Forward-only schema migrations for the persisted hash database.
//!
//! Schema history:
//! - 1: top-level `version` field added
//! - 2: per-entry `type` field added; symlinks hash their target string
//!
//! Each migration upgrades a record set from the version it is keyed by to
//! the next one. Migrations may read the live filesystem, not just reshape
//! data.

use super::{EntryKind, Snapshot};
use crate::error::{HashDbError, Result};
use crate::utils::hash::Hasher;
use tracing::{Level, debug, info, span};

/// Schema version written by this build.
pub const CURRENT_VERSION: u32 = 2;

/// Upgrades a record set by exactly one schema version.
pub type Migration = fn(&mut Snapshot, &Hasher) -> Result<()>;

/// `(from_version, migration)` pairs, ascending.
const MIGRATIONS: &[(u32, Migration)] = &[(1, backfill_entry_kinds)];

/// Looks up the migration that upgrades `from` to `from + 1`.
#[must_use]
pub fn migration_for(from: u32) -> Option<Migration> {
    MIGRATIONS
        .iter()
        .find(|(version, _)| *version == from)
        .map(|(_, migration)| *migration)
}

/// Brings `snapshot` from its stored version up to [`CURRENT_VERSION`].
///
/// Returns the number of migrations applied.
///
/// # Errors
///
/// Returns an error if:
/// - The stored version is newer than [`CURRENT_VERSION`]
/// - A version in between has no registered migration
/// - A migration fails to probe or hash the filesystem
pub fn migrate(snapshot: &mut Snapshot, hasher: &Hasher) -> Result<u32> {
    let stored = snapshot.version;
    if stored > CURRENT_VERSION {
        return Err(HashDbError::UnsupportedVersion {
            found: stored,
            current: CURRENT_VERSION,
        });
    }

    let span = span!(Level::DEBUG, "migrate", from = stored, to = CURRENT_VERSION);
    let _guard = span.enter();

    for version in stored..CURRENT_VERSION {
        let migration = migration_for(version).ok_or(HashDbError::MissingMigration(version))?;
        debug!(version, "Applying migration");
        migration(snapshot, hasher)?;
        snapshot.version = version + 1;
    }

    let applied = CURRENT_VERSION - stored;
    if applied > 0 {
        info!(applied, "Upgraded hash database schema");
    }
    Ok(applied)
}

/// 1 -> 2: fills in `kind` for entries that lack it and re-hashes every
/// symlink, whose version-1 digest was computed from the wrong bytes.
fn backfill_entry_kinds(snapshot: &mut Snapshot, hasher: &Hasher) -> Result<()> {
    for entry in snapshot.entries.values_mut() {
        if entry.kind.is_some() {
            continue;
        }
        entry.probe_kind();
        if entry.kind == Some(EntryKind::Symlink) {
            debug!(path = %entry.path.display(), "Re-hashing symlink");
            entry
                .refresh(hasher)
                .map_err(|e| HashDbError::io(&entry.path, e))?;
        }
    }
    Ok(())
}

//! One module per `hash-db` subcommand.
//!
//! Every `execute` takes a [`HashDbContext`] and prints its own report.
//! Commands that write honour [`HashDbContext::dry_run`].

pub mod export;
pub mod import;
pub mod init;
pub mod split;
pub mod status;
pub mod update;
pub mod verify;

use crate::HashDbContext;
use crate::output;
use crate::storage::{Snapshot, SnapshotStore};
use anyhow::{Context, Result};

/// Saves `snapshot` unless this is a dry run.
fn persist(ctx: &HashDbContext, store: &SnapshotStore, snapshot: &Snapshot) -> Result<()> {
    if ctx.dry_run {
        output::info("Dry run, hash database not written");
        return Ok(());
    }
    let path = store
        .save(snapshot)
        .context("Failed to save hash database")?;
    output::verbose(&format!("Wrote {}", path.display()));
    Ok(())
}

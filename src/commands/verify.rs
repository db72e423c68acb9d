use crate::HashDbContext;
use crate::output;
use crate::reconcile::VerifyOptions;
use anyhow::{Context, Result};
use std::collections::BTreeSet;

/// Re-hashes every tracked entry and lists the ones that no longer match.
///
/// With `update_mtimes`, entries whose content verified but whose metadata
/// drifted are restamped and the database saved (unless dry run).
///
/// # Errors
///
/// Returns an error if no database is found, a file cannot be read, or the
/// database cannot be written.
pub fn execute(ctx: &HashDbContext, verbose_failures: bool, update_mtimes: bool) -> Result<()> {
    let store = ctx.store();
    let mut snapshot = store.load(&ctx.work_dir)?;

    let report = ctx
        .reconciler()
        .verify(
            &snapshot,
            VerifyOptions {
                report_each: verbose_failures,
            },
        )
        .context("Failed to verify hash database")?;

    output::print_file_lists(
        &snapshot.root,
        &BTreeSet::new(),
        &report.removed,
        &report.modified,
    );
    if report.is_clean() {
        output::success(&format!("All {} entries verified", snapshot.len()));
    }

    if update_mtimes && !report.refreshed.is_empty() {
        let applied = report.apply_refreshed(&mut snapshot);
        output::info(&format!("Updated metadata for {applied} entries"));
        super::persist(ctx, &store, &snapshot)?;
    }
    Ok(())
}

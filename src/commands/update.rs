use crate::HashDbContext;
use crate::output;
use anyhow::{Context, Result};

/// Reconciles the governing database with the tree and saves it.
///
/// Prints the change lists with `--verbose`, a one-line summary otherwise.
///
/// # Errors
///
/// Returns an error if no database is found, the tree cannot be hashed, or
/// the database cannot be written.
pub fn execute(ctx: &HashDbContext) -> Result<()> {
    let store = ctx.store();
    let mut snapshot = store.load(&ctx.work_dir)?;

    output::info("Updating hash database");
    let diff = ctx
        .reconciler()
        .update(&mut snapshot)
        .context("Failed to update hash database")?;

    if output::get_verbosity() == output::Verbosity::Verbose {
        output::print_file_lists(&snapshot.root, &diff.added, &diff.removed, &diff.modified);
    }
    output::info(&format!(
        "{} added, {} removed, {} modified",
        diff.added.len(),
        diff.removed.len(),
        diff.modified.len()
    ));

    super::persist(ctx, &store, &snapshot)
}

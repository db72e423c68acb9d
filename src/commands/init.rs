use crate::HashDbContext;
use crate::output;
use anyhow::{Context, Result};

/// Creates a hash database for the working directory and hashes everything
/// under it.
///
/// # Errors
///
/// Returns an error if:
/// - The working directory already holds a database
/// - The tree cannot be scanned or a file cannot be read
/// - The database cannot be written
pub fn execute(ctx: &HashDbContext) -> Result<()> {
    let store = ctx.store();
    let mut snapshot = store.create(&ctx.work_dir)?;

    output::info("Initializing hash database");
    let diff = ctx
        .reconciler()
        .update(&mut snapshot)
        .context("Failed to hash directory tree")?;

    if output::get_verbosity() == output::Verbosity::Verbose {
        output::print_file_lists(&snapshot.root, &diff.added, &diff.removed, &diff.modified);
    }

    super::persist(ctx, &store, &snapshot)?;
    output::success(&format!(
        "Initialized hash database with {} entries at {}",
        snapshot.len(),
        store.db_path(&snapshot).display()
    ));
    Ok(())
}

use crate::HashDbContext;
use crate::output;
use anyhow::Result;

/// Prints what a metadata scan sees, without hashing or writing anything.
///
/// "Modified" here means size, mtime or kind changed; `update` decides
/// whether the content did.
///
/// # Errors
///
/// Returns an error if no database is found or the tree cannot be scanned.
pub fn execute(ctx: &HashDbContext) -> Result<()> {
    let snapshot = ctx.store().load(&ctx.work_dir)?;
    let diff = ctx.reconciler().status(&snapshot)?;

    if diff.is_empty() {
        output::info("No changes detected");
        return Ok(());
    }
    output::print_file_lists(&snapshot.root, &diff.added, &diff.removed, &diff.modified);
    Ok(())
}

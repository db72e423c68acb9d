use crate::HashDbContext;
use crate::interop::manifest;
use crate::output;
use anyhow::Result;

/// Writes the governing database as `<root>/SHA512SUM`.
///
/// # Errors
///
/// Returns an error if no database is found or the manifest cannot be
/// written.
pub fn execute(ctx: &HashDbContext) -> Result<()> {
    let snapshot = ctx.store().load(&ctx.work_dir)?;
    let algorithm = ctx.hasher().algorithm();

    if ctx.dry_run {
        let (_, count) = manifest::render_manifest(&snapshot);
        output::info(&format!(
            "Would export {count} entries to {}",
            manifest::manifest_path(&snapshot, algorithm).display()
        ));
        return Ok(());
    }

    let (path, count) = manifest::export_manifest(&snapshot, algorithm)?;
    output::success(&format!("Exported {count} entries to {}", path.display()));
    Ok(())
}

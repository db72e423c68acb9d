use crate::HashDbContext;
use crate::interop;
use crate::output;
use crate::utils::paths;
use anyhow::Result;
use std::path::Path;

/// Writes the entries under `subdir` into `<subdir>/<db_filename>`.
///
/// # Errors
///
/// Returns an error if no database is found, `subdir` is not a directory, or
/// the new database cannot be written.
pub fn execute(ctx: &HashDbContext, subdir: &Path) -> Result<()> {
    let store = ctx.store();
    let snapshot = store.load(&ctx.work_dir)?;
    let subdir = paths::normalize_lexically(&ctx.work_dir.join(subdir));

    let extracted = interop::split(&snapshot, &subdir)?;
    super::persist(ctx, &store, &extracted)?;
    output::success(&format!(
        "Wrote {} hash entries to {}",
        extracted.len(),
        store.db_path(&extracted).display()
    ));
    Ok(())
}

use crate::HashDbContext;
use crate::interop::Importer;
use crate::output;
use anyhow::Result;

/// Merges every checksum manifest and nested database found below the
/// working directory into the governing database, creating one if needed.
///
/// # Errors
///
/// Returns an error if a source cannot be read or parsed, or the database
/// cannot be written.
pub fn execute(ctx: &HashDbContext) -> Result<()> {
    let store = ctx.store();
    let mut snapshot = store.load_or_new(&ctx.work_dir)?;
    let importer = Importer::new(&store, &ctx.import_patterns())?;

    output::info("Importing hashes");
    let report = importer.import_all(&mut snapshot, &ctx.work_dir)?;
    for (source, count) in &report.sources {
        println!("Imported {count} entries from {}", source.display());
    }
    println!("Imported {} total entries", report.total());

    super::persist(ctx, &store, &snapshot)
}

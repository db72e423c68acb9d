//! xtask for hash-db: build automation and tooling

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for hash-db")]
enum Task {
    /// Generate man pages from the CLI definitions
    GenerateManPages {
        /// Output directory for man pages
        #[arg(short, long, default_value = "man")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    match Task::parse() {
        Task::GenerateManPages { output } => generate_man_pages(&output)?,
    }
    Ok(())
}

fn render(cmd: clap::Command, path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create man page: {}", path.display()))?;
    clap_mangen::Man::new(cmd).render(&mut std::io::BufWriter::new(file))?;
    println!("Generated: {}", path.display());
    Ok(())
}

fn generate_man_pages(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

    let cmd = hashdb::cli::Cli::command();
    let name = cmd.get_name().to_string();
    render(cmd.clone(), &output_dir.join(format!("{name}.1")))?;

    // One page per subcommand, e.g. hash-db-verify(1).
    for sub in cmd.get_subcommands().filter(|s| s.get_name() != "completion") {
        render(sub.clone(), &output_dir.join(format!("{name}-{}.1", sub.get_name())))?;
    }

    println!("\nMan pages generated in: {}", output_dir.display());
    println!("  man {}/{name}.1", output_dir.display());
    Ok(())
}

//! Command-line interface definitions for `hash-db`.
//!
//! Shared between the binary and the `xtask` man page generator.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for hash-db.
#[derive(Parser, Debug)]
#[command(
    name = "hash-db",
    version = crate::VERSION,
    about = "Track the integrity of a directory tree with content hashes",
    long_about = "Records a SHA-512 digest, size and mtime for every file and symlink under a \
                  directory, then reports files that were added, removed or whose content changed"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Compute everything but write nothing
    #[arg(short = 'n', long, global = true, alias = "dry-run")]
    pub pretend: bool,

    /// Print per-file lists and debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Name of the hash database file
    #[arg(
        short,
        long,
        global = true,
        env = "HASH_DB_DEFAULT_FILE",
        value_name = "FILENAME"
    )]
    pub jsondb: Option<String>,
}

/// All available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a hash database for the current directory
    Init,

    /// Hash new and changed files and record the result
    Update,

    /// Show files that look added, removed or changed, without hashing
    Status,

    /// Merge checksum manifests and nested databases found below the current directory
    Import,

    /// Re-hash every tracked file and report mismatches
    Verify {
        /// Print each failure as soon as it is found
        #[arg(long)]
        verbose_failures: bool,

        /// Record the current mtime of files whose content verified
        #[arg(long)]
        update_mtimes: bool,
    },

    /// Write the entries under SUBDIR into a database of their own
    Split {
        /// Directory to extract
        subdir: PathBuf,
    },

    /// Write a SHA512SUM manifest usable with `sha512sum -c`
    Export,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["hash-db", "verify", "-n", "--update-mtimes", "-j", "db.json"])
            .expect("valid arguments");
        assert!(cli.pretend);
        assert_eq!(cli.jsondb.as_deref(), Some("db.json"));
        assert!(matches!(
            cli.command,
            Commands::Verify {
                update_mtimes: true,
                verbose_failures: false
            }
        ));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["hash-db", "-v", "-q", "status"]).is_err());
    }
}

#![allow(clippy::float_arithmetic)] // mtimes are stored as fractional seconds

//! # hashdb - directory integrity tracking
//!
//! `hashdb` keeps a JSON database of content digests for every regular file
//! and symlink under a directory, and reconciles it against the live tree to
//! report what was added, removed or modified.
//!
//! Change detection is two-phase: a cheap `lstat` comparison of size, mtime
//! and kind picks candidates, and only candidates are re-hashed. A file whose
//! timestamp moved but whose content did not is quietly restamped rather than
//! reported. `verify` skips the shortcut and re-hashes everything.
//!
//! ## Architecture
//!
//! - [`storage`]: the entry model, snapshots, persistence and schema migrations
//! - [`scanner`]: metadata-only change detection
//! - [`reconcile`]: `update`, `status` and `verify`
//! - [`interop`]: `sha512sum` manifests and subtree extraction
//! - [`config`]: TOML configuration
//! - [`commands`]: one module per CLI subcommand
//! - [`output`]: terminal reporting and progress
//! - [`utils`]: hashing, paths, serialization and the worker pool
//!
//! ## Example
//!
//! ```no_run
//! use hashdb::HashDbContext;
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = HashDbContext::new(None, false)?;
//! let store = ctx.store();
//! let mut snapshot = store.load(&ctx.work_dir)?;
//! let diff = ctx.reconciler().update(&mut snapshot)?;
//! println!("{} modified", diff.modified.len());
//! store.save(&snapshot)?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod interop;
pub mod output;
pub mod reconcile;
pub mod scanner;
pub mod storage;
pub mod utils;

pub use error::{HashDbError, Result};

use anyhow::Context;
use std::path::PathBuf;

/// Current version of the hash-db binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a command needs: resolved configuration and where to work.
#[derive(Debug, Clone)]
pub struct HashDbContext {
    pub config: config::Config,

    /// Config file that was read, if any
    pub config_path: Option<PathBuf>,

    /// Absolute, normalized directory commands start from
    pub work_dir: PathBuf,

    /// Compute but do not write
    pub dry_run: bool,
}

impl HashDbContext {
    /// Loads the configuration from [`config::Config::default_path`] and
    /// works from the current directory.
    ///
    /// `db_filename`, when given, overrides `[core] db_filename`. The worker
    /// pool is sized from `[performance] parallel_threads`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined or the
    /// configuration is invalid.
    pub fn new(db_filename: Option<String>, dry_run: bool) -> anyhow::Result<Self> {
        let config_path = config::Config::default_path();
        let config = match &config_path {
            Some(path) => config::Config::load(path)?,
            None => config::Config::default(),
        };
        let work_dir = std::env::current_dir().context("Could not determine current directory")?;

        let context = Self::new_explicit(work_dir, config, db_filename, dry_run)?;

        if let Err(e) = utils::thread_pool::configure_from_config(&context.config) {
            tracing::warn!(error = %e, "Failed to configure thread pool");
        }

        Ok(Self {
            config_path,
            ..context
        })
    }

    /// Builds a context from explicit parts, without touching the
    /// environment or the global worker pool.
    ///
    /// # Errors
    ///
    /// Returns an error if `work_dir` cannot be made absolute or the
    /// resulting configuration fails validation.
    pub fn new_explicit(
        work_dir: PathBuf,
        mut config: config::Config,
        db_filename: Option<String>,
        dry_run: bool,
    ) -> anyhow::Result<Self> {
        if let Some(name) = db_filename {
            config.core.db_filename = name;
        }
        config::parser::validate_config(&config)?;

        Ok(Self {
            config,
            config_path: None,
            work_dir: utils::paths::normalize(&work_dir)?,
            dry_run,
        })
    }

    #[must_use]
    pub fn db_filename(&self) -> &str {
        &self.config.core.db_filename
    }

    #[must_use]
    pub const fn hasher(&self) -> utils::hash::Hasher {
        self.config.hasher()
    }

    #[must_use]
    pub fn store(&self) -> storage::SnapshotStore {
        storage::SnapshotStore::new(self.db_filename(), self.hasher())
    }

    #[must_use]
    pub fn reconciler(&self) -> reconcile::Reconciler {
        reconcile::Reconciler::new(self.db_filename(), self.hasher())
    }

    /// File-name patterns `import` looks for.
    #[must_use]
    pub fn import_patterns(&self) -> Vec<String> {
        self.config.import_patterns(self.db_filename())
    }
}

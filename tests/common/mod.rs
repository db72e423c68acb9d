#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use filetime::FileTime;
use hashdb::HashDbContext;
use hashdb::config::Config;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory tree with its own (absent) config file.
///
/// The tree lives in `<temp>/tree` so the config path and anything else the
/// test needs can sit next to it without being scanned.
pub struct TestTree {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestTree {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().canonicalize()?.join("tree");
        fs::create_dir(&root)?;
        Ok(Self { temp_dir, root })
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Writes `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    #[cfg(unix)]
    pub fn symlink(&self, target: &str, relative: &str) -> Result<PathBuf> {
        let path = self.path(relative);
        std::os::unix::fs::symlink(target, &path)?;
        Ok(path)
    }

    pub fn set_mtime(&self, relative: &str, secs: i64) -> Result<()> {
        filetime::set_file_mtime(self.path(relative), FileTime::from_unix_time(secs, 0))?;
        Ok(())
    }

    /// Where a test may write a config file.
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("config.toml")
    }

    pub fn ctx(&self) -> Result<HashDbContext> {
        HashDbContext::new_explicit(self.root.clone(), Config::default(), None, false)
    }

    /// `hash-db` running in the tree with a clean environment.
    pub fn cmd(&self) -> Result<Command> {
        self.cmd_in(&self.root)
    }

    pub fn cmd_in(&self, dir: &Path) -> Result<Command> {
        let mut cmd = Command::cargo_bin("hash-db")?;
        cmd.current_dir(dir)
            .env("HASH_DB_CONFIG_PATH", self.config_path())
            .env("NO_COLOR", "1")
            .env_remove("HASH_DB_DEFAULT_FILE")
            .env_remove("HASH_DB_LOG");
        Ok(cmd)
    }
}

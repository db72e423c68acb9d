pub mod parser;
pub mod validator;

use crate::utils::hash::{DEFAULT_MMAP_THRESHOLD, DigestAlgorithm, Hasher};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "HASH_DB_CONFIG_PATH";

/// Database filename used when nothing else is configured
pub const DEFAULT_DB_FILENAME: &str = "hash_db.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    /// Foreign manifest discovery for `import`
    #[serde(default)]
    pub import: ImportConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoreConfig {
    #[serde(default = "default_db_filename")]
    pub db_filename: String,
    #[serde(default)]
    pub algorithm: DigestAlgorithm,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ImportConfig {
    /// Glob patterns matched against file names. Empty means the defaults
    /// from [`Config::import_patterns`].
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerformanceConfig {
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,
    /// Files at least this large are memory-mapped for hashing
    #[serde(default = "default_mmap_threshold")]
    pub mmap_threshold: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_filename: default_db_filename(),
            algorithm: DigestAlgorithm::default(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            mmap_threshold: default_mmap_threshold(),
        }
    }
}

impl Config {
    /// Location of the config file: `$HASH_DB_CONFIG_PATH`, else
    /// `<config dir>/hash-db/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("hash-db").join("config.toml"))
    }

    /// Load configuration from a file. A missing file yields the defaults.
    ///
    /// Unknown keys are reported on stderr but do not fail the load.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file exists but cannot be read
    /// - It contains invalid TOML or values of the wrong type
    /// - A value fails validation
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config = parser::parse_config_file(path)?;
        validator::ConfigValidator::new().validate_config_file(path)?;
        Ok(config)
    }

    /// Load from [`Config::default_path`], or defaults if there is none.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration as pretty TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// The file-name patterns `import` searches for.
    ///
    /// Configured patterns win. Otherwise: the database file itself, the
    /// algorithm's manifest (plain and `.asc`), any `*.<algo>sum` file (plain
    /// and `.asc`), and `DIGESTS` (plain and `.asc`).
    #[must_use]
    pub fn import_patterns(&self, db_filename: &str) -> Vec<String> {
        if !self.import.patterns.is_empty() {
            return self.import.patterns.clone();
        }

        let manifest = self.core.algorithm.manifest_filename();
        let extension = self.core.algorithm.manifest_extension();
        vec![
            glob::Pattern::escape(db_filename),
            manifest.to_string(),
            format!("{manifest}.asc"),
            format!("*.{extension}"),
            format!("*.{extension}.asc"),
            "DIGESTS".to_string(),
            "DIGESTS.asc".to_string(),
        ]
    }

    /// A hasher built from `[core] algorithm` and `[performance] mmap_threshold`.
    #[must_use]
    pub const fn hasher(&self) -> Hasher {
        Hasher::new(self.core.algorithm, self.performance.mmap_threshold)
    }
}

fn default_db_filename() -> String {
    DEFAULT_DB_FILENAME.to_string()
}

fn default_parallel_threads() -> usize {
    std::thread::available_parallelism()
        .map_or(1, std::num::NonZeroUsize::get)
        .min(8)
}

const fn default_mmap_threshold() -> u64 {
    DEFAULT_MMAP_THRESHOLD
}

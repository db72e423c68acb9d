use super::Config;
use anyhow::{Context, Result};
use std::path::Path;

/// Reads, parses and validates a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML for
/// [`Config`], or fails [`validate_config`].
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Parses and validates config TOML.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or a value is rejected.
pub fn parse_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse TOML config")?;
    validate_config(&config)?;
    Ok(config)
}

/// Rejects values no command could work with.
///
/// # Errors
///
/// Returns an error if:
/// - `core.db_filename` is empty, `.`/`..`, or contains a path separator
/// - `performance.parallel_threads` is zero
/// - An `import.patterns` entry is not a valid glob
pub fn validate_config(config: &Config) -> Result<()> {
    let name = config.core.db_filename.as_str();
    if name.is_empty() || name == "." || name == ".." {
        anyhow::bail!("core.db_filename must name a file, got {name:?}");
    }
    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        anyhow::bail!("core.db_filename must be a bare file name, got {name:?}");
    }

    if config.performance.parallel_threads == 0 {
        anyhow::bail!("performance.parallel_threads must be at least 1");
    }

    for pattern in &config.import.patterns {
        glob::Pattern::new(pattern)
            .with_context(|| format!("Invalid import pattern: {pattern:?}"))?;
    }

    Ok(())
}

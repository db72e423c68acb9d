use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::HashSet;
use std::path::Path;

/// Flags config keys that `hash-db` does not recognize.
///
/// Unknown keys are usually typos; they are reported but never fatal, so a
/// config written for a newer version still loads.
pub struct ConfigValidator {
    known_fields: HashSet<&'static str>,
    known_sections: HashSet<&'static str>,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    #[must_use]
    pub fn new() -> Self {
        let known_fields = HashSet::from([
            "core.db_filename",
            "core.algorithm",
            "import.patterns",
            "performance.parallel_threads",
            "performance.mmap_threshold",
        ]);
        let known_sections = HashSet::from(["core", "import", "performance"]);

        Self {
            known_fields,
            known_sections,
        }
    }

    /// Dotted paths of every unknown key in `content`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not valid TOML.
    pub fn unknown_fields(&self, content: &str) -> Result<Vec<String>> {
        let parsed: toml::Table = toml::from_str(content).context("Failed to parse TOML config")?;

        let mut unknown = Vec::new();
        for (section, value) in &parsed {
            if !self.known_sections.contains(section.as_str()) {
                unknown.push(section.clone());
                continue;
            }
            let Some(table) = value.as_table() else {
                unknown.push(section.clone());
                continue;
            };
            for key in table.keys() {
                let full_key = format!("{section}.{key}");
                if !self.known_fields.contains(full_key.as_str()) {
                    unknown.push(full_key);
                }
            }
        }
        Ok(unknown)
    }

    /// Prints a warning block for unknown keys in the file at `config_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn validate_config_file(&self, config_path: &Path) -> Result<()> {
        if !config_path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        let unknown = self.unknown_fields(&content)?;

        if !unknown.is_empty() {
            tracing::warn!(path = %config_path.display(), count = unknown.len(), "Unknown config keys");
            eprintln!("{}", "Configuration warnings:".yellow().bold());
            for field in &unknown {
                eprintln!("  Unknown configuration field: {}", field.yellow());
            }
            eprintln!();
        }

        Ok(())
    }
}

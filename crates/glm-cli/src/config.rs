//! CLI configuration, read from ~/.glm/config/glm.toml

use anyhow::{anyhow, Context, Result};
use glm_core::WriteOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GlmConfig {
    /// Defaults for every command that writes GLM
    #[serde(default)]
    pub output: WriteOptions,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GlmConfig {
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .parse()
            .map_err(|_| anyhow!("invalid log level '{}' in config", self.logging.level))
    }
}

/// ~/.glm
pub fn glm_home() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Cannot determine home directory"))
        .map(|h| h.join(".glm"))
}

/// Location: ~/.glm/config/glm.toml
pub fn config_path() -> Result<PathBuf> {
    Ok(glm_home()?.join("config").join("glm.toml"))
}

/// Load from `path`, or the default location. A missing file yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<GlmConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };
    if !path.exists() {
        return Ok(GlmConfig::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(config: &GlmConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("nope.toml"))).unwrap();
        assert!(config.output.indent);
        assert!(!config.output.sorted);
        assert_eq!(config.log_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn partial_file_fills_in_the_rest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("glm.toml");
        std::fs::write(&path, "[output]\nsorted = true\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert!(config.output.sorted);
        assert!(config.output.indent);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("glm.toml");
        let mut config = GlmConfig::default();
        config.output.truncate_names = true;
        config.logging.level = "debug".into();
        save_config(&config, &path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert!(loaded.output.truncate_names);
        assert_eq!(loaded.log_level().unwrap(), tracing::Level::DEBUG);
    }

    #[test]
    fn bad_level_is_reported() {
        let mut config = GlmConfig::default();
        config.logging.level = "loud".into();
        assert!(config.log_level().is_err());
    }
}

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::paths::get_config_path;
use crate::services::ports::config::FrameworkConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_config(path: &Path) -> Result<FrameworkConfig, ConfigError> {
    let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads `path` (or the per-user config file when `None`), falling back to
/// defaults when it is missing or broken.
pub fn load_config_or_default(path: Option<&Path>) -> FrameworkConfig {
    let path = match path.map(Path::to_path_buf).or_else(get_config_path) {
        Some(path) => path,
        None => return FrameworkConfig::default(),
    };
    match load_config(&path) {
        Ok(config) => config,
        Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            FrameworkConfig::default()
        }
        Err(e) => {
            tracing::warn!(error = %e, "using default config");
            FrameworkConfig::default()
        }
    }
}

/// Writes the default config if none exists yet.
pub fn ensure_config_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    if !path.exists() {
        let content = serde_json::to_string_pretty(&FrameworkConfig::default())
            .unwrap_or_else(|_| "{}".to_string());
        std::fs::write(path, content)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../../tests/unit/services/adapters/settings.rs"]
mod tests;

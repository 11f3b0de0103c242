//! Configuration file resolution and loading
//!
//! Missing configuration never terminates the caller: an absent file yields
//! compiled defaults plus a warning. A file that exists but cannot be read or
//! parsed is reported as [`Error::ConfigRead`] or [`Error::ConfigParse`].

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "LITMETA_CONFIG";

/// Application directory name under the platform config dir
const APP_DIR: &str = "litmeta";

/// Logging section shared by every litmeta configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level directive (`RUST_LOG` takes precedence)
    pub level: String,
    /// Include module targets in log lines
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

/// Resolve the configuration file path
///
/// Priority order:
/// 1. Explicit path from the caller (highest priority)
/// 2. `LITMETA_CONFIG` environment variable
/// 3. `<platform config dir>/litmeta/config.toml`, if it exists
///
/// Returns `None` when no candidate is available; callers fall back to defaults.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: explicit argument
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: platform default, only if present
    default_config_path().filter(|path| path.exists())
}

/// Platform default configuration file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Load a TOML configuration, falling back to defaults when the file is absent
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        info!("No configuration file found, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!(
            path = %path.display(),
            "Configuration file not found, using compiled defaults"
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    info!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Resolve an API key from the environment, then from TOML
///
/// **Priority:** ENV → TOML. Blank values are ignored at every tier.
pub fn resolve_api_key(env_var: Option<&str>, toml_value: Option<&str>) -> Option<String> {
    let env_key = env_var.and_then(|name| std::env::var(name).ok());

    if let (Some(env), Some(toml)) = (env_key.as_deref(), toml_value) {
        if is_valid_key(env) && is_valid_key(toml) {
            warn!(
                env_var = env_var.unwrap_or_default(),
                "API key found in both environment and TOML. Using environment (higher priority)."
            );
        }
    }

    if let Some(key) = env_key.filter(|k| is_valid_key(k)) {
        return Some(key.trim().to_string());
    }

    toml_value
        .filter(|k| is_valid_key(k))
        .map(|k| k.trim().to_string())
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

//! Config file discovery and layered loading.
//!
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge the config file, if any
//! 3. Apply `LNDLINK_*` fallbacks for fields the file left unset
//! 4. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Name of the config file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Load configuration.
///
/// An explicit `path` must exist. Without one, the per-user default
/// location is tried and skipped if absent.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, or if the
/// result fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(path, &collect_env_vars())
}

/// [`load`] with an explicit environment snapshot.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env(path: Option<&Path>, env: &HashMap<String, String>) -> ConfigResult<Config> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let overlay = match path {
        Some(path) => Some(read_file(path)?),
        None => match default_config_path() {
            Some(path) => try_load_file(&path)?,
            None => None,
        },
    };

    if let Some(overlay) = &overlay {
        deep_merge(&mut merged, overlay);
    }

    let env_count = apply_env_fallbacks(&mut merged, overlay.as_ref(), env);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source: e,
        })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Per-user config file location, e.g. `~/.config/lndlink/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "lndlink")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_file(path, &content)
}

/// Try to load a file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    parse_file(path, &content).map(Some)
}

fn parse_file(path: &Path, content: &str) -> ConfigResult<toml::Value> {
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    let value = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    info!(path = %path.display(), "loaded config file");
    Ok(value)
}

/// Merge `overlay` into `base`; tables merge recursively, everything else
/// is replaced.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    },
                }
            }
        },
        (base, overlay) => *base = overlay.clone(),
    }
}

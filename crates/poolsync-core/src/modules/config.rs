//! Configuration loading.
//!
//! The config lives at `<data dir>/poolsync.json`. A missing file means
//! defaults; a present but invalid file is an error rather than a silent
//! fallback.

use std::fs;
use std::path::{Path, PathBuf};

use poolsync_types::models::AppConfig;
use validator::Validate;

use crate::error::{AppError, AppResult};

pub const CONFIG_FILE: &str = "poolsync.json";

const DATA_DIR_ENV: &str = "POOLSYNC_DATA_DIR";

/// Resolve the data directory, creating it if needed.
pub fn get_data_dir() -> AppResult<PathBuf> {
    let dir = match std::env::var(DATA_DIR_ENV) {
        Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
        _ => dirs::home_dir()
            .ok_or_else(|| AppError::Config("cannot determine home directory".to_string()))?
            .join(".poolsync"),
    };
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn default_config_path() -> AppResult<PathBuf> {
    Ok(get_data_dir()?.join(CONFIG_FILE))
}

/// Load, apply environment overrides, validate.
pub fn load_config_from(path: &Path) -> AppResult<AppConfig> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?
    } else {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        AppConfig::default()
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());

    config
        .validate()
        .map_err(|e| AppError::Config(format!("invalid configuration: {}", e)))?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &AppConfig) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

/// `POOLSYNC_PORT`, `POOLSYNC_GATEWAY_URL` and `POOLSYNC_REGISTRY_URL` take
/// precedence over the file.
pub fn apply_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(port) = lookup("POOLSYNC_PORT") {
        match port.trim().parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!(value = %port, "Ignoring invalid POOLSYNC_PORT"),
        }
    }
    if let Some(url) = lookup("POOLSYNC_GATEWAY_URL").filter(|u| !u.trim().is_empty()) {
        config.gateway.base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(url) = lookup("POOLSYNC_REGISTRY_URL").filter(|u| !u.trim().is_empty()) {
        config.registry.base_url = url.trim().trim_end_matches('/').to_string();
    }
}

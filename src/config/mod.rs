//! Configuration module for SearchGov-RS
//!
//! Handles loading settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

/// Environment variable naming an explicit settings file
pub const SETTINGS_PATH_VAR: &str = "SEARCHGOV_SETTINGS_PATH";

/// Load settings from the first file found, or fall back to defaults.
///
/// Lookup order: `$SEARCHGOV_SETTINGS_PATH`, `settings.yml`,
/// `config/settings.yml`, `/etc/searchgov/settings.yml` and the user's
/// config directory. Environment overrides are applied last.
pub fn load() -> Result<Settings> {
    let mut settings = match settings_path() {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::from_file(&path)?
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };
    settings.merge_env();
    Ok(settings)
}

fn settings_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(SETTINGS_PATH_VAR) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let mut candidates = vec![
        PathBuf::from("settings.yml"),
        PathBuf::from("config/settings.yml"),
        PathBuf::from("/etc/searchgov/settings.yml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("searchgov-rs/settings.yml"));
    }

    candidates.into_iter().find(|p| p.exists())
}

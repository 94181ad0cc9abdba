use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::settings::Settings;

/// Name of the optional settings file inside the data directory
pub const SETTINGS_FILE: &str = "keyguide.toml";

/// Environment variable that overrides the data directory
pub const DATA_DIR_ENV: &str = "KEYGUIDE_DIR";

/// Error type for settings loading
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read keyguide.toml from the data directory. A missing file gives defaults.
pub fn read_settings(data_dir: &Path) -> Result<Settings, SettingsError> {
    let path = data_dir.join(SETTINGS_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Settings::default()),
        Err(source) => return Err(SettingsError::ReadError { path, source }),
    };
    toml::from_str(&text).map_err(|source| SettingsError::ParseError { path, source })
}

/// Resolve the data directory: explicit flag, then `KEYGUIDE_DIR`, then
/// `$XDG_DATA_HOME/keyguide`, then `~/.local/share/keyguide`.
pub fn resolve_data_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit.map(str::trim).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    let data_home = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local").join("share"));
    data_home.join("keyguide")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

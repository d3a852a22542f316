/// Application settings loaded from `settings.json` in the user's config dir.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that points at an alternative settings file
pub const CONFIG_ENV: &str = "IMAGE_DOWNLOADER_CONFIG";

/// Which storage backend `persist` writes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Media store when a home directory exists, otherwise direct file path
    #[default]
    Auto,
    MediaStore,
    DirectFile,
}

/// User settings
///
/// Every field has a default, so a partial (or missing) file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage_mode: StorageMode,
    /// Directory, relative to the media root, that new entries are registered under
    pub relative_path: String,
    /// Overrides the public pictures directory used by the direct file path
    pub pictures_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Ask before writing into the pictures folder
    pub ask_permission: bool,
    /// How long toasts stay on screen
    pub toast_millis: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_mode: StorageMode::Auto,
            relative_path: "Pictures".to_string(),
            pictures_dir: None,
            request_timeout_secs: 30,
            user_agent: format!("image-downloader/{}", env!("CARGO_PKG_VERSION")),
            ask_permission: true,
            toast_millis: 2000,
        }
    }
}

impl Settings {
    /// Load settings from the default location.
    ///
    /// A missing file yields defaults; a malformed one is logged and ignored.
    pub fn load() -> Self {
        let Some(path) = settings_path() else {
            tracing::debug!("no config directory, using default settings");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(Some(settings)) => {
                tracing::info!("loaded settings from {}", path.display());
                settings
            }
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("ignoring settings at {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Read a settings file. Returns `Ok(None)` when it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings = Self::from_json(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(settings))
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// `$IMAGE_DOWNLOADER_CONFIG`, or `<config_dir>/image-downloader/settings.json`
pub fn settings_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    let mut path = dirs::config_dir()?;
    path.push("image-downloader");
    path.push("settings.json");
    Some(path)
}

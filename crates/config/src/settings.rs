// User settings
// Loaded from ~/.config/vsrcheck/settings.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use vsrcheck_recon::ReconConfig;

use crate::error::ConfigError;

/// Overrides the settings file location.
pub const ENV_SETTINGS: &str = "VSRCHECK_SETTINGS";
/// Overrides `reference`.
pub const ENV_REFERENCE: &str = "VSRCHECK_REFERENCE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Reference table used when `--reference` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<PathBuf>,

    /// Workbook sheet holding the reference table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_sheet: Option<String>,

    /// Directory that relative `--csv`/`--xlsx`/`--output` paths resolve against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,

    /// Engine configuration, same shape as a standalone `--config` file.
    pub recon: ReconConfig,
}

impl Settings {
    /// Default settings file path.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vsrcheck")
            .join("settings.toml")
    }

    /// Settings path after applying `VSRCHECK_SETTINGS`.
    pub fn resolved_path() -> PathBuf {
        std::env::var_os(ENV_SETTINGS)
            .map(PathBuf::from)
            .unwrap_or_else(Self::config_path)
    }

    /// Load settings from disk and apply environment overrides.
    /// A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Self::load_from(&Self::resolved_path())?;
        Ok(settings.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        settings.recon.validate()?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Apply environment overrides through `lookup`. Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(reference) = lookup(ENV_REFERENCE).filter(|v| !v.trim().is_empty()) {
            self.reference = Some(PathBuf::from(reference));
        }
        self
    }

    /// Resolve an output path against `export_dir`. Absolute paths pass through.
    pub fn export_path(&self, path: &Path) -> PathBuf {
        match &self.export_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Save settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

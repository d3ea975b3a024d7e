//! Persisted settings: active ruleset, mission pool and spin history.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use roulette_schema::SerializedSpin;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ruleset::Ruleset;

pub const DEFAULT_SETTINGS_FILE: &str = "roulette_settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouletteSettings {
    pub ruleset: Ruleset,
    pub mission_pool: Vec<String>,
    pub spin_history: Vec<SerializedSpin>,
    pub history_enabled: bool,
    pub distinct_conditions: bool,
    pub auto_spin: bool,
    /// Spin that was active on save.
    pub current_spin: Option<SerializedSpin>,
}

impl Default for RouletteSettings {
    fn default() -> Self {
        Self {
            ruleset: Ruleset::default(),
            mission_pool: Vec::new(),
            spin_history: Vec::new(),
            history_enabled: true,
            distinct_conditions: false,
            auto_spin: false,
            current_spin: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read settings from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write settings to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RouletteSettings {
    pub fn from_json_str(input: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json_string(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Settings file location plus load/save with fallback.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `ROULETTE_SETTINGS_PATH`, else the default file in the working
    /// directory.
    pub fn from_env() -> Self {
        let path = env::var("ROULETTE_SETTINGS_PATH")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn try_load(&self) -> Result<RouletteSettings, SettingsError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| SettingsError::Read {
            path: self.path.clone(),
            source,
        })?;
        RouletteSettings::from_json_str(&contents)
    }

    /// Load settings; a missing or unreadable file yields the defaults.
    pub fn load(&self) -> RouletteSettings {
        match self.try_load() {
            Ok(settings) => {
                tracing::info!(
                    target: "roulette::settings",
                    path = %self.path.display(),
                    history = settings.spin_history.len(),
                    "settings.loaded=file"
                );
                settings
            }
            Err(SettingsError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                tracing::info!(
                    target: "roulette::settings",
                    path = %self.path.display(),
                    "settings.loaded=default"
                );
                RouletteSettings::default()
            }
            Err(err) => {
                tracing::warn!(
                    target: "roulette::settings",
                    path = %self.path.display(),
                    error = %err,
                    "settings.load_failed"
                );
                RouletteSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &RouletteSettings) -> Result<(), SettingsError> {
        let json = settings.to_json_string()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, json).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(
            target: "roulette::settings",
            path = %self.path.display(),
            "settings.saved"
        );
        Ok(())
    }
}

//! Settings for the dependency loader.
//!
//! Settings are read from `~/.scriptdeps/config.toml` (or
//! `%LOCALAPPDATA%\scriptdeps\config.toml` on Windows). A missing file yields the
//! defaults. Environment variables override the file:
//!
//! - `SCRIPTDEPS_AUTO_RELOAD` - store changed dependencies without asking
//! - `SCRIPTDEPS_HEADLESS` - test/headless mode
//! - `SCRIPTDEPS_NO_PROGRESS` - hide the background spinner
//!
//! # Example
//!
//! ```toml
//! auto_reload = true
//! show_progress = false
//! cache_path = "/var/cache/scriptdeps/dependencies.json"
//! ```

use crate::core::ScriptDepsError;
use crate::utils::progress::NO_PROGRESS_ENV;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable enabling auto-reload.
pub const AUTO_RELOAD_ENV: &str = "SCRIPTDEPS_AUTO_RELOAD";
/// Environment variable enabling headless mode.
pub const HEADLESS_ENV: &str = "SCRIPTDEPS_HEADLESS";

const fn default_true() -> bool {
    true
}

/// User-level settings for script dependency loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptingSettings {
    /// Store changed dependencies immediately instead of offering a notification.
    ///
    /// Only affects loaders for background resolvers; sync loaders never offer.
    #[serde(default)]
    pub auto_reload: bool,

    /// Test/headless mode.
    ///
    /// Notifications are never offered and roots-changed mutations run inline on the
    /// first safe opportunity instead of being deferred to the host's event order.
    #[serde(default)]
    pub headless: bool,

    /// Show a spinner while the background task is draining.
    #[serde(default = "default_true")]
    pub show_progress: bool,

    /// Where the dependency cache snapshot is kept. `None` keeps the cache in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
}

impl Default for ScriptingSettings {
    fn default() -> Self {
        Self {
            auto_reload: false,
            headless: false,
            show_progress: true,
            cache_path: None,
        }
    }
}

impl ScriptingSettings {
    /// Settings for tests: headless, no progress, in-memory cache.
    pub fn headless() -> Self {
        Self {
            headless: true,
            show_progress: false,
            ..Self::default()
        }
    }

    /// Load settings from the default location and apply environment overrides.
    ///
    /// A file without `cache_path` gets [`ScriptingSettings::default_cache_path`], so a
    /// host session persists its cache unless configured otherwise.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let mut settings = if path.exists() {
            Self::load_from(&path).await?
        } else {
            Self::default()
        };
        if settings.cache_path.is_none() {
            settings.cache_path = Some(Self::default_cache_path()?);
        }
        Ok(settings.with_env_overrides())
    }

    /// Load settings from a specific file, without environment overrides.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }

    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptDepsError::TomlError`] for invalid TOML.
    pub fn parse(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).map_err(ScriptDepsError::from)?;
        Ok(settings)
    }

    /// Apply the `SCRIPTDEPS_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if env_flag(AUTO_RELOAD_ENV) {
            self.auto_reload = true;
        }
        if env_flag(HEADLESS_ENV) {
            self.headless = true;
        }
        if std::env::var_os(NO_PROGRESS_ENV).is_some() {
            self.show_progress = false;
        }
        self
    }

    /// Default settings file path.
    ///
    /// # Errors
    ///
    /// Fails if the home (or local data, on Windows) directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::state_dir()?.join("config.toml"))
    }

    /// Default location of the cache snapshot, next to the settings file.
    ///
    /// # Errors
    ///
    /// Same as [`ScriptingSettings::default_path`].
    pub fn default_cache_path() -> Result<PathBuf> {
        Ok(Self::state_dir()?.join("dependencies.json"))
    }

    fn state_dir() -> Result<PathBuf> {
        let dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("scriptdeps")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".scriptdeps")
        };
        Ok(dir)
    }
}

fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no"),
        Err(_) => false,
    }
}

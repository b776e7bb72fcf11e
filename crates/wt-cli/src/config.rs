//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Seconds without input before the user counts as idle.
    pub idle_threshold_secs: u64,
    /// Daily focus goal in seconds.
    pub daily_goal_secs: u64,
    /// Block distracting domains.
    pub focus_mode_enabled: bool,
    /// Flush interval for live tracking.
    pub tick_interval_secs: u64,
    /// Upper bound for one classification request.
    pub classify_timeout_secs: u64,
    /// Chat-completions API key. Never logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model used for classification and insights.
    pub model: String,
    /// Chat-completions endpoint.
    pub api_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("idle_threshold_secs", &self.idle_threshold_secs)
            .field("daily_goal_secs", &self.daily_goal_secs)
            .field("focus_mode_enabled", &self.focus_mode_enabled)
            .field("tick_interval_secs", &self.tick_interval_secs)
            .field("classify_timeout_secs", &self.classify_timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("wt.db"),
            idle_threshold_secs: wt_core::tracker::DEFAULT_IDLE_THRESHOLD_SECS,
            daily_goal_secs: 14_400,
            focus_mode_enabled: false,
            tick_interval_secs: 30,
            classify_timeout_secs: wt_core::category::DEFAULT_RESOLVE_TIMEOUT.as_secs(),
            api_key: None,
            model: wt_llm::DEFAULT_MODEL.to_string(),
            api_url: wt_llm::DEFAULT_API_URL.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WT_*)
        figment = figment.merge(Env::prefixed("WT_"));

        let config: Self = figment.extract()?;
        if config.tick_interval_secs == 0 {
            return Err(figment::Error::from(
                "tick_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Configured API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub const fn classify_timeout(&self) -> Duration {
        Duration::from_secs(self.classify_timeout_secs)
    }
}

/// Returns the platform-specific config directory for wt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wt"))
}

/// Returns the platform-specific data directory for wt.
///
/// On Linux: `~/.local/share/wt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("wt"))
}

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const DEFAULT_POLLING_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_RELOAD_THROTTLE_MS: u64 = 1000;
const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5000;

fn default_polling_interval_seconds() -> u64 {
    DEFAULT_POLLING_INTERVAL_SECONDS
}

fn default_reload_throttle_ms() -> u64 {
    DEFAULT_RELOAD_THROTTLE_MS
}

fn default_action_timeout_ms() -> u64 {
    DEFAULT_ACTION_TIMEOUT_MS
}

/// Per-provider settings supplied at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// 0 disables polling: the provider is fetched once per trigger only
    #[serde(default = "default_polling_interval_seconds")]
    pub fetch_polling_interval_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            fetch_polling_interval_seconds: DEFAULT_POLLING_INTERVAL_SECONDS,
        }
    }
}

impl ProviderConfig {
    pub fn with_polling_interval(seconds: u64) -> Self {
        Self {
            fetch_polling_interval_seconds: seconds,
        }
    }

    pub fn polling_interval(&self) -> Option<Duration> {
        match self.fetch_polling_interval_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Model-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Minimum gap between two manual reloads of one provider
    #[serde(default = "default_reload_throttle_ms")]
    pub reload_throttle_ms: u64,

    /// How long to wait for an action result before giving up on it
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,

    #[serde(default = "default_polling_interval_seconds")]
    pub default_polling_interval_seconds: u64,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            reload_throttle_ms: DEFAULT_RELOAD_THROTTLE_MS,
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            default_polling_interval_seconds: DEFAULT_POLLING_INTERVAL_SECONDS,
            providers: HashMap::new(),
        }
    }
}

impl ModelConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: ModelConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn reload_throttle(&self) -> Duration {
        Duration::from_millis(self.reload_throttle_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn set_provider(&mut self, name: impl Into<String>, config: ProviderConfig) {
        self.providers.insert(name.into(), config);
    }

    /// Explicit registration config wins over the providers table, which
    /// wins over the model default.
    pub fn provider_config(
        &self,
        plugin: &str,
        explicit: Option<ProviderConfig>,
    ) -> ProviderConfig {
        explicit
            .or_else(|| self.providers.get(plugin).copied())
            .unwrap_or(ProviderConfig {
                fetch_polling_interval_seconds: self.default_polling_interval_seconds,
            })
    }
}

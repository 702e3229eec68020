//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `adrules.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=300;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineSection,
    pub store: StoreConfig,
    pub campaigns: CampaignsConfig,
    pub graph_api: GraphApiConfig,
    pub alerts: AlertsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Bound on every campaign client and alert sender call, in seconds.
    pub upstream_timeout_secs: u64,
}

/// Where rules are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Json,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unknown store backend {other:?}, expected \"sqlite\" or \"json\""
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// `SQLite` connection URL, used by the `sqlite` backend.
    pub url: String,
    /// Rules file, used by the `json` backend.
    pub path: PathBuf,
}

/// Where campaign data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignSource {
    #[default]
    GraphApi,
    Virtual,
}

impl FromStr for CampaignSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graph_api" => Ok(Self::GraphApi),
            "virtual" => Ok(Self::Virtual),
            other => Err(ConfigError::Validation(format!(
                "unknown campaign source {other:?}, expected \"graph_api\" or \"virtual\""
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CampaignsConfig {
    pub source: CampaignSource,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GraphApiConfig {
    pub base_url: String,
    pub api_version: String,
    pub access_token: String,
    pub page_limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Empty disables alerts.
    pub webhook_url: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `adrules.toml` (if present), apply
    /// environment-variable overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, an
    /// override has an unknown value, or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("adrules.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = var("ADRULES_STORE_BACKEND") {
            self.store.backend = val.parse()?;
        }
        if let Some(val) = var("ADRULES_DATABASE_URL") {
            self.store.url = val;
        }
        if let Some(val) = var("ADRULES_RULES_PATH") {
            self.store.path = PathBuf::from(val);
        }
        if let Some(val) = var("ADRULES_CAMPAIGN_SOURCE") {
            self.campaigns.source = val.parse()?;
        }
        if let Some(val) = var("ADRULES_GRAPH_TOKEN") {
            self.graph_api.access_token = val;
        }
        if let Some(val) = var("ADRULES_GRAPH_BASE_URL") {
            self.graph_api.base_url = val;
        }
        if let Some(val) = var("ADRULES_WEBHOOK_URL") {
            self.alerts.webhook_url = val;
        }
        if let Some(val) = var("ADRULES_UPSTREAM_TIMEOUT_SECS") {
            self.engine.upstream_timeout_secs = val.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("upstream timeout {val:?} is not a number"))
            })?;
        }
        if let Some(val) = var("ADRULES_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !TIMEOUT_RANGE_SECS.contains(&self.engine.upstream_timeout_secs) {
            return Err(ConfigError::Validation(format!(
                "upstream timeout must be within {}..={} seconds, got {}",
                TIMEOUT_RANGE_SECS.start(),
                TIMEOUT_RANGE_SECS.end(),
                self.engine.upstream_timeout_secs
            )));
        }
        if self.campaigns.source == CampaignSource::GraphApi
            && self.graph_api.access_token.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "graph_api.access_token is required when campaigns.source = \"graph_api\""
                    .to_string(),
            ));
        }
        if self.graph_api.page_limit == 0 {
            return Err(ConfigError::Validation(
                "graph_api.page_limit must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.upstream_timeout_secs)
    }

    /// Webhook URL, or `None` when alerts are disabled.
    #[must_use]
    pub fn webhook_url(&self) -> Option<&str> {
        let url = self.alerts.webhook_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            upstream_timeout_secs: 20,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            url: "sqlite:adrules.db?mode=rwc".to_string(),
            path: PathBuf::from("rules.json"),
        }
    }
}

impl Default for GraphApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.facebook.com".to_string(),
            api_version: "v19.0".to_string(),
            access_token: String::new(),
            page_limit: 200,
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            username: "adrules".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "adrulesd=info,adrules=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

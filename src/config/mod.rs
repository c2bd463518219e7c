mod logging_config;
mod scraper_config;
mod storage_config;
mod wiki_config;

use serde::{Deserialize, Serialize};

pub use logging_config::LoggingConfig;
pub use scraper_config::ScraperConfig;
pub use storage_config::StorageConfig;
pub use wiki_config::WikiConfig;

/// Top-level configuration aggregating every subsystem config (§6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ArchivistConfig {
    pub wiki: WikiConfig,
    pub scraper: ScraperConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl ArchivistConfig {
    /// Load config from a TOML string, falling back to defaults for any
    /// field the file omits.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Validate cross-field invariants. Validation failure must abort before
    /// any side effect (§6).
    pub fn validate(&self) -> Result<(), String> {
        if self.wiki.base_url.trim().is_empty() {
            return Err("wiki.base_url must not be empty".to_string());
        }
        if self.scraper.rate_limit <= 0.0 {
            return Err("scraper.rate_limit must be > 0".to_string());
        }
        if self.scraper.timeout == 0 {
            return Err("scraper.timeout must be > 0".to_string());
        }
        Ok(())
    }
}

/// Overrides a caller (typically the CLI) may apply on top of a loaded
/// config. Precedence is CLI > file > defaults (§6); `apply` mutates in
/// place, only overwriting fields that were actually supplied.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_file: Option<String>,
    pub rate_limit: Option<f64>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ArchivistConfig) {
        if let Some(db) = &self.database_file {
            config.storage.database_file = db.clone();
        }
        if let Some(rl) = self.rate_limit {
            config.scraper.rate_limit = rl;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub rate_limit: f64,
    /// Per-request timeout, seconds.
    pub timeout: u64,
    pub max_retries: u32,
    pub user_agent: String,
    pub base_delay_s: f64,
    pub max_delay_s: f64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            rate_limit: 5.0,
            timeout: 30,
            max_retries: 5,
            user_agent: "wiki-archivist/0.1 (+https://github.com/wiki-archivist/wiki-archivist)"
                .to_string(),
            base_delay_s: 1.0,
            max_delay_s: 60.0,
        }
    }
}

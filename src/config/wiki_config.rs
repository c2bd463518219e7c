use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiConfig {
    /// Host for the API endpoint, e.g. `https://en.wikipedia.org`.
    pub base_url: String,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
        }
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root for file downloads and checkpoints.
    pub data_dir: String,
    pub database_file: String,
    pub checkpoint_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            database_file: "data/wiki.sqlite3".to_string(),
            checkpoint_file: "data/checkpoint.json".to_string(),
        }
    }
}

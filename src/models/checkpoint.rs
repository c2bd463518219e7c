use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointPhase {
    Init,
    Discovering,
    ScrapingPages,
    DownloadingFiles,
    ExtractingLinks,
    Verifying,
    Complete,
}

/// Ephemeral, process-owned snapshot of orchestrator progress (§3). Persisted
/// as a single versioned JSON blob by the checkpoint store (C5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    /// The run's input arguments, serialized, used to verify compatibility
    /// with a resumed run (§4.5).
    pub parameters: serde_json::Value,
    pub phase: CheckpointPhase,
    pub namespaces_completed: BTreeSet<i64>,
    pub current_namespace: Option<i64>,
    pub completed_new_pages: BTreeSet<i64>,
    pub completed_modified_pages: BTreeSet<i64>,
    pub completed_deleted_pages: BTreeSet<i64>,
    pub completed_files: BTreeSet<String>,
}

impl Checkpoint {
    pub const CURRENT_VERSION: &'static str = "1.0";

    pub fn new(parameters: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            version: Self::CURRENT_VERSION.to_string(),
            started_at: now,
            last_update: now,
            parameters,
            phase: CheckpointPhase::Init,
            namespaces_completed: BTreeSet::new(),
            current_namespace: None,
            completed_new_pages: BTreeSet::new(),
            completed_modified_pages: BTreeSet::new(),
            completed_deleted_pages: BTreeSet::new(),
            completed_files: BTreeSet::new(),
        }
    }

    pub fn touch(&mut self) {
        self.last_update = Utc::now();
    }
}

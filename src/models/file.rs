use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An uploaded media object. `title` (the unique file name) is its primary
/// identity; `sha1` is the authoritative identity for change detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub title: String,
    pub url: String,
    pub description_url: String,
    pub sha1: String,
    pub size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploader: Option<String>,
    /// Present iff bytes have been downloaded and digest-verified.
    pub local_path: Option<String>,
    pub is_deleted: bool,
}

/// Classification used by the incremental file change detector (§4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    New,
    Modified,
    Unchanged,
    Deleted,
}

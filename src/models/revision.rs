use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable snapshot of a page. Revisions are never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub revision_id: i64,
    pub page_id: i64,
    pub parent_revision_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    /// `None` or IP-form for anonymous editors.
    pub user: Option<String>,
    /// 0 or `None` upstream means anonymous.
    pub user_id: Option<i64>,
    pub comment: String,
    pub size: u64,
    pub sha1: Option<String>,
    /// `None` for suppressed revisions whose content was not returned.
    pub content: Option<String>,
    pub tags: Vec<String>,
}

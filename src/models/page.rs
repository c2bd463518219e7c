use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named content slot, identified by the upstream wiki's integer page id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_id: i64,
    pub namespace: i64,
    /// Wire form: spaces as underscores, namespace prefix stripped.
    pub title: String,
    pub is_redirect: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn new(page_id: i64, namespace: i64, title: impl Into<String>, is_redirect: bool) -> Self {
        let now = Utc::now();
        Self {
            page_id,
            namespace,
            title: Self::normalize_title(namespace, title.into()),
            is_redirect,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Strips the namespace prefix MediaWiki's API still embeds in a
    /// non-main-namespace title (e.g. `Category:Acolyte`) and underscores
    /// spaces, so a stored `Page.title` matches the wire form
    /// `scrapers::links::extract` produces for link targets — without this,
    /// title-based link resolution can never match a namespaced page.
    pub fn normalize_title(namespace: i64, title: String) -> String {
        let title = if namespace != 0 {
            match title.split_once(':') {
                Some((_, rest)) => rest.to_string(),
                None => title,
            }
        } else {
            title
        };
        title.trim().replace(' ', "_")
    }
}

/// Aggregated view produced by `Repository::get_page_update_info`, joining a
/// page against its revisions so the orchestrators can decide whether a page
/// needs a full or partial revision fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct PageUpdateInfo {
    pub page_id: i64,
    pub namespace: i64,
    pub title: String,
    pub is_redirect: bool,
    /// 0 if the page has no stored revisions.
    pub highest_revision_id: i64,
    pub last_revision_ts: Option<DateTime<Utc>>,
    pub total_revisions: i64,
}

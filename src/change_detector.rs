//! C11: combines the recent-changes feed with repository state into a
//! categorized `ChangeSet`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use std::collections::BTreeMap;

use crate::api::ApiClient;
use crate::errors::ArchivistResult;
use crate::models::Page;
use crate::repository::Repository;
use crate::scrapers::recent_changes::{self, RecentChangeKind};

#[derive(Debug, Clone, PartialEq)]
pub struct MovedPage {
    pub page_id: i64,
    pub old_title: Option<String>,
    pub new_title: String,
    pub namespace: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub last_scrape_time: Option<DateTime<Utc>>,
    pub detection_time: DateTime<Utc>,
    pub requires_full_scrape: bool,
    pub new_page_ids: BTreeSet<i64>,
    /// Full page records for `new_page_ids`, captured from the feed entries
    /// themselves so the incremental orchestrator can `upsert_pages` before
    /// fetching revisions, without a second discovery round-trip.
    pub new_pages: Vec<Page>,
    pub modified_page_ids: BTreeSet<i64>,
    pub deleted_page_ids: BTreeSet<i64>,
    pub moved_pages: Vec<MovedPage>,
}

impl ChangeSet {
    fn requires_full_scrape(detection_time: DateTime<Utc>) -> Self {
        Self {
            last_scrape_time: None,
            detection_time,
            requires_full_scrape: true,
            new_page_ids: BTreeSet::new(),
            new_pages: Vec::new(),
            modified_page_ids: BTreeSet::new(),
            deleted_page_ids: BTreeSet::new(),
            moved_pages: Vec::new(),
        }
    }
}

pub async fn detect(
    repository: &Repository,
    client: &ApiClient,
    now: DateTime<Utc>,
) -> ArchivistResult<ChangeSet> {
    detect_since(repository, client, now, None).await
}

/// As `detect`, but `since_override` (the CLI's `--since`) takes precedence
/// over the repository's own last-successful-run bookkeeping — an operator
/// re-running a window manually still requires a prior full scrape to exist.
pub async fn detect_since(
    repository: &Repository,
    client: &ApiClient,
    now: DateTime<Utc>,
    since_override: Option<DateTime<Utc>>,
) -> ArchivistResult<ChangeSet> {
    let Some(baseline_time) = repository.last_successful_run_end_time()? else {
        return Ok(ChangeSet::requires_full_scrape(now));
    };
    let last_scrape_time = since_override.unwrap_or(baseline_time);

    let changes = recent_changes::read(client, last_scrape_time, now).await?;
    Ok(categorize(changes, last_scrape_time, now))
}

/// The pure categorization algorithm (§4.11 steps 3-6), split out from
/// `detect` so it is unit-testable without a network round-trip.
fn categorize(
    changes: Vec<recent_changes::RecentChange>,
    last_scrape_time: DateTime<Utc>,
    detection_time: DateTime<Utc>,
) -> ChangeSet {
    let mut new_page_ids = BTreeSet::new();
    let mut new_pages: BTreeMap<i64, Page> = BTreeMap::new();
    let mut modified_page_ids = BTreeSet::new();
    let mut deleted_page_ids = BTreeSet::new();
    let mut moved_pages = Vec::new();
    let mut created_in_window: BTreeSet<i64> = BTreeSet::new();

    for change in changes {
        match &change.kind {
            RecentChangeKind::New => {
                new_page_ids.insert(change.page_id);
                created_in_window.insert(change.page_id);
                new_pages.insert(
                    change.page_id,
                    Page::new(change.page_id, change.namespace, change.title.clone(), false),
                );
            }
            RecentChangeKind::Edit => {
                if !created_in_window.contains(&change.page_id) {
                    modified_page_ids.insert(change.page_id);
                }
            }
            RecentChangeKind::Log { .. } if change.is_delete() => {
                deleted_page_ids.insert(change.page_id);
                new_page_ids.remove(&change.page_id);
                new_pages.remove(&change.page_id);
            }
            RecentChangeKind::Log { .. } if change.is_move() => {
                moved_pages.push(MovedPage {
                    page_id: change.page_id,
                    old_title: None,
                    new_title: Page::normalize_title(change.namespace, change.title.clone()),
                    namespace: change.namespace,
                    timestamp: change.timestamp,
                });
            }
            RecentChangeKind::Log { .. } => {}
        }
    }

    modified_page_ids.retain(|id| !deleted_page_ids.contains(id));

    ChangeSet {
        last_scrape_time: Some(last_scrape_time),
        detection_time,
        requires_full_scrape: false,
        new_page_ids,
        new_pages: new_pages.into_values().collect(),
        modified_page_ids,
        deleted_page_ids,
        moved_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::recent_changes::RecentChange;

    fn change(page_id: i64, kind: RecentChangeKind) -> RecentChange {
        RecentChange {
            rcid: page_id,
            kind,
            namespace: 0,
            title: format!("Page{page_id}"),
            page_id,
            revid: None,
            old_revid: None,
            timestamp: Utc::now(),
            user: None,
            user_id: None,
            comment: None,
            old_len: None,
            new_len: None,
        }
    }

    fn now() -> DateTime<Utc> {
        "2024-06-01T00:00:00Z".parse().unwrap()
    }

    fn then() -> DateTime<Utc> {
        "2024-05-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn s3_created_then_deleted_nets_to_deleted_only() {
        let changes = vec![
            change(3000, RecentChangeKind::New),
            change(3000, RecentChangeKind::Log { action: "delete".to_string() }),
        ];
        let set = categorize(changes, then(), now());
        assert!(set.new_page_ids.is_empty());
        assert_eq!(set.deleted_page_ids, BTreeSet::from([3000]));
    }

    #[test]
    fn created_then_edited_nets_to_new_only() {
        let changes = vec![change(4000, RecentChangeKind::New), change(4000, RecentChangeKind::Edit)];
        let set = categorize(changes, then(), now());
        assert_eq!(set.new_page_ids, BTreeSet::from([4000]));
        assert!(set.modified_page_ids.is_empty());
    }

    #[test]
    fn deletion_supersedes_prior_edit_in_window() {
        let changes = vec![
            change(5000, RecentChangeKind::Edit),
            change(5000, RecentChangeKind::Log { action: "delete".to_string() }),
        ];
        let set = categorize(changes, then(), now());
        assert!(set.modified_page_ids.is_empty());
        assert_eq!(set.deleted_page_ids, BTreeSet::from([5000]));
    }

    #[test]
    fn s2_new_page_and_edit_to_existing_page() {
        let changes = vec![
            change(2000, RecentChangeKind::New),
            change(1370, RecentChangeKind::Edit),
        ];
        let set = categorize(changes, then(), now());
        assert_eq!(set.new_page_ids, BTreeSet::from([2000]));
        assert_eq!(set.modified_page_ids, BTreeSet::from([1370]));
        assert!(set.deleted_page_ids.is_empty());
    }

    #[test]
    fn duplicate_edits_to_one_page_count_once() {
        let changes = vec![change(10, RecentChangeKind::Edit), change(10, RecentChangeKind::Edit)];
        let set = categorize(changes, then(), now());
        assert_eq!(set.modified_page_ids.len(), 1);
    }
}

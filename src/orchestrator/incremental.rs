//! C13: reconciles a store against the upstream delta since the last
//! successful run instead of rediscovering everything.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::errors::{ArchivistResult, ScrapeError};
use crate::models::RunType;

use super::{baseline, failure_rate_status, scrape_page_revisions, OrchestratorContext, IncrementalStats};

/// `namespaces`, when non-empty, restricts which namespaces' changes are
/// acted on (the CLI's `--namespace`); `since`, when set, overrides the
/// detector's window start (the CLI's `--since`).
pub async fn run(
    ctx: &OrchestratorContext,
    since: Option<DateTime<Utc>>,
    namespaces: &[i64],
) -> ArchivistResult<IncrementalStats> {
    let now = Utc::now();
    let mut changes =
        crate::change_detector::detect_since(&ctx.repository, &ctx.client, now, since).await?;

    if changes.requires_full_scrape {
        return Err(ScrapeError::FirstRunRequiresFullScrape.into());
    }

    if !namespaces.is_empty() {
        filter_change_set_by_namespace(&mut changes, namespaces, &ctx.repository)?;
    }

    let run_id = ctx.repository.begin_run(RunType::Incremental)?;
    info!(
        run_id,
        new = changes.new_page_ids.len(),
        modified = changes.modified_page_ids.len(),
        deleted = changes.deleted_page_ids.len(),
        moved = changes.moved_pages.len(),
        "incremental run started"
    );

    let mut revisions_added = 0i64;
    let mut failed = 0usize;

    // Step 3: new pages, scraped exactly like a baseline's step 3. Filtered
    // through C4 first — another process may already have scraped some of
    // these page ids between the change detector's read and this run.
    let candidate_ids: Vec<i64> = changes.new_page_ids.iter().copied().collect();
    let new_ids: std::collections::BTreeSet<i64> =
        ctx.repository.filter_new_pages(&candidate_ids)?.into_iter().collect();
    changes.new_pages.retain(|p| new_ids.contains(&p.page_id));
    changes.new_page_ids = new_ids;

    let total = changes.new_page_ids.len() + changes.modified_page_ids.len() + changes.moved_pages.len();

    if !changes.new_pages.is_empty() {
        ctx.repository.upsert_pages(&changes.new_pages)?;
    }
    for page_id in &changes.new_page_ids {
        if ctx.is_cancelled() {
            break;
        }
        match scrape_page_revisions(ctx, *page_id, None).await {
            Ok(added) => revisions_added += added as i64,
            Err(e) => {
                error!(page_id, error = %e, "new page scrape failed");
                failed += 1;
            }
        }
    }

    // Step 4: modified pages, resuming from their stored high-water mark.
    for page_id in &changes.modified_page_ids {
        if ctx.is_cancelled() {
            break;
        }
        let start_after_id = match ctx.repository.get_page_update_info(*page_id)? {
            Some(info) if info.highest_revision_id > 0 => Some(info.highest_revision_id),
            _ => None,
        };
        match scrape_page_revisions(ctx, *page_id, start_after_id).await {
            Ok(added) => revisions_added += added as i64,
            Err(e) => {
                error!(page_id, error = %e, "modified page scrape failed");
                failed += 1;
            }
        }
    }

    // Step 5: deletions never touch the network.
    for page_id in &changes.deleted_page_ids {
        if let Err(e) = ctx.repository.mark_page_deleted(*page_id, now) {
            warn!(page_id, error = %e, "failed to mark page deleted");
        }
    }

    // Step 6: moves update title/namespace, then are rescraped like a
    // modification since a move commonly accompanies a new revision.
    for moved in &changes.moved_pages {
        if ctx.is_cancelled() {
            break;
        }
        if let Err(e) = ctx
            .repository
            .rename_page(moved.page_id, moved.namespace, &moved.new_title, moved.timestamp)
        {
            warn!(page_id = moved.page_id, error = %e, "failed to rename page");
            continue;
        }
        let start_after_id = match ctx.repository.get_page_update_info(moved.page_id)? {
            Some(info) if info.highest_revision_id > 0 => Some(info.highest_revision_id),
            _ => None,
        };
        match scrape_page_revisions(ctx, moved.page_id, start_after_id).await {
            Ok(added) => revisions_added += added as i64,
            Err(e) => {
                error!(page_id = moved.page_id, error = %e, "moved page scrape failed");
                failed += 1;
            }
        }
    }

    // Step 7: file delta, identical to the baseline's step 4.
    let mut checkpoint = crate::models::Checkpoint::new(serde_json::json!({ "run_type": "incremental" }));
    let files_downloaded = baseline::download_all_files(ctx, &mut checkpoint).await?;

    // Step 8: verify and finalize.
    let report = crate::verifier::verify(&ctx.repository)?;
    if !report.is_clean() {
        warn!(?report, "incremental run left advisory findings");
    }

    let status = failure_rate_status(failed, total);
    ctx.repository.finish_run(
        run_id,
        status,
        total as i64,
        revisions_added,
        files_downloaded,
        changes.new_page_ids.len() as i64,
        changes.modified_page_ids.len() as i64,
        changes.deleted_page_ids.len() as i64,
        changes.moved_pages.len() as i64,
        None,
    )?;

    let total_pages_affected = (changes.new_page_ids.len()
        + changes.modified_page_ids.len()
        + changes.deleted_page_ids.len()
        + changes.moved_pages.len()) as i64;

    info!(run_id, total_pages_affected, revisions_added, files_downloaded, ?status, "incremental run finished");

    Ok(IncrementalStats {
        run_id,
        pages_new: changes.new_page_ids.len() as i64,
        pages_modified: changes.modified_page_ids.len() as i64,
        pages_deleted: changes.deleted_page_ids.len() as i64,
        pages_moved: changes.moved_pages.len() as i64,
        revisions_added,
        files_downloaded,
        api_calls: 0,
        total_pages_affected,
        status,
    })
}

fn filter_change_set_by_namespace(
    changes: &mut crate::change_detector::ChangeSet,
    namespaces: &[i64],
    repository: &crate::repository::Repository,
) -> ArchivistResult<()> {
    changes.new_pages.retain(|p| namespaces.contains(&p.namespace));
    changes.new_page_ids = changes.new_pages.iter().map(|p| p.page_id).collect();

    let mut keep = |page_id: &i64| -> ArchivistResult<bool> {
        match repository.get_page_by_id(*page_id)? {
            Some(page) => Ok(namespaces.contains(&page.namespace)),
            None => Ok(false),
        }
    };

    let mut kept_modified = std::collections::BTreeSet::new();
    for id in &changes.modified_page_ids {
        if keep(id)? {
            kept_modified.insert(*id);
        }
    }
    changes.modified_page_ids = kept_modified;

    let mut kept_deleted = std::collections::BTreeSet::new();
    for id in &changes.deleted_page_ids {
        if keep(id)? {
            kept_deleted.insert(*id);
        }
    }
    changes.deleted_page_ids = kept_deleted;

    changes.moved_pages.retain(|m| namespaces.contains(&m.namespace));
    Ok(())
}

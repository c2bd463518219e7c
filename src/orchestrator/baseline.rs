//! C12: drives discovery → revisions → links → files → verify into the
//! repository for a cold or forced-fresh store.

use serde_json::json;
use tracing::{error, info, warn};

use crate::checkpoint_store::CheckpointStore;
use crate::errors::{ArchivistResult, ScrapeError};
use crate::models::{Checkpoint, CheckpointPhase, RunStatus, RunType};
use crate::scrapers::discovery::{self, DEFAULT_NAMESPACES};
use crate::scrapers::files;

use super::{failure_rate_status, scrape_page_revisions, OrchestratorContext, ScrapeResult};

pub async fn run(ctx: &OrchestratorContext, namespaces: Option<Vec<i64>>) -> ArchivistResult<ScrapeResult> {
    let namespaces = namespaces.unwrap_or_else(|| DEFAULT_NAMESPACES.to_vec());
    let parameters = json!({ "run_type": "full", "namespaces": namespaces });

    let run_id = ctx.repository.begin_run(RunType::Full)?;
    info!(run_id, "baseline run started");

    let mut checkpoint = load_or_create_checkpoint(&ctx.checkpoint_store, &parameters);
    checkpoint.phase = CheckpointPhase::Discovering;

    let mut errors = Vec::new();
    let mut failed_page_ids = Vec::new();

    // Step 2: discovery, per namespace.
    for &ns in &namespaces {
        if ctx.is_cancelled() {
            return interrupt(ctx, run_id, &checkpoint).await;
        }
        if checkpoint.namespaces_completed.contains(&ns) {
            continue;
        }
        match discovery::discover(&ctx.client, ns).await {
            Ok(pages) => {
                ctx.repository.upsert_pages(&pages)?;
                checkpoint.namespaces_completed.insert(ns);
                ctx.checkpoint_store.save(&checkpoint)?;
            }
            Err(e) => {
                warn!(namespace = ns, error = %e, "namespace discovery failed, continuing");
                errors.push(format!("namespace {ns}: {e}"));
            }
        }
    }

    // Step 3: per-page revisions + links.
    checkpoint.phase = CheckpointPhase::ScrapingPages;
    ctx.checkpoint_store.save(&checkpoint)?;

    let page_ids = ctx.repository.stream_page_ids(false)?;
    let mut revisions_scraped = 0i64;
    let mut processed_since_save = 0usize;

    for page_id in &page_ids {
        if ctx.is_cancelled() {
            return interrupt(ctx, run_id, &checkpoint).await;
        }
        if checkpoint.completed_new_pages.contains(page_id) {
            continue;
        }
        match scrape_page_revisions(ctx, *page_id, None).await {
            Ok(added) => {
                revisions_scraped += added as i64;
                checkpoint.completed_new_pages.insert(*page_id);
            }
            Err(e) => {
                error!(page_id, error = %e, "per-page scrape failed");
                errors.push(format!("page {page_id}: {e}"));
                failed_page_ids.push(*page_id);
            }
        }

        processed_since_save += 1;
        if processed_since_save >= ctx.checkpoint_save_every {
            checkpoint.touch();
            ctx.checkpoint_store.save(&checkpoint)?;
            processed_since_save = 0;
        }
    }
    checkpoint.touch();
    ctx.checkpoint_store.save(&checkpoint)?;

    // Step 4: files.
    checkpoint.phase = CheckpointPhase::DownloadingFiles;
    ctx.checkpoint_store.save(&checkpoint)?;
    let files_downloaded = download_all_files(ctx, &mut checkpoint).await?;

    // Step 5: verify.
    checkpoint.phase = CheckpointPhase::Verifying;
    ctx.checkpoint_store.save(&checkpoint)?;
    let report = crate::verifier::verify(&ctx.repository)?;
    if !report.is_clean() {
        errors.push(format!("verifier findings: {report:?}"));
    }

    // Step 6: finalize.
    let status = failure_rate_status(failed_page_ids.len(), page_ids.len());
    let errors_json = serde_json::to_string(&errors).ok();
    ctx.repository.finish_run(
        run_id,
        status,
        page_ids.len() as i64,
        revisions_scraped,
        files_downloaded,
        page_ids.len() as i64,
        0,
        0,
        0,
        errors_json.as_deref(),
    )?;
    ctx.checkpoint_store.clear()?;
    checkpoint.phase = CheckpointPhase::Complete;

    info!(run_id, pages = page_ids.len(), revisions_scraped, files_downloaded, ?status, "baseline run finished");

    Ok(ScrapeResult {
        run_id,
        pages: page_ids.len() as i64,
        revisions: revisions_scraped,
        files: files_downloaded,
        namespaces_scraped: namespaces,
        errors,
        failed_page_ids,
        status,
    })
}

pub(super) async fn download_all_files(
    ctx: &OrchestratorContext,
    checkpoint: &mut Checkpoint,
) -> ArchivistResult<i64> {
    let discovered = files::discover_files(&ctx.client).await?;
    let mut downloaded = 0i64;

    for file in discovered {
        if ctx.is_cancelled() {
            break;
        }
        if checkpoint.completed_files.contains(&file.title) {
            continue;
        }
        let change = ctx.repository.classify_file_change(&file)?;
        let mut file = file;
        if !matches!(change, crate::models::FileChange::Unchanged) {
            match ctx.downloader.download(&file).await {
                Ok(path) => {
                    file.local_path = Some(path.to_string_lossy().into_owned());
                    ctx.repository.record_file_change(&change, &file)?;
                    downloaded += 1;
                }
                Err(e) => {
                    error!(title = %file.title, error = %e, "file download failed");
                }
            }
        }
        checkpoint.completed_files.insert(file.title.clone());
    }
    Ok(downloaded)
}

fn load_or_create_checkpoint(store: &CheckpointStore, parameters: &serde_json::Value) -> Checkpoint {
    match store.load() {
        Some(existing) if &existing.parameters == parameters => {
            info!("resuming baseline run from checkpoint");
            existing
        }
        Some(_) => {
            warn!("checkpoint parameters do not match this run, starting fresh");
            Checkpoint::new(parameters.clone())
        }
        None => Checkpoint::new(parameters.clone()),
    }
}

async fn interrupt(
    ctx: &OrchestratorContext,
    run_id: i64,
    checkpoint: &Checkpoint,
) -> ArchivistResult<ScrapeResult> {
    warn!(run_id, "baseline run interrupted, leaving checkpoint intact");
    ctx.checkpoint_store.save(checkpoint)?;
    ctx.repository.finish_run(
        run_id,
        RunStatus::Failed,
        checkpoint.completed_new_pages.len() as i64,
        0,
        0,
        0,
        0,
        0,
        0,
        Some("interrupted"),
    )?;
    Err(ScrapeError::Interrupted.into())
}

//! C14: post-run, streaming invariant checks. Findings are advisory and
//! never abort a run; they are attached to the `ScrapeRun` record.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::warn;

use crate::errors::StorageError;
use crate::repository::Repository;

const BROKEN_LINK_SAMPLE_SIZE: i64 = 200;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerificationReport {
    pub duplicate_revision_ids: Vec<i64>,
    pub orphan_pages: Vec<i64>,
    pub broken_links: Vec<(i64, String)>,
    pub corrupt_files: Vec<String>,
    pub timestamp_anomalies: Vec<i64>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_revision_ids.is_empty()
            && self.orphan_pages.is_empty()
            && self.broken_links.is_empty()
            && self.corrupt_files.is_empty()
            && self.timestamp_anomalies.is_empty()
    }
}

pub fn verify(repository: &Repository) -> Result<VerificationReport, StorageError> {
    let mut report = VerificationReport::default();

    check_orphans_and_duplicates(repository, &mut report)?;
    check_broken_links(repository, &mut report)?;
    check_corrupt_files(repository, &mut report)?;
    check_timestamp_anomalies(repository, &mut report)?;

    if !report.is_clean() {
        warn!(
            duplicate_revisions = report.duplicate_revision_ids.len(),
            orphan_pages = report.orphan_pages.len(),
            broken_links = report.broken_links.len(),
            corrupt_files = report.corrupt_files.len(),
            "integrity verifier found advisory issues"
        );
    }
    Ok(report)
}

fn check_orphans_and_duplicates(
    repository: &Repository,
    report: &mut VerificationReport,
) -> Result<(), StorageError> {
    let mut seen_revision_ids = HashSet::new();

    for page_id in repository.stream_page_ids(false)? {
        let mut has_any = false;
        repository.stream_revisions(page_id, |rev| {
            has_any = true;
            if !seen_revision_ids.insert(rev.revision_id) {
                report.duplicate_revision_ids.push(rev.revision_id);
            }
            Ok(())
        })?;
        if !has_any {
            report.orphan_pages.push(page_id);
        }
    }
    Ok(())
}

fn check_broken_links(repository: &Repository, report: &mut VerificationReport) -> Result<(), StorageError> {
    let broken = repository.broken_links_sample(BROKEN_LINK_SAMPLE_SIZE)?;
    report.broken_links = broken
        .into_iter()
        .map(|link| (link.source_page_id, link.target_title))
        .collect();
    Ok(())
}

fn check_corrupt_files(repository: &Repository, report: &mut VerificationReport) -> Result<(), StorageError> {
    for title in repository.stream_file_titles()? {
        let Some(file) = repository.get_file(&title)? else {
            continue;
        };
        let Some(local_path) = &file.local_path else {
            continue;
        };
        let matches = std::fs::read(local_path)
            .map(|bytes| {
                let mut hasher = Sha1::new();
                hasher.update(&bytes);
                hex::encode(hasher.finalize()) == file.sha1
            })
            .unwrap_or(false);
        if !matches {
            report.corrupt_files.push(title);
        }
    }
    Ok(())
}

fn check_timestamp_anomalies(repository: &Repository, report: &mut VerificationReport) -> Result<(), StorageError> {
    let mut candidates = Vec::new();
    repository.stream_pages(
        |page| !page.is_deleted,
        |page| {
            candidates.push((page.page_id, page.updated_at));
            Ok(())
        },
    )?;

    for (page_id, updated_at) in candidates {
        let Some(info) = repository.get_page_update_info(page_id)? else {
            continue;
        };
        if let Some(last_revision_ts) = info.last_revision_ts {
            if updated_at < last_revision_ts {
                report.timestamp_anomalies.push(page_id);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_report_has_no_findings() {
        let report = VerificationReport::default();
        assert!(report.is_clean());
    }

    #[test]
    fn report_with_any_finding_is_not_clean() {
        let mut report = VerificationReport::default();
        report.orphan_pages.push(42);
        assert!(!report.is_clean());
    }
}

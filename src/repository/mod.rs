//! C4: the repository façade. Every other component talks to storage only
//! through `Repository` — nothing outside this module runs SQL.

mod engine;
mod migrations;
mod queries;

use std::path::Path;

use chrono::{DateTime, Utc};

pub use engine::StorageEngine;

use crate::errors::StorageError;
use crate::models::{
    FileChange, FileRecord, Link, Page, PageUpdateInfo, Revision, RunStatus, RunType, ScrapeRun,
};

pub struct Repository {
    engine: StorageEngine,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            engine: StorageEngine::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            engine: StorageEngine::open_in_memory()?,
        })
    }

    // ---- pages ---------------------------------------------------------

    pub fn upsert_pages(&self, pages: &[Page]) -> Result<(), StorageError> {
        self.engine.with_writer(|conn| queries::pages::upsert_pages(conn, pages))
    }

    pub fn mark_page_deleted(&self, page_id: i64, at: DateTime<Utc>) -> Result<(), StorageError> {
        self.engine
            .with_writer(|conn| queries::pages::mark_page_deleted(conn, page_id, at))
    }

    pub fn rename_page(
        &self,
        page_id: i64,
        new_namespace: i64,
        new_title: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.engine
            .with_writer(|conn| queries::pages::rename_page(conn, page_id, new_namespace, new_title, at))
    }

    pub fn get_page_by_id(&self, page_id: i64) -> Result<Option<Page>, StorageError> {
        self.engine.with_reader(|conn| queries::pages::get_page_by_id(conn, page_id))
    }

    pub fn get_page_update_info(&self, page_id: i64) -> Result<Option<PageUpdateInfo>, StorageError> {
        self.engine
            .with_reader(|conn| queries::pages::get_page_update_info(conn, page_id))
    }

    pub fn filter_new_pages(&self, candidate_ids: &[i64]) -> Result<Vec<i64>, StorageError> {
        self.engine
            .with_reader(|conn| queries::pages::filter_new_pages(conn, candidate_ids))
    }

    pub fn stream_page_ids(&self, include_deleted: bool) -> Result<Vec<i64>, StorageError> {
        self.engine
            .with_reader(|conn| queries::pages::stream_page_ids(conn, include_deleted))
    }

    /// §4.4: a lazy, non-materializing walk over every page matching
    /// `predicate`. `f` is invoked per row as it is read from SQLite — the
    /// whole table is never held in memory at once. Callers must not call
    /// back into `Repository` from within `f` (the reader-pool lock is held
    /// for the duration of the walk).
    pub fn stream_pages<P, F>(&self, predicate: P, f: F) -> Result<(), StorageError>
    where
        P: Fn(&Page) -> bool,
        F: FnMut(Page) -> Result<(), StorageError>,
    {
        self.engine.with_reader(move |conn| queries::pages::stream_pages(conn, predicate, f))
    }

    // ---- revisions -------------------------------------------------------

    pub fn upsert_revisions(&self, revisions: &[Revision]) -> Result<usize, StorageError> {
        self.engine
            .with_writer(|conn| queries::revisions::upsert_revisions(conn, revisions))
    }

    pub fn revision_exists(&self, revision_id: i64) -> Result<bool, StorageError> {
        self.engine
            .with_reader(|conn| queries::revisions::revision_exists(conn, revision_id))
    }

    pub fn revision_ids_for_page(&self, page_id: i64) -> Result<Vec<i64>, StorageError> {
        self.engine
            .with_reader(|conn| queries::revisions::revision_ids_for_page(conn, page_id))
    }

    /// §4.4: a lazy, non-materializing walk over a page's revisions in
    /// timestamp order. Same no-reentrant-call caveat as `stream_pages`.
    pub fn stream_revisions<F>(&self, page_id: i64, f: F) -> Result<(), StorageError>
    where
        F: FnMut(Revision) -> Result<(), StorageError>,
    {
        self.engine
            .with_reader(move |conn| queries::revisions::stream_revisions(conn, page_id, f))
    }

    // ---- files -------------------------------------------------------

    pub fn classify_file_change(&self, incoming: &FileRecord) -> Result<FileChange, StorageError> {
        self.engine
            .with_reader(|conn| queries::files::classify_file_change(conn, incoming))
    }

    /// Applies a classified change to storage. `Unchanged` is a no-op by
    /// construction (§4.8): nothing is written.
    pub fn record_file_change(
        &self,
        change: &FileChange,
        file: &FileRecord,
    ) -> Result<(), StorageError> {
        self.engine.with_writer(|conn| match change {
            FileChange::New | FileChange::Modified => queries::files::upsert_file(conn, file),
            FileChange::Deleted => queries::files::mark_file_deleted(conn, &file.title),
            FileChange::Unchanged => Ok(()),
        })
    }

    pub fn stream_file_titles(&self) -> Result<Vec<String>, StorageError> {
        self.engine.with_reader(queries::files::stream_file_titles)
    }

    pub fn get_file(&self, title: &str) -> Result<Option<FileRecord>, StorageError> {
        self.engine.with_reader(|conn| queries::files::get_file(conn, title))
    }

    // ---- links -------------------------------------------------------

    pub fn replace_outgoing_links(&self, source_page_id: i64, links: &[Link]) -> Result<(), StorageError> {
        self.engine
            .with_writer(|conn| queries::links::replace_outgoing_links(conn, source_page_id, links))
    }

    pub fn broken_links_sample(&self, limit: i64) -> Result<Vec<Link>, StorageError> {
        self.engine
            .with_reader(|conn| queries::links::broken_links_sample(conn, limit))
    }

    // ---- scrape runs -------------------------------------------------------

    pub fn begin_run(&self, run_type: RunType) -> Result<i64, StorageError> {
        self.engine.with_writer(|conn| queries::scrape_runs::begin_run(conn, run_type))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        pages_scraped: i64,
        revisions_scraped: i64,
        files_downloaded: i64,
        pages_new: i64,
        pages_modified: i64,
        pages_deleted: i64,
        pages_moved: i64,
        errors_json: Option<&str>,
    ) -> Result<(), StorageError> {
        self.engine.with_writer(|conn| {
            queries::scrape_runs::finish_run(
                conn,
                run_id,
                status,
                pages_scraped,
                revisions_scraped,
                files_downloaded,
                pages_new,
                pages_modified,
                pages_deleted,
                pages_moved,
                errors_json,
            )
        })
    }

    pub fn last_successful_run_end_time(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        self.engine.with_reader(queries::scrape_runs::last_successful_run_end_time)
    }

    pub fn has_any_successful_run(&self) -> Result<bool, StorageError> {
        self.engine.with_reader(queries::scrape_runs::has_any_successful_run)
    }

    pub fn get_run(&self, run_id: i64) -> Result<Option<ScrapeRun>, StorageError> {
        self.engine.with_reader(|conn| queries::scrape_runs::get_run(conn, run_id))
    }
}

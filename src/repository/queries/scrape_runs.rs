//! `ScrapeRun` lifecycle: begin, update counters, complete/fail/mark-partial.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::storage_error::sqe;
use crate::errors::StorageError;
use crate::models::{RunStatus, RunType, ScrapeRun};

pub fn begin_run(conn: &Connection, run_type: RunType) -> Result<i64, StorageError> {
    conn.execute(
        "INSERT INTO scrape_runs (run_type, status, start_time) VALUES (?1, ?2, ?3)",
        params![run_type.as_str(), RunStatus::Running.as_str(), Utc::now().to_rfc3339()],
    )
    .map_err(sqe)?;
    Ok(conn.last_insert_rowid())
}

#[allow(clippy::too_many_arguments)]
pub fn finish_run(
    conn: &Connection,
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
    conn.execute(
        "UPDATE scrape_runs SET
            status = ?2, end_time = ?3, pages_scraped = ?4, revisions_scraped = ?5,
            files_downloaded = ?6, pages_new = ?7, pages_modified = ?8,
            pages_deleted = ?9, pages_moved = ?10, errors_json = ?11
         WHERE run_id = ?1",
        params![
            run_id,
            status.as_str(),
            Utc::now().to_rfc3339(),
            pages_scraped,
            revisions_scraped,
            files_downloaded,
            pages_new,
            pages_modified,
            pages_deleted,
            pages_moved,
            errors_json,
        ],
    )
    .map_err(sqe)?;
    Ok(())
}

/// The end time of the most recent run that completed successfully
/// (`completed` or `partial`), used as the incremental orchestrator's
/// recent-changes window lower bound.
pub fn last_successful_run_end_time(conn: &Connection) -> Result<Option<chrono::DateTime<Utc>>, StorageError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT end_time FROM scrape_runs
             WHERE status IN ('completed', 'partial') AND end_time IS NOT NULL
             ORDER BY end_time DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(sqe)?;
    Ok(raw.and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)))
}

pub fn has_any_successful_run(conn: &Connection) -> Result<bool, StorageError> {
    Ok(last_successful_run_end_time(conn)?.is_some())
}

pub fn get_run(conn: &Connection, run_id: i64) -> Result<Option<ScrapeRun>, StorageError> {
    conn.query_row(
        "SELECT run_id, run_type, status, start_time, end_time, pages_scraped,
                revisions_scraped, files_downloaded, pages_new, pages_modified,
                pages_deleted, pages_moved, errors_json
         FROM scrape_runs WHERE run_id = ?1",
        params![run_id],
        row_to_run,
    )
    .optional()
    .map_err(sqe)
}

fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<ScrapeRun> {
    let run_type: String = row.get(1)?;
    let status: String = row.get(2)?;
    let start_time: String = row.get(3)?;
    let end_time: Option<String> = row.get(4)?;
    Ok(ScrapeRun {
        run_id: row.get(0)?,
        run_type: RunType::from_str(&run_type).unwrap_or(RunType::Full),
        status: RunStatus::from_str(&status).unwrap_or(RunStatus::Failed),
        start_time: parse_rfc3339(&start_time),
        end_time: end_time.map(|s| parse_rfc3339(&s)),
        pages_scraped: row.get(5)?,
        revisions_scraped: row.get(6)?,
        files_downloaded: row.get(7)?,
        pages_new: row.get(8)?,
        pages_modified: row.get(9)?,
        pages_deleted: row.get(10)?,
        pages_moved: row.get(11)?,
        errors_json: row.get(12)?,
    })
}

fn parse_rfc3339(s: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

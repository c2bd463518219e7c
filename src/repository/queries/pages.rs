//! Page CRUD: upsert, rename, soft-delete, update-info for change detection.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::storage_error::sqe;
use crate::errors::StorageError;
use crate::models::{Page, PageUpdateInfo};

/// Inserts pages that are new, updates `title`/`is_redirect`/`updated_at`
/// for pages that already exist. Idempotent: re-running with the same input
/// leaves the table unchanged (§8 idempotence).
pub fn upsert_pages(conn: &Connection, pages: &[Page]) -> Result<(), StorageError> {
    for page in pages {
        conn.execute(
            "INSERT INTO pages (page_id, namespace, title, is_redirect, is_deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)
             ON CONFLICT(page_id) DO UPDATE SET
                title = excluded.title,
                is_redirect = excluded.is_redirect,
                updated_at = excluded.updated_at",
            params![
                page.page_id,
                page.namespace,
                page.title,
                page.is_redirect as i64,
                page.created_at.to_rfc3339(),
                page.updated_at.to_rfc3339(),
            ],
        )
        .map_err(sqe)?;
    }
    Ok(())
}

pub fn mark_page_deleted(conn: &Connection, page_id: i64, at: DateTime<Utc>) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE pages SET is_deleted = 1, updated_at = ?2 WHERE page_id = ?1",
        params![page_id, at.to_rfc3339()],
    )
    .map_err(sqe)?;
    Ok(())
}

/// A page move: same `page_id`, new title/namespace. Revisions and links
/// keyed by `page_id` require no further change.
pub fn rename_page(
    conn: &Connection,
    page_id: i64,
    new_namespace: i64,
    new_title: &str,
    at: DateTime<Utc>,
) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE pages SET namespace = ?2, title = ?3, updated_at = ?4 WHERE page_id = ?1",
        params![page_id, new_namespace, new_title, at.to_rfc3339()],
    )
    .map_err(sqe)?;
    Ok(())
}

pub fn get_page_by_id(conn: &Connection, page_id: i64) -> Result<Option<Page>, StorageError> {
    conn.query_row(
        "SELECT page_id, namespace, title, is_redirect, is_deleted, created_at, updated_at
         FROM pages WHERE page_id = ?1",
        params![page_id],
        row_to_page,
    )
    .optional()
    .map_err(sqe)
}

/// Everything the change detector (C11) needs to decide whether a known
/// page has new revisions, without loading the full revision history.
pub fn get_page_update_info(conn: &Connection, page_id: i64) -> Result<Option<PageUpdateInfo>, StorageError> {
    conn.query_row(
        "SELECT p.page_id, p.namespace, p.title, p.is_redirect,
                MAX(r.revision_id), MAX(r.timestamp), COUNT(r.revision_id)
         FROM pages p
         LEFT JOIN revisions r ON r.page_id = p.page_id
         WHERE p.page_id = ?1
         GROUP BY p.page_id",
        params![page_id],
        |row| {
            let highest: Option<i64> = row.get(4)?;
            let last_ts: Option<String> = row.get(5)?;
            Ok(PageUpdateInfo {
                page_id: row.get(0)?,
                namespace: row.get(1)?,
                title: row.get(2)?,
                is_redirect: row.get::<_, i64>(3)? != 0,
                highest_revision_id: highest.unwrap_or(0),
                last_revision_ts: last_ts
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|d| d.with_timezone(&Utc)),
                total_revisions: row.get(6)?,
            })
        },
    )
    .optional()
    .map_err(sqe)
}

/// Splits `candidate_ids` into those already present as pages and those that
/// are not — used by discovery (C6) to avoid re-announcing known pages.
pub fn filter_new_pages(conn: &Connection, candidate_ids: &[i64]) -> Result<Vec<i64>, StorageError> {
    let mut new_ids = Vec::new();
    for &id in candidate_ids {
        let exists: bool = conn
            .query_row("SELECT 1 FROM pages WHERE page_id = ?1", params![id], |_| Ok(()))
            .optional()
            .map_err(sqe)?
            .is_some();
        if !exists {
            new_ids.push(id);
        }
    }
    Ok(new_ids)
}

pub fn stream_page_ids(conn: &Connection, include_deleted: bool) -> Result<Vec<i64>, StorageError> {
    let sql = if include_deleted {
        "SELECT page_id FROM pages ORDER BY page_id"
    } else {
        "SELECT page_id FROM pages WHERE is_deleted = 0 ORDER BY page_id"
    };
    let mut stmt = conn.prepare(sql).map_err(sqe)?;
    let ids = stmt
        .query_map([], |row| row.get(0))
        .map_err(sqe)?
        .collect::<Result<Vec<i64>, _>>()
        .map_err(sqe)?;
    Ok(ids)
}

/// Walks every page in `page_id` order, invoking `f` for each one matching
/// `predicate` without ever collecting the result set into memory — the
/// verifier and any future exporter need to traverse the whole store, not
/// hold it all at once.
pub fn stream_pages<P, F>(conn: &Connection, predicate: P, mut f: F) -> Result<(), StorageError>
where
    P: Fn(&Page) -> bool,
    F: FnMut(Page) -> Result<(), StorageError>,
{
    let mut stmt = conn
        .prepare(
            "SELECT page_id, namespace, title, is_redirect, is_deleted, created_at, updated_at
             FROM pages ORDER BY page_id",
        )
        .map_err(sqe)?;
    let mut rows = stmt.query([]).map_err(sqe)?;
    while let Some(row) = rows.next().map_err(sqe)? {
        let page = row_to_page(row).map_err(sqe)?;
        if predicate(&page) {
            f(page)?;
        }
    }
    Ok(())
}

fn row_to_page(row: &rusqlite::Row) -> rusqlite::Result<Page> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(Page {
        page_id: row.get(0)?,
        namespace: row.get(1)?,
        title: row.get(2)?,
        is_redirect: row.get::<_, i64>(3)? != 0,
        is_deleted: row.get::<_, i64>(4)? != 0,
        created_at: parse_rfc3339(&created_at),
        updated_at: parse_rfc3339(&updated_at),
    })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

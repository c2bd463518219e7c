//! Revision CRUD. Revisions are append-only: `upsert_revisions` is really
//! insert-if-absent, since a stored revision never changes (§2).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::storage_error::sqe;
use crate::errors::StorageError;
use crate::models::Revision;

/// Inserts revisions not already present, keyed by `revision_id`. Returns
/// the count actually inserted so callers can report progress without a
/// second query.
pub fn upsert_revisions(conn: &Connection, revisions: &[Revision]) -> Result<usize, StorageError> {
    let mut inserted = 0usize;
    for rev in revisions {
        let tags_json = serde_json::to_string(&rev.tags)?;
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO revisions
                 (revision_id, page_id, parent_revision_id, timestamp, user, user_id, comment, size, sha1, content, tags)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    rev.revision_id,
                    rev.page_id,
                    rev.parent_revision_id,
                    rev.timestamp.to_rfc3339(),
                    rev.user,
                    rev.user_id,
                    rev.comment,
                    rev.size as i64,
                    rev.sha1,
                    rev.content,
                    tags_json,
                ],
            )
            .map_err(sqe)?;
        inserted += changed;
    }
    Ok(inserted)
}

pub fn revision_exists(conn: &Connection, revision_id: i64) -> Result<bool, StorageError> {
    conn.query_row(
        "SELECT 1 FROM revisions WHERE revision_id = ?1",
        params![revision_id],
        |_| Ok(()),
    )
    .optional()
    .map_err(sqe)
    .map(|r| r.is_some())
}

pub fn count_revisions_for_page(conn: &Connection, page_id: i64) -> Result<i64, StorageError> {
    conn.query_row(
        "SELECT COUNT(*) FROM revisions WHERE page_id = ?1",
        params![page_id],
        |row| row.get(0),
    )
    .map_err(sqe)
}

/// A shallow gap check for the integrity verifier (C14): revisions of a
/// given page should have monotonically increasing ids when ordered by
/// timestamp. Does not account for intentionally-suppressed revisions.
pub fn revision_ids_for_page(conn: &Connection, page_id: i64) -> Result<Vec<i64>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT revision_id FROM revisions WHERE page_id = ?1 ORDER BY timestamp ASC")
        .map_err(sqe)?;
    let ids = stmt
        .query_map(params![page_id], |row| row.get(0))
        .map_err(sqe)?
        .collect::<Result<Vec<i64>, _>>()
        .map_err(sqe)?;
    Ok(ids)
}

/// Walks a page's revisions in timestamp order, invoking `f` per row without
/// collecting them into memory first — a page's content can be large enough
/// across its whole history that the verifier must not hold it all at once.
pub fn stream_revisions<F>(conn: &Connection, page_id: i64, mut f: F) -> Result<(), StorageError>
where
    F: FnMut(Revision) -> Result<(), StorageError>,
{
    let mut stmt = conn
        .prepare(
            "SELECT revision_id, page_id, parent_revision_id, timestamp, user, user_id,
                    comment, size, sha1, content, tags
             FROM revisions WHERE page_id = ?1 ORDER BY timestamp ASC",
        )
        .map_err(sqe)?;
    let mut rows = stmt.query(params![page_id]).map_err(sqe)?;
    while let Some(row) = rows.next().map_err(sqe)? {
        f(row_to_revision(row).map_err(sqe)?)?;
    }
    Ok(())
}

fn row_to_revision(row: &rusqlite::Row) -> rusqlite::Result<Revision> {
    let timestamp: String = row.get(3)?;
    let tags_json: String = row.get(10)?;
    Ok(Revision {
        revision_id: row.get(0)?,
        page_id: row.get(1)?,
        parent_revision_id: row.get(2)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        user: row.get(4)?,
        user_id: row.get(5)?,
        comment: row.get(6)?,
        size: row.get::<_, i64>(7)? as u64,
        sha1: row.get(8)?,
        content: row.get(9)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
    })
}

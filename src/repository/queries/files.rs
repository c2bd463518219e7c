//! File metadata CRUD and the incremental change classification (§4.8).

use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::storage_error::sqe;
use crate::errors::StorageError;
use crate::models::{FileChange, FileRecord};

pub fn get_file(conn: &Connection, title: &str) -> Result<Option<FileRecord>, StorageError> {
    conn.query_row(
        "SELECT title, url, description_url, sha1, size, width, height, mime_type,
                uploaded_at, uploader, local_path, is_deleted
         FROM files WHERE title = ?1",
        params![title],
        row_to_file,
    )
    .optional()
    .map_err(sqe)
}

/// Compares `incoming` against the stored record (if any) by sha1, the
/// authoritative identity for file content. Does not mutate storage.
pub fn classify_file_change(
    conn: &Connection,
    incoming: &FileRecord,
) -> Result<FileChange, StorageError> {
    match get_file(conn, &incoming.title)? {
        None => Ok(FileChange::New),
        Some(existing) if existing.is_deleted => Ok(FileChange::New),
        Some(existing) if existing.sha1 == incoming.sha1 => Ok(FileChange::Unchanged),
        Some(_) => Ok(FileChange::Modified),
    }
}

pub fn upsert_file(conn: &Connection, file: &FileRecord) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO files
         (title, url, description_url, sha1, size, width, height, mime_type,
          uploaded_at, uploader, local_path, is_deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0)
         ON CONFLICT(title) DO UPDATE SET
            url = excluded.url,
            description_url = excluded.description_url,
            sha1 = excluded.sha1,
            size = excluded.size,
            width = excluded.width,
            height = excluded.height,
            mime_type = excluded.mime_type,
            uploaded_at = excluded.uploaded_at,
            uploader = excluded.uploader,
            local_path = excluded.local_path,
            is_deleted = 0",
        params![
            file.title,
            file.url,
            file.description_url,
            file.sha1,
            file.size as i64,
            file.width,
            file.height,
            file.mime_type,
            file.uploaded_at.to_rfc3339(),
            file.uploader,
            file.local_path,
        ],
    )
    .map_err(sqe)?;
    Ok(())
}

pub fn mark_file_deleted(conn: &Connection, title: &str) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE files SET is_deleted = 1 WHERE title = ?1",
        params![title],
    )
    .map_err(sqe)?;
    Ok(())
}

pub fn stream_file_titles(conn: &Connection) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT title FROM files WHERE is_deleted = 0 ORDER BY title")
        .map_err(sqe)?;
    let titles = stmt
        .query_map([], |row| row.get(0))
        .map_err(sqe)?
        .collect::<Result<Vec<String>, _>>()
        .map_err(sqe)?;
    Ok(titles)
}

fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    let uploaded_at: String = row.get(8)?;
    Ok(FileRecord {
        title: row.get(0)?,
        url: row.get(1)?,
        description_url: row.get(2)?,
        sha1: row.get(3)?,
        size: row.get::<_, i64>(4)? as u64,
        width: row.get(5)?,
        height: row.get(6)?,
        mime_type: row.get(7)?,
        uploaded_at: chrono::DateTime::parse_from_rfc3339(&uploaded_at)
            .map(|d| d.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        uploader: row.get(9)?,
        local_path: row.get(10)?,
        is_deleted: row.get::<_, i64>(11)? != 0,
    })
}

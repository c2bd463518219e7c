//! v001: pages, revisions, files, links, scrape_runs — the full data model.

use rusqlite::Connection;

use crate::errors::StorageError;

pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            page_id      INTEGER PRIMARY KEY,
            namespace    INTEGER NOT NULL,
            title        TEXT NOT NULL,
            is_redirect  INTEGER NOT NULL DEFAULT 0,
            is_deleted   INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_pages_namespace_title
            ON pages(namespace, title);
        CREATE INDEX IF NOT EXISTS idx_pages_deleted
            ON pages(is_deleted);

        CREATE TABLE IF NOT EXISTS revisions (
            revision_id        INTEGER PRIMARY KEY,
            page_id            INTEGER NOT NULL REFERENCES pages(page_id),
            parent_revision_id INTEGER,
            timestamp          TEXT NOT NULL,
            user               TEXT,
            user_id            INTEGER,
            comment            TEXT,
            size               INTEGER NOT NULL,
            sha1               TEXT,
            content            TEXT,
            tags               TEXT NOT NULL DEFAULT '[]'
        );

        CREATE INDEX IF NOT EXISTS idx_revisions_page
            ON revisions(page_id, timestamp);

        CREATE TABLE IF NOT EXISTS files (
            title            TEXT PRIMARY KEY,
            url              TEXT NOT NULL,
            description_url  TEXT,
            sha1             TEXT NOT NULL,
            size             INTEGER NOT NULL,
            width            INTEGER,
            height           INTEGER,
            mime_type        TEXT,
            uploaded_at      TEXT NOT NULL,
            uploader         TEXT,
            local_path       TEXT,
            is_deleted       INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS links (
            source_page_id INTEGER NOT NULL REFERENCES pages(page_id),
            target_title   TEXT NOT NULL,
            target_page_id INTEGER,
            link_type      TEXT NOT NULL,
            PRIMARY KEY (source_page_id, target_title, link_type)
        );

        CREATE INDEX IF NOT EXISTS idx_links_target
            ON links(target_title);

        CREATE TABLE IF NOT EXISTS scrape_runs (
            run_id             INTEGER PRIMARY KEY AUTOINCREMENT,
            run_type           TEXT NOT NULL,
            status             TEXT NOT NULL,
            start_time         TEXT NOT NULL,
            end_time           TEXT,
            pages_scraped      INTEGER NOT NULL DEFAULT 0,
            revisions_scraped  INTEGER NOT NULL DEFAULT 0,
            files_downloaded   INTEGER NOT NULL DEFAULT 0,
            pages_new          INTEGER NOT NULL DEFAULT 0,
            pages_modified     INTEGER NOT NULL DEFAULT 0,
            pages_deleted      INTEGER NOT NULL DEFAULT 0,
            pages_moved        INTEGER NOT NULL DEFAULT 0,
            errors_json        TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_scrape_runs_status_end
            ON scrape_runs(status, end_time);
        ",
    )
    .map_err(crate::errors::storage_error::sqe)?;
    Ok(())
}

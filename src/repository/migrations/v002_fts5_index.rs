//! v002: full-text index over revision content, maintained by triggers so
//! every caller that writes through `queries::revisions` gets it for free.

use rusqlite::Connection;

use crate::errors::storage_error::sqe;
use crate::errors::StorageError;

pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        CREATE VIRTUAL TABLE IF NOT EXISTS fts_revisions USING fts5(
            title,
            content,
            content='',
            tokenize='porter unicode61'
        );

        CREATE TRIGGER IF NOT EXISTS trg_revisions_fts_insert
        AFTER INSERT ON revisions
        WHEN NEW.content IS NOT NULL
        BEGIN
            INSERT INTO fts_revisions(rowid, title, content)
            SELECT NEW.revision_id, p.title, NEW.content
            FROM pages p WHERE p.page_id = NEW.page_id;
        END;

        CREATE TRIGGER IF NOT EXISTS trg_revisions_fts_delete
        AFTER DELETE ON revisions
        BEGIN
            INSERT INTO fts_revisions(fts_revisions, rowid, title, content)
            VALUES ('delete', OLD.revision_id, '', COALESCE(OLD.content, ''));
        END;
        ",
    )
    .map_err(sqe)?;
    Ok(())
}

//! Link graph CRUD. `replace_outgoing_links` is the only write path: a
//! page's outgoing edges are replaced wholesale each time its content is
//! re-scraped, which keeps the graph one-directional and avoids having to
//! diff individual links (§9 design note: indexing stays one-directional).

use rusqlite::{params, Connection};

use crate::errors::storage_error::sqe;
use crate::errors::StorageError;
use crate::models::{Link, LinkType};

/// The extractor (C9) parses wikitext alone and never knows a target's
/// page id, so every incoming `Link.target_page_id` is `None`. Resolution
/// against the current `pages` table happens here, at write time, so a
/// link re-resolves automatically whenever its target is later discovered.
pub fn replace_outgoing_links(
    conn: &Connection,
    source_page_id: i64,
    links: &[Link],
) -> Result<(), StorageError> {
    conn.execute(
        "DELETE FROM links WHERE source_page_id = ?1",
        params![source_page_id],
    )
    .map_err(sqe)?;

    for link in links {
        conn.execute(
            "INSERT OR IGNORE INTO links (source_page_id, target_title, target_page_id, link_type)
             VALUES (
                ?1, ?2,
                (SELECT page_id FROM pages WHERE title = ?2 AND is_deleted = 0 LIMIT 1),
                ?3
             )",
            params![source_page_id, link.target_title, link.link_type.as_str()],
        )
        .map_err(sqe)?;
    }
    Ok(())
}

pub fn outgoing_links(conn: &Connection, source_page_id: i64) -> Result<Vec<Link>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT source_page_id, target_title, target_page_id, link_type
             FROM links WHERE source_page_id = ?1",
        )
        .map_err(sqe)?;
    let links = stmt
        .query_map(params![source_page_id], row_to_link)
        .map_err(sqe)?
        .collect::<Result<Vec<Link>, _>>()
        .map_err(sqe)?;
    Ok(links)
}

/// Sampled for the integrity verifier (C14): links whose `target_title`
/// does not resolve to a known, non-deleted page.
pub fn broken_links_sample(conn: &Connection, limit: i64) -> Result<Vec<Link>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT l.source_page_id, l.target_title, l.target_page_id, l.link_type
             FROM links l
             LEFT JOIN pages p ON p.page_id = l.target_page_id AND p.is_deleted = 0
             WHERE l.link_type IN ('wikilink', 'file', 'category') AND p.page_id IS NULL
             LIMIT ?1",
        )
        .map_err(sqe)?;
    let links = stmt
        .query_map(params![limit], row_to_link)
        .map_err(sqe)?
        .collect::<Result<Vec<Link>, _>>()
        .map_err(sqe)?;
    Ok(links)
}

fn row_to_link(row: &rusqlite::Row) -> rusqlite::Result<Link> {
    let link_type: String = row.get(3)?;
    Ok(Link {
        source_page_id: row.get(0)?,
        target_title: row.get(1)?,
        target_page_id: row.get(2)?,
        link_type: LinkType::from_str(&link_type).unwrap_or(LinkType::Wikilink),
    })
}

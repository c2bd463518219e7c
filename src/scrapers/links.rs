//! C9: parses wikitext into outgoing links. Pure and total — malformed
//! input never fails, it just contributes zero links.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::{Link, LinkType};

/// Maps a wiki's own namespace names to their namespace ids, fetched once at
/// C2 bootstrap via `siprop=namespaces` (§4.9). Namespace ids are stable
/// across every MediaWiki install regardless of content language; only the
/// display name is localized, so classification keys off the id rather than
/// a hardcoded English prefix like `"file:"`.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    by_name: std::collections::HashMap<String, i64>,
}

const NS_FILE: i64 = 6;
const NS_CATEGORY: i64 = 14;

impl NamespaceTable {
    pub fn insert(&mut self, name: &str, id: i64) {
        let name = name.trim();
        if !name.is_empty() {
            self.by_name.insert(name.to_ascii_lowercase(), id);
        }
    }

    /// English fallback for contexts with no live siteinfo probe yet (unit
    /// tests, or the rare call racing the bootstrap probe).
    pub fn default_english() -> Self {
        let mut table = Self::default();
        table.insert("file", NS_FILE);
        table.insert("image", NS_FILE);
        table.insert("category", NS_CATEGORY);
        table
    }

    fn namespace_id(&self, prefix: &str) -> Option<i64> {
        self.by_name.get(&prefix.trim().to_ascii_lowercase()).copied()
    }
}

fn wikilink_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[([^\[\]|]+)(?:\|[^\]]*)?\]\]").unwrap())
}

fn template_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^{}|]+?)\s*(?:\|[^{}]*)?\}\}").unwrap())
}

/// Parses `[[Target|...]]`, `{{Template}}`, `[[File:...]]`, and
/// `[[Category:...]]` forms out of `wikitext`, classifying namespace-
/// prefixed targets against `namespaces` (the live table fetched at C2
/// bootstrap, or `NamespaceTable::default_english()` where none is
/// available). Exotic or malformed markup is silently skipped
/// (DEBUG-logged), matching the extractor's "pure and total" contract
/// (§4.9).
pub fn extract(source_page_id: i64, wikitext: &str, namespaces: &NamespaceTable) -> Vec<Link> {
    let mut links = Vec::new();

    for caps in wikilink_re().captures_iter(wikitext) {
        let Some(raw_target) = caps.get(1) else {
            debug!(source_page_id, "wikilink with no capturable target, skipping");
            continue;
        };
        let raw_target = raw_target.as_str().trim();
        if raw_target.is_empty() {
            continue;
        }
        let (link_type, target_title) = classify_wikilink(raw_target, namespaces);
        links.push(Link {
            source_page_id,
            target_title,
            target_page_id: None,
            link_type,
        });
    }

    for caps in template_re().captures_iter(wikitext) {
        let Some(raw_target) = caps.get(1) else {
            continue;
        };
        let target_title = normalize_title(raw_target.as_str().trim());
        if target_title.is_empty() {
            debug!(source_page_id, "template transclusion with empty name, skipping");
            continue;
        }
        links.push(Link {
            source_page_id,
            target_title,
            target_page_id: None,
            link_type: LinkType::Template,
        });
    }

    links
}

fn classify_wikilink(raw_target: &str, namespaces: &NamespaceTable) -> (LinkType, String) {
    if let Some((prefix, rest)) = raw_target.split_once(':') {
        match namespaces.namespace_id(prefix) {
            Some(NS_FILE) => return (LinkType::File, normalize_title(rest)),
            Some(NS_CATEGORY) => return (LinkType::Category, normalize_title(rest)),
            _ => {}
        }
    }
    (LinkType::Wikilink, normalize_title(raw_target))
}

fn normalize_title(title: &str) -> String {
    title.trim().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> NamespaceTable {
        NamespaceTable::default_english()
    }

    #[test]
    fn extracts_plain_wikilink() {
        let links = extract(1, "See [[Poring]] for details.", &ns());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link_type, LinkType::Wikilink);
        assert_eq!(links[0].target_title, "Poring");
    }

    #[test]
    fn extracts_piped_wikilink_by_target_only() {
        let links = extract(1, "A [[Prontera|the capital city]] visit.", &ns());
        assert_eq!(links[0].target_title, "Prontera");
    }

    #[test]
    fn extracts_file_and_category_forms() {
        let links = extract(1, "[[File:Poring.png|thumb]] [[Category:Monsters]]", &ns());
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].link_type, LinkType::File);
        assert_eq!(links[0].target_title, "Poring.png");
        assert_eq!(links[1].link_type, LinkType::Category);
        assert_eq!(links[1].target_title, "Monsters");
    }

    #[test]
    fn classifies_by_localized_namespace_name_not_hardcoded_english() {
        let mut table = NamespaceTable::default();
        table.insert("Fichier", NS_FILE);
        table.insert("Catégorie", NS_CATEGORY);
        let links = extract(1, "[[Fichier:Poring.png]] [[Catégorie:Monstres]] [[File:Unmapped.png]]", &table);
        assert_eq!(links[0].link_type, LinkType::File);
        assert_eq!(links[1].link_type, LinkType::Category);
        // "File:" is not a namespace this wiki's table knows, so it's a plain wikilink.
        assert_eq!(links[2].link_type, LinkType::Wikilink);
        assert_eq!(links[2].target_title, "File:Unmapped.png");
    }

    #[test]
    fn extracts_template_transclusion() {
        let links = extract(1, "{{Infobox monster|name=Poring}}", &ns());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link_type, LinkType::Template);
        assert_eq!(links[0].target_title, "Infobox_monster");
    }

    #[test]
    fn malformed_markup_yields_no_links_not_a_failure() {
        let links = extract(1, "[[ unterminated and {{ also unterminated", &ns());
        assert!(links.is_empty());
    }

    #[test]
    fn replacing_same_content_twice_yields_identical_links() {
        let text = "[[A]] {{B}} [[File:C.png]]";
        assert_eq!(extract(1, text, &ns()), extract(1, text, &ns()));
    }
}

//! Property coverage for C9's idempotence and totality contracts (§8).

use proptest::prelude::*;
use wiki_archivist::scrapers::links::{extract, NamespaceTable};

proptest! {
    /// §8 property 11: re-extracting from unchanged content yields an
    /// identical link set.
    #[test]
    fn extracting_the_same_content_twice_is_idempotent(
        titles in prop::collection::vec("[A-Za-z][A-Za-z0-9_]{0,12}", 0..8),
    ) {
        let wikitext: String = titles.iter().map(|t| format!("[[{t}]] ")).collect();
        let namespaces = NamespaceTable::default_english();

        let first = extract(1, &wikitext, &namespaces);
        let second = extract(1, &wikitext, &namespaces);

        prop_assert_eq!(first, second);
    }

    /// §4.9: the extractor is total — arbitrary bytes never panic and never
    /// produce an error, only zero or more links.
    #[test]
    fn extraction_never_panics_on_arbitrary_text(text in ".{0,500}") {
        let _ = extract(1, &text, &NamespaceTable::default_english());
    }
}

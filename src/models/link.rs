use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Wikilink,
    Template,
    File,
    Category,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Wikilink => "wikilink",
            LinkType::Template => "template",
            LinkType::File => "file",
            LinkType::Category => "category",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "wikilink" => Some(LinkType::Wikilink),
            "template" => Some(LinkType::Template),
            "file" => Some(LinkType::File),
            "category" => Some(LinkType::Category),
            _ => None,
        }
    }
}

/// A directed edge from a source page's current content to a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source_page_id: i64,
    pub target_title: String,
    pub target_page_id: Option<i64>,
    pub link_type: LinkType,
}

//! C6: enumerates page identities within chosen namespaces.

use serde_json::Value;

use crate::api::types::{require_fields, typed_get_i64, typed_get_str};
use crate::api::{paginate, ApiClient};
use crate::errors::ApiError;
use crate::models::Page;

const PAGE_LIMIT: &str = "500";

pub async fn discover(client: &ApiClient, namespace: i64) -> Result<Vec<Page>, ApiError> {
    let context = format!("discover(ns={namespace})");
    let params = vec![
        ("list".to_string(), "allpages".to_string()),
        ("apnamespace".to_string(), namespace.to_string()),
        ("aplimit".to_string(), PAGE_LIMIT.to_string()),
    ];

    let mut pages = Vec::new();
    paginate(client, &params, "/query/allpages", &context, |response| {
        parse_batch(response, &mut pages, &context).map_err(|e| e.to_string())
    })
    .await?;
    Ok(pages)
}

pub async fn discover_all(client: &ApiClient, namespaces: &[i64]) -> Result<Vec<Page>, ApiError> {
    let mut all = Vec::new();
    for &ns in namespaces {
        all.extend(discover(client, ns).await?);
    }
    Ok(all)
}

fn parse_batch(response: &Value, out: &mut Vec<Page>, context: &str) -> Result<(), ApiError> {
    let entries = response
        .pointer("/query/allpages")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::response(context, "/query/allpages is not an array"))?;

    for entry in entries {
        require_fields(entry, &["pageid", "ns", "title"], context)?;
        let page_id = typed_get_i64(entry, "pageid", context)?;
        let namespace = typed_get_i64(entry, "ns", context)?;
        let title = typed_get_str(entry, "title", context)?;
        let is_redirect = entry.get("redirect").is_some();
        out.push(Page::new(page_id, namespace, title, is_redirect));
    }
    Ok(())
}

/// The 16 standard MediaWiki namespaces, used as the default discovery scope
/// when the caller does not restrict to a subset (§4.12 step 2).
pub const DEFAULT_NAMESPACES: [i64; 16] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_batch_marks_redirect_by_key_presence() {
        let response = json!({
            "query": {
                "allpages": [
                    {"pageid": 1369, "ns": 14, "title": "Category:Acolyte"},
                    {"pageid": 1370, "ns": 14, "title": "Category:Acronyms", "redirect": ""},
                ]
            }
        });
        let mut pages = Vec::new();
        parse_batch(&response, &mut pages, "ctx").unwrap();
        assert_eq!(pages.len(), 2);
        assert!(!pages[0].is_redirect);
        assert!(pages[1].is_redirect);
    }
}

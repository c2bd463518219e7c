//! C7: fetches a page's revision history, optionally only the tail after a
//! known high-water mark.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::types::{require_fields, typed_get_i64, typed_get_str, typed_get_u64};
use crate::api::{paginate, ApiClient};
use crate::errors::ApiError;
use crate::models::Revision;

const RV_LIMIT: &str = "500";
const RV_PROP: &str = "ids|timestamp|user|userid|comment|size|sha1|tags|content";

pub async fn fetch_revisions(
    client: &ApiClient,
    page_id: i64,
    start_after_id: Option<i64>,
) -> Result<Vec<Revision>, ApiError> {
    let context = format!("fetch_revisions(page_id={page_id})");
    let mut params = vec![
        ("prop".to_string(), "revisions".to_string()),
        ("pageids".to_string(), page_id.to_string()),
        ("rvprop".to_string(), RV_PROP.to_string()),
        ("rvdir".to_string(), "newer".to_string()),
        ("rvlimit".to_string(), RV_LIMIT.to_string()),
    ];
    if let Some(after) = start_after_id {
        params.push(("rvstartid".to_string(), (after + 1).to_string()));
    }

    let result_path = format!("/query/pages/{page_id}/revisions");
    let mut revisions = Vec::new();
    paginate(client, &params, &result_path, &context, |response| {
        parse_batch(response, page_id, &mut revisions, &context).map_err(|e| e.to_string())
    })
    .await?;
    Ok(revisions)
}

fn parse_batch(
    response: &Value,
    page_id: i64,
    out: &mut Vec<Revision>,
    context: &str,
) -> Result<(), ApiError> {
    let pointer = format!("/query/pages/{page_id}/revisions");
    let entries = response
        .pointer(&pointer)
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::response(context, format!("{pointer} is not an array")))?;

    for entry in entries {
        require_fields(entry, &["revid", "timestamp", "size"], context)?;
        let revision_id = typed_get_i64(entry, "revid", context)?;
        let parent_revision_id = entry.get("parentid").and_then(Value::as_i64).filter(|&p| p != 0);
        let timestamp_str = typed_get_str(entry, "timestamp", context)?;
        let timestamp = DateTime::parse_from_rfc3339(timestamp_str)
            .map_err(|e| ApiError::response(context, format!("bad timestamp: {e}")))?
            .with_timezone(&Utc);
        let user = entry.get("user").and_then(Value::as_str).map(str::to_string);
        let user_id = entry.get("userid").and_then(Value::as_i64);
        let comment = entry
            .get("comment")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let size = typed_get_u64(entry, "size", context)?;
        let sha1 = entry.get("sha1").and_then(Value::as_str).map(str::to_string);
        // Suppressed revisions omit `*`/`content` entirely rather than failing.
        let content = entry
            .get("slots")
            .and_then(|s| s.pointer("/main/*"))
            .or_else(|| entry.get("*"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let tags = entry
            .get("tags")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        out.push(Revision {
            revision_id,
            page_id,
            parent_revision_id,
            timestamp,
            user,
            user_id,
            comment,
            size,
            sha1,
            content,
            tags,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_batch_treats_missing_content_as_null_not_failure() {
        let response = json!({
            "query": { "pages": { "42": { "revisions": [
                {"revid": 100, "timestamp": "2024-01-01T00:00:00Z", "size": 10, "user": "Alice"}
            ]}}}
        });
        let mut out = Vec::new();
        parse_batch(&response, 42, &mut out, "ctx").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, None);
    }

    #[test]
    fn parse_batch_reads_slot_content_when_present() {
        let response = json!({
            "query": { "pages": { "42": { "revisions": [
                {"revid": 100, "timestamp": "2024-01-01T00:00:00Z", "size": 10,
                 "slots": {"main": {"*": "wikitext here"}}}
            ]}}}
        });
        let mut out = Vec::new();
        parse_batch(&response, 42, &mut out, "ctx").unwrap();
        assert_eq!(out[0].content.as_deref(), Some("wikitext here"));
    }
}

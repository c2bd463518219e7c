//! C10: reads the upstream recent-changes feed over a time window.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::api::{paginate, ApiClient};
use crate::errors::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub enum RecentChangeKind {
    New,
    Edit,
    Log { action: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentChange {
    pub rcid: i64,
    pub kind: RecentChangeKind,
    pub namespace: i64,
    pub title: String,
    pub page_id: i64,
    pub revid: Option<i64>,
    pub old_revid: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub user: Option<String>,
    pub user_id: Option<i64>,
    pub comment: Option<String>,
    pub old_len: Option<i64>,
    pub new_len: Option<i64>,
}

pub async fn read(
    client: &ApiClient,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<RecentChange>, ApiError> {
    if start >= end {
        return Err(ApiError::response(
            "read_recent_changes",
            format!("start >= end: start={start} end={end}"),
        ));
    }

    let context = "read_recent_changes";
    let params = vec![
        ("list".to_string(), "recentchanges".to_string()),
        ("rcdir".to_string(), "newer".to_string()),
        ("rcstart".to_string(), start.to_rfc3339()),
        ("rcend".to_string(), end.to_rfc3339()),
        ("rclimit".to_string(), "500".to_string()),
        (
            "rcprop".to_string(),
            "ids|title|timestamp|user|userid|comment|sizes|loginfo".to_string(),
        ),
        (
            "rctype".to_string(),
            "edit|new|log".to_string(),
        ),
    ];

    let mut changes = Vec::new();
    paginate(client, &params, "/query/recentchanges", context, |response| {
        parse_batch(response, &mut changes);
        Ok(())
    })
    .await?;
    Ok(changes)
}

fn parse_batch(response: &Value, out: &mut Vec<RecentChange>) {
    let Some(entries) = response.pointer("/query/recentchanges").and_then(Value::as_array) else {
        return;
    };

    for entry in entries {
        match parse_one(entry) {
            Some(change) => out.push(change),
            None => debug!(entry = %entry, "skipping malformed recent-changes entry"),
        }
    }
}

fn parse_one(entry: &Value) -> Option<RecentChange> {
    let rc_type = entry.get("type").and_then(Value::as_str)?;
    let kind = match rc_type {
        "new" => RecentChangeKind::New,
        "edit" => RecentChangeKind::Edit,
        "log" => RecentChangeKind::Log {
            action: entry.get("logaction").and_then(Value::as_str).unwrap_or("unknown").to_string(),
        },
        _ => return None,
    };

    let rcid = entry.get("rcid").and_then(Value::as_i64)?;
    let namespace = entry.get("ns").and_then(Value::as_i64)?;
    let title = entry.get("title").and_then(Value::as_str)?.to_string();
    let page_id = entry.get("pageid").and_then(Value::as_i64)?;
    let timestamp_str = entry.get("timestamp").and_then(Value::as_str)?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp_str).ok()?.with_timezone(&Utc);

    Some(RecentChange {
        rcid,
        kind,
        namespace,
        title,
        page_id,
        revid: entry.get("revid").and_then(Value::as_i64),
        old_revid: entry.get("old_revid").and_then(Value::as_i64),
        timestamp,
        user: entry.get("user").and_then(Value::as_str).map(str::to_string),
        user_id: entry.get("userid").and_then(Value::as_i64),
        comment: entry.get("comment").and_then(Value::as_str).map(str::to_string),
        old_len: entry.get("oldlen").and_then(Value::as_i64),
        new_len: entry.get("newlen").and_then(Value::as_i64),
    })
}

impl RecentChange {
    pub fn is_delete(&self) -> bool {
        matches!(&self.kind, RecentChangeKind::Log { action } if action == "delete")
    }

    pub fn is_move(&self) -> bool {
        matches!(&self.kind, RecentChangeKind::Log { action } if action == "move")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_one_classifies_delete_log_entries() {
        let entry = json!({
            "type": "log", "logaction": "delete", "rcid": 1, "ns": 0,
            "title": "Poring", "pageid": 3000, "timestamp": "2024-01-01T00:00:00Z"
        });
        let change = parse_one(&entry).unwrap();
        assert!(change.is_delete());
        assert!(!change.is_move());
    }

    #[test]
    fn parse_batch_skips_entries_missing_required_fields() {
        let response = json!({"query": {"recentchanges": [
            {"type": "edit"},
            {"type": "new", "rcid": 2, "ns": 0, "title": "Poring", "pageid": 2000, "timestamp": "2024-01-01T00:00:00Z"}
        ]}});
        let mut out = Vec::new();
        parse_batch(&response, &mut out);
        assert_eq!(out.len(), 1);
    }
}

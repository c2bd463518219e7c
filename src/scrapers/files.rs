//! C8: file metadata enumeration and verified byte download.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde_json::Value;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;

use crate::api::types::{require_fields, typed_get_str, typed_get_u64};
use crate::api::{paginate, ApiClient};
use crate::errors::ScrapeError;
use crate::models::FileRecord;
use crate::rate_limiter::RateLimiter;

const AI_LIMIT: &str = "500";
const AI_PROP: &str = "url|size|sha1|mime|timestamp|user|dimensions";

pub async fn discover_files(client: &ApiClient) -> Result<Vec<FileRecord>, crate::errors::ApiError> {
    let context = "discover_files";
    let params = vec![
        ("list".to_string(), "allimages".to_string()),
        ("aisort".to_string(), "name".to_string()),
        ("aiprop".to_string(), AI_PROP.to_string()),
        ("ailimit".to_string(), AI_LIMIT.to_string()),
    ];

    let mut files = Vec::new();
    paginate(client, &params, "/query/allimages", context, |response| {
        parse_batch(response, &mut files, context).map_err(|e| e.to_string())
    })
    .await?;
    Ok(files)
}

fn parse_batch(
    response: &Value,
    out: &mut Vec<FileRecord>,
    context: &str,
) -> Result<(), crate::errors::ApiError> {
    let entries = response
        .pointer("/query/allimages")
        .and_then(Value::as_array)
        .ok_or_else(|| crate::errors::ApiError::response(context, "/query/allimages is not an array"))?;

    for entry in entries {
        require_fields(entry, &["name", "url", "sha1", "size", "timestamp"], context)?;
        let title = typed_get_str(entry, "name", context)?.to_string();
        let url = typed_get_str(entry, "url", context)?.to_string();
        let description_url = entry
            .get("descriptionurl")
            .and_then(Value::as_str)
            .unwrap_or(&url)
            .to_string();
        let sha1 = typed_get_str(entry, "sha1", context)?.to_lowercase();
        let size = typed_get_u64(entry, "size", context)?;
        let width = entry.get("width").and_then(Value::as_u64).map(|w| w as u32);
        let height = entry.get("height").and_then(Value::as_u64).map(|h| h as u32);
        let mime_type = entry
            .get("mime")
            .and_then(Value::as_str)
            .unwrap_or("application/octet-stream")
            .to_string();
        let timestamp_str = typed_get_str(entry, "timestamp", context)?;
        let uploaded_at = DateTime::parse_from_rfc3339(timestamp_str)
            .map_err(|e| crate::errors::ApiError::response(context, format!("bad timestamp: {e}")))?
            .with_timezone(&Utc);
        let uploader = entry.get("user").and_then(Value::as_str).map(str::to_string);

        out.push(FileRecord {
            title,
            url,
            description_url,
            sha1,
            size,
            width,
            height,
            mime_type,
            uploaded_at,
            uploader,
            local_path: None,
            is_deleted: false,
        });
    }
    Ok(())
}

pub struct FileDownloader {
    http: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    data_dir: PathBuf,
}

impl FileDownloader {
    pub fn new(http: reqwest::Client, rate_limiter: Arc<RateLimiter>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            rate_limiter,
            data_dir: data_dir.into(),
        }
    }

    /// Deterministic target: `files/<first-uppercase-letter-of-title>/<title>`.
    pub fn target_path(&self, title: &str) -> PathBuf {
        let first = title
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('_');
        self.data_dir.join("files").join(first.to_string()).join(title)
    }

    /// Downloads and digest-verifies `file`'s bytes, returning the final
    /// path. Skips network I/O entirely if the target already exists with a
    /// matching on-disk digest (§8 property 9).
    pub async fn download(&self, file: &FileRecord) -> Result<PathBuf, ScrapeError> {
        let target = self.target_path(&file.title);

        if target.exists() {
            if let Ok(existing_digest) = digest_file(&target).await {
                if existing_digest == file.sha1 {
                    return Ok(target);
                }
            }
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScrapeError::Download {
                    title: file.title.clone(),
                    expected: file.sha1.clone(),
                    actual: format!("could not create directory: {e}"),
                })?;
        }

        self.rate_limiter.wait().await;

        let tmp_path = target.with_extension("part");
        let response = self.http.get(&file.url).send().await.map_err(|e| ScrapeError::Download {
            title: file.title.clone(),
            expected: file.sha1.clone(),
            actual: format!("request failed: {e}"),
        })?;

        let mut hasher = Sha1::new();
        let mut tmp_file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| ScrapeError::Download {
                title: file.title.clone(),
                expected: file.sha1.clone(),
                actual: format!("could not create temp file: {e}"),
            })?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ScrapeError::Download {
                title: file.title.clone(),
                expected: file.sha1.clone(),
                actual: format!("stream error: {e}"),
            })?;
            hasher.update(&chunk);
            tmp_file.write_all(&chunk).await.map_err(|e| ScrapeError::Download {
                title: file.title.clone(),
                expected: file.sha1.clone(),
                actual: format!("write error: {e}"),
            })?;
        }
        tmp_file.flush().await.ok();
        drop(tmp_file);

        let actual = hex::encode(hasher.finalize());
        if actual != file.sha1 {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(ScrapeError::Download {
                title: file.title.clone(),
                expected: file.sha1.clone(),
                actual,
            });
        }

        tokio::fs::rename(&tmp_path, &target)
            .await
            .map_err(|e| ScrapeError::Download {
                title: file.title.clone(),
                expected: file.sha1.clone(),
                actual: format!("rename failed: {e}"),
            })?;
        Ok(target)
    }
}

async fn digest_file(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    let mut hasher = Sha1::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_path_uses_first_uppercase_letter() {
        let downloader = FileDownloader::new(
            reqwest::Client::new(),
            Arc::new(RateLimiter::new(&crate::config::ScraperConfig::default(), false)),
            "/data",
        );
        let path = downloader.target_path("poring.png");
        assert_eq!(path, PathBuf::from("/data/files/P/poring.png"));
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::ArchivistConfig;
use crate::errors::ApiError;
use crate::rate_limiter::RateLimiter;
use crate::scrapers::links::NamespaceTable;

/// MediaWiki generator versions this archivist has been validated against.
/// A site reporting anything outside this list still works (MediaWiki's
/// query API is stable across versions) but gets a one-time WARN.
const SUPPORTED_GENERATORS: &[&str] = &["1.35", "1.36", "1.37", "1.38", "1.39", "1.40", "1.41"];

/// C2: the single point of contact with the wiki's `action=query` API.
/// Owns rate limiting, retry/backoff, and response-shape validation so every
/// caller above it (C3 and the scrapers) only ever sees a parsed JSON value
/// or a typed error.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
    max_retries: u32,
    seen_warnings: Mutex<HashSet<(String, String)>>,
    siteinfo_probed: Mutex<bool>,
    namespaces: Mutex<NamespaceTable>,
}

impl ApiClient {
    pub fn new(config: &ArchivistConfig, rate_limiter: Arc<RateLimiter>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(config.scraper.user_agent.clone())
            .timeout(std::time::Duration::from_secs(config.scraper.timeout))
            .gzip(true)
            .build()
            .map_err(|e| ApiError::response("client-init", e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.wiki.base_url.trim_end_matches('/').to_string(),
            rate_limiter,
            max_retries: config.scraper.max_retries,
            seen_warnings: Mutex::new(HashSet::new()),
            siteinfo_probed: Mutex::new(false),
            namespaces: Mutex::new(NamespaceTable::default_english()),
        })
    }

    /// The wiki's namespace table, as fetched at bootstrap (§4.9). Falls
    /// back to `NamespaceTable::default_english()` if no query has probed
    /// siteinfo yet — callers normally go through `query`/`paginate` first,
    /// which guarantees the probe has already run.
    pub async fn namespace_table(&self) -> NamespaceTable {
        self.namespaces.lock().await.clone()
    }

    /// Issues `action=query&format=json` with `params` merged in, retrying
    /// transient failures with the shared rate limiter's backoff. `context`
    /// names the call site for error messages and log correlation.
    pub async fn query(
        &self,
        params: &[(String, String)],
        context: &str,
    ) -> Result<Value, ApiError> {
        self.ensure_siteinfo_probed(context).await;

        let mut attempt = 0u32;
        loop {
            self.rate_limiter.wait().await;

            let mut full_params: Vec<(&str, &str)> = vec![("action", "query"), ("format", "json")];
            full_params.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

            let url = format!("{}/api.php", self.base_url);
            let send_result = self.http.get(&url).query(&full_params).send().await;

            match send_result {
                Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
                    return Err(ApiError::PageNotFound {
                        context: context.to_string(),
                    });
                }
                Ok(resp) if resp.status().is_success() => {
                    let body = resp
                        .text()
                        .await
                        .map_err(|e| ApiError::response(context, format!("reading body: {e}")))?;
                    let value: Value = match serde_json::from_str(&body) {
                        Ok(v) => v,
                        Err(e) => {
                            return Err(ApiError::response(
                                context,
                                format!("non-JSON response: {e}"),
                            ));
                        }
                    };
                    self.check_error_payload(&value, context)?;
                    self.log_warnings(&value, context).await;
                    return Ok(value);
                }
                Ok(resp) if Self::is_retryable_status(resp.status()) => {
                    if attempt >= self.max_retries {
                        return Err(ApiError::ApiRequest {
                            context: context.to_string(),
                            attempts: attempt + 1,
                            reason: format!("HTTP {}", resp.status()),
                        });
                    }
                    self.rate_limiter.backoff(attempt).await;
                    attempt += 1;
                }
                Ok(resp) => {
                    return Err(ApiError::response(
                        context,
                        format!("unexpected HTTP status {}", resp.status()),
                    ));
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    if attempt >= self.max_retries {
                        return Err(ApiError::ApiRequest {
                            context: context.to_string(),
                            attempts: attempt + 1,
                            reason: e.to_string(),
                        });
                    }
                    self.rate_limiter.backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ApiError::ApiRequest {
                        context: context.to_string(),
                        attempts: attempt + 1,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn is_retryable_status(status: reqwest::StatusCode) -> bool {
        status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn check_error_payload(&self, value: &Value, context: &str) -> Result<(), ApiError> {
        if let Some(error) = value.get("error") {
            let code = error
                .get("code")
                .and_then(Value::as_str)
                .map(str::to_string);
            let message = error
                .get("info")
                .and_then(Value::as_str)
                .unwrap_or("unspecified API error")
                .to_string();
            return Err(match code {
                Some(code) => ApiError::response_with_code(context, code, message),
                None => ApiError::response(context, message),
            });
        }
        Ok(())
    }

    /// Warnings are logged WARN the first time a given (module, message
    /// prefix) pair is seen in this process, DEBUG afterward, so a noisy
    /// long-running scrape does not flood the log with the same complaint.
    async fn log_warnings(&self, value: &Value, context: &str) {
        let Some(warnings) = value.get("warnings").and_then(Value::as_object) else {
            return;
        };
        let mut seen = self.seen_warnings.lock().await;
        for (module, body) in warnings {
            let text = body
                .get("warnings")
                .or_else(|| body.get("*"))
                .and_then(Value::as_str)
                .unwrap_or("");
            let key = (module.clone(), text.chars().take(100).collect::<String>());
            if seen.insert(key) {
                warn!(context, module = %module, warning = %text, "API warning");
            } else {
                debug!(context, module = %module, warning = %text, "API warning (repeat)");
            }
        }
    }

    async fn ensure_siteinfo_probed(&self, context: &str) {
        let mut probed = self.siteinfo_probed.lock().await;
        if *probed {
            return;
        }
        *probed = true;
        drop(probed);

        self.rate_limiter.wait().await;
        let url = format!("{}/api.php", self.base_url);
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("meta", "siteinfo"),
            ("siprop", "general|namespaces"),
        ];
        let Ok(resp) = self.http.get(&url).query(&params).send().await else {
            return;
        };
        let Ok(value) = resp.json::<Value>().await else {
            return;
        };

        if let Some(table) = parse_namespace_table(&value) {
            *self.namespaces.lock().await = table;
        }

        let Some(generator) = value
            .pointer("/query/general/generator")
            .and_then(Value::as_str)
        else {
            return;
        };
        let version = generator.trim_start_matches("MediaWiki ");
        let supported = SUPPORTED_GENERATORS
            .iter()
            .any(|v| version.starts_with(v));
        if !supported {
            warn!(
                context,
                generator, "wiki reports an unvalidated MediaWiki version"
            );
        }
    }
}

/// Builds a `NamespaceTable` from `query/namespaces`' `{id -> {"*": name,
/// "canonical": name}}` shape. Both the localized (`*`) and canonical
/// (English) names are kept, so a link written against either form still
/// classifies correctly.
fn parse_namespace_table(value: &Value) -> Option<NamespaceTable> {
    let namespaces = value.pointer("/query/namespaces").and_then(Value::as_object)?;
    let mut table = NamespaceTable::default();
    for entry in namespaces.values() {
        let Some(id) = entry.get("id").and_then(Value::as_i64) else {
            continue;
        };
        if let Some(name) = entry.get("*").and_then(Value::as_str) {
            table.insert(name, id);
        }
        if let Some(canonical) = entry.get("canonical").and_then(Value::as_str) {
            table.insert(canonical, id);
        }
    }
    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_namespace_table_reads_localized_and_canonical_names() {
        let value = serde_json::json!({
            "query": {
                "namespaces": {
                    "6": {"id": 6, "case": "first-letter", "*": "Fichier", "canonical": "File"},
                    "14": {"id": 14, "case": "first-letter", "*": "Catégorie", "canonical": "Category"}
                }
            }
        });
        let table = parse_namespace_table(&value).unwrap();
        let links = crate::scrapers::links::extract(1, "[[Fichier:a.png]] [[Category:b]]", &table);
        assert_eq!(links[0].link_type, crate::models::LinkType::File);
        assert_eq!(links[1].link_type, crate::models::LinkType::Category);
    }

    #[test]
    fn parse_namespace_table_absent_yields_none() {
        let value = serde_json::json!({"query": {"general": {}}});
        assert!(parse_namespace_table(&value).is_none());
    }

    #[test]
    fn retryable_statuses_match_spec() {
        assert!(ApiClient::is_retryable_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS
        ));
        assert!(ApiClient::is_retryable_status(
            reqwest::StatusCode::BAD_GATEWAY
        ));
        assert!(!ApiClient::is_retryable_status(
            reqwest::StatusCode::NOT_FOUND
        ));
        assert!(!ApiClient::is_retryable_status(reqwest::StatusCode::OK));
    }
}

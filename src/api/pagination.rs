use serde_json::Value;

use crate::errors::ApiError;

use super::ApiClient;

/// C3: drives repeated `ApiClient::query` calls, folding each response's
/// `continue` object into the next request until it is absent. `result_path`
/// is a `/`-separated pointer (as accepted by `Value::pointer`) identifying
/// the array or object this caller cares about in each page; it exists only
/// to validate the response shape eagerly rather than let a malformed page
/// surface as a confusing downstream panic.
///
/// `on_batch` is invoked once per page. If it returns an `Err`, pagination
/// continues anyway: a failure folding one batch into callers' state must
/// not abort an otherwise-healthy walk of the result set. The error is
/// logged by the caller, not by this function.
pub async fn paginate<F>(
    client: &ApiClient,
    initial_params: &[(String, String)],
    result_path: &str,
    context: &str,
    mut on_batch: F,
) -> Result<(), ApiError>
where
    F: FnMut(&Value) -> Result<(), String>,
{
    let mut params: Vec<(String, String)> = initial_params.to_vec();

    loop {
        let response = client.query(&params, context).await?;

        if response.pointer(result_path).is_none() {
            return Err(ApiError::response(
                context,
                format!("result_path `{result_path}` absent from response"),
            ));
        }

        if let Err(reason) = on_batch(&response) {
            tracing::warn!(context, reason = %reason, "on_batch callback failed, continuing pagination");
        }

        let Some(cont) = response.get("continue") else {
            return Ok(());
        };
        let Some(cont_obj) = cont.as_object() else {
            return Err(ApiError::response(
                context,
                "continue field is not a JSON object",
            ));
        };
        if cont_obj.is_empty() {
            return Ok(());
        }

        for (key, value) in cont_obj {
            let as_string = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            upsert_param(&mut params, key, as_string);
        }
    }
}

fn upsert_param(params: &mut Vec<(String, String)>, key: &str, value: String) {
    if let Some(entry) = params.iter_mut().find(|(k, _)| k == key) {
        entry.1 = value;
    } else {
        params.push((key.to_string(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_param_replaces_existing_key() {
        let mut params = vec![("apcontinue".to_string(), "A".to_string())];
        upsert_param(&mut params, "apcontinue", "B".to_string());
        assert_eq!(params, vec![("apcontinue".to_string(), "B".to_string())]);
    }

    #[test]
    fn upsert_param_appends_new_key() {
        let mut params = vec![("list".to_string(), "allpages".to_string())];
        upsert_param(&mut params, "apcontinue", "X".to_string());
        assert_eq!(
            params,
            vec![
                ("list".to_string(), "allpages".to_string()),
                ("apcontinue".to_string(), "X".to_string()),
            ]
        );
    }
}

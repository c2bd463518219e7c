//! Typed-DTO validation helpers. Every scraper parses upstream JSON through
//! these rather than reaching into `serde_json::Value` directly, so a
//! malformed response fails with a consistent `ApiError::ApiResponse`
//! instead of a downstream panic.

use serde_json::Value;

use crate::errors::ApiError;

/// Fails unless every field in `fields` is present on `obj`.
pub fn require_fields(obj: &Value, fields: &[&str], context: &str) -> Result<(), ApiError> {
    for field in fields {
        if obj.get(field).is_none() {
            return Err(ApiError::response(
                context,
                format!("missing required field `{field}`"),
            ));
        }
    }
    Ok(())
}

pub fn typed_get_str<'a>(obj: &'a Value, name: &str, context: &str) -> Result<&'a str, ApiError> {
    obj.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::response(context, format!("field `{name}` is not a string")))
}

pub fn typed_get_i64(obj: &Value, name: &str, context: &str) -> Result<i64, ApiError> {
    obj.get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::response(context, format!("field `{name}` is not an integer")))
}

pub fn typed_get_u64(obj: &Value, name: &str, context: &str) -> Result<u64, ApiError> {
    obj.get(name)
        .and_then(Value::as_u64)
        .ok_or_else(|| ApiError::response(context, format!("field `{name}` is not a non-negative integer")))
}

pub fn typed_get_array<'a>(obj: &'a Value, name: &str, context: &str) -> Result<&'a Vec<Value>, ApiError> {
    obj.get(name)
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::response(context, format!("field `{name}` is not an array")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn require_fields_rejects_missing() {
        let obj = json!({"a": 1});
        assert!(require_fields(&obj, &["a", "b"], "ctx").is_err());
        assert!(require_fields(&obj, &["a"], "ctx").is_ok());
    }

    #[test]
    fn typed_get_rejects_wrong_kind() {
        let obj = json!({"n": "not a number"});
        assert!(typed_get_i64(&obj, "n", "ctx").is_err());
    }
}

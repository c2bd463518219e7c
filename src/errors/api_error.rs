/// Errors raised by the API client (C2), pagination driver (C3), and the
/// scrapers that sit directly on top of them (C6–C10).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("page not found: {context}")]
    PageNotFound { context: String },

    #[error("API request failed after {attempts} attempt(s) against {context}: {reason}")]
    ApiRequest {
        context: String,
        attempts: u32,
        reason: String,
    },

    #[error("API response error in {context}: {message} (code={code:?})")]
    ApiResponse {
        context: String,
        code: Option<String>,
        message: String,
    },
}

impl ApiError {
    pub fn response(context: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ApiResponse {
            context: context.into(),
            code: None,
            message: message.into(),
        }
    }

    pub fn response_with_code(
        context: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ApiError::ApiResponse {
            context: context.into(),
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

use serde::Deserialize;
use thiserror::Error;

/// Every failure a caller of the gateway can observe. The set is closed so
/// callers pattern-match instead of sniffing message strings.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("authorization rejected - session expired")]
    AuthExpired,

    #[error("{message}")]
    Validation { message: String, errors: Vec<String> },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("session storage failure: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape used by the backend: `{message}` everywhere, plus an
/// `errors` array on schema validation failures.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<Vec<String>>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Classify a non-success response on a protected call, where a 401/403
    /// means the session the request was sent under is no longer valid.
    pub fn from_protected_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => ApiError::AuthExpired,
            _ => Self::from_status(status, body),
        }
    }

    /// Classify a non-success response by status code and body alone. On an
    /// unauthenticated call a 401 is an ordinary rejection of the submitted
    /// credentials ("Invalid credentials"), not an expired session.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

        if status.is_client_error() {
            if let Some(errors) = parsed.errors {
                return ApiError::Validation {
                    message: parsed
                        .message
                        .unwrap_or_else(|| "validation failed".to_string()),
                    errors,
                };
            }
        }

        ApiError::Server {
            status: status.as_u16(),
            message: parsed
                .message
                .unwrap_or_else(|| Self::truncate_body(body)),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::NetworkUnreachable(err.to_string())
    }
}

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Body of a non-success response, with the backend's `detail` message
/// pulled out when the body carries one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rejection {
    pub detail: Option<String>,
    pub body: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

impl Rejection {
    pub fn from_body(body: &str) -> Self {
        // Validation errors carry a list under `detail`; only a plain string is a message.
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail)
            .and_then(|d| match d {
                serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            });

        Self {
            detail,
            body: truncate_body(body),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.detail, self.body.is_empty()) {
            (Some(detail), _) => f.write_str(detail),
            (None, false) => f.write_str(&self.body),
            (None, true) => f.write_str("(empty body)"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(Rejection),

    #[error("Unauthorized: {0}")]
    Unauthorized(Rejection),

    #[error("Access denied: {0}")]
    AccessDenied(Rejection),

    #[error("Resource not found: {0}")]
    NotFound(Rejection),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error ({status}): {rejection}")]
    ServerError { status: u16, rejection: Rejection },

    #[error("Status {status}: {rejection}")]
    Unexpected { status: u16, rejection: Rejection },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let rejection = Rejection::from_body(body);
        match status.as_u16() {
            400 => ApiError::BadRequest(rejection),
            401 => ApiError::Unauthorized(rejection),
            403 => ApiError::AccessDenied(rejection),
            404 => ApiError::NotFound(rejection),
            429 => ApiError::RateLimited,
            code @ 500..=599 => ApiError::ServerError {
                status: code,
                rejection,
            },
            other => ApiError::Unexpected {
                status: other,
                rejection,
            },
        }
    }

    /// HTTP status that produced this error, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest(_) => Some(400),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited => Some(429),
            ApiError::ServerError { status, .. } | ApiError::Unexpected { status, .. } => {
                Some(*status)
            }
            ApiError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidResponse(_) | ApiError::InvalidBaseUrl(_) => None,
        }
    }

    /// The backend-provided `detail` message, if any.
    pub fn detail(&self) -> Option<&str> {
        self.rejection().and_then(|r| r.detail.as_deref())
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ApiError::BadRequest(r)
            | ApiError::Unauthorized(r)
            | ApiError::AccessDenied(r)
            | ApiError::NotFound(r)
            | ApiError::ServerError { rejection: r, .. }
            | ApiError::Unexpected { rejection: r, .. } => Some(r),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

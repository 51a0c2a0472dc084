use thiserror::Error;

use super::storage::StorageError;
use crate::api::ApiError;

/// Which session operation failed; selects the fallback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    Login,
    Register,
    Logout,
}

impl AuthOperation {
    pub fn fallback_message(self) -> &'static str {
        match self {
            AuthOperation::Login => "Login failed",
            AuthOperation::Register => "Registration failed",
            AuthOperation::Logout => "Logout failed",
        }
    }
}

/// Coarse cause of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// The backend answered with a non-success status.
    Rejected,
    /// The backend could not be reached or timed out.
    Network,
    /// The backend answered 2xx with a body we could not use.
    InvalidResponse,
    /// The durable record could not be written or removed.
    Storage,
}

/// Failure of login, registration, or logout.
///
/// Every variant displays the same user-facing text: the backend's
/// `detail` when it sent one, otherwise the operation's fallback
/// ("Login failed" / "Registration failed"). Use [`AuthError::kind`] to
/// tell an unreachable backend from rejected credentials.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{message}")]
    InvalidResponse { message: String, reason: String },

    #[error("{message}")]
    Storage {
        message: String,
        #[source]
        source: StorageError,
    },
}

impl AuthError {
    pub fn from_api(operation: AuthOperation, err: ApiError) -> Self {
        let fallback = operation.fallback_message().to_string();
        match err {
            ApiError::NetworkError(source) => AuthError::Network {
                message: fallback,
                source,
            },
            ApiError::InvalidResponse(reason) | ApiError::InvalidBaseUrl(reason) => {
                AuthError::InvalidResponse {
                    message: fallback,
                    reason,
                }
            }
            other => {
                let status = other.status().unwrap_or_default();
                let message = other.detail().map(str::to_string).unwrap_or(fallback);
                AuthError::Rejected { status, message }
            }
        }
    }

    pub fn storage(operation: AuthOperation, source: StorageError) -> Self {
        AuthError::Storage {
            message: operation.fallback_message().to_string(),
            source,
        }
    }

    pub fn invalid_response(operation: AuthOperation, reason: impl Into<String>) -> Self {
        AuthError::InvalidResponse {
            message: operation.fallback_message().to_string(),
            reason: reason.into(),
        }
    }

    /// The message to show the user.
    pub fn message(&self) -> &str {
        match self {
            AuthError::Rejected { message, .. }
            | AuthError::Network { message, .. }
            | AuthError::InvalidResponse { message, .. }
            | AuthError::Storage { message, .. } => message,
        }
    }

    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::Rejected { .. } => AuthErrorKind::Rejected,
            AuthError::Network { .. } => AuthErrorKind::Network,
            AuthError::InvalidResponse { .. } => AuthErrorKind::InvalidResponse,
            AuthError::Storage { .. } => AuthErrorKind::Storage,
        }
    }
}

//! Error types for fedsync.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Message used for every opaque lookup failure.
///
/// Blocked origins, missing visibility and failed fetches all surface with this
/// exact text so a caller cannot tell them apart.
pub const OPAQUE_NOT_FOUND: &str = "couldnt_find_object";

/// Local policy violations reported synchronously to the creating user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyViolation {
    /// The post URL matches a blocked URL pattern.
    BlockedUrl,
    /// The node does not accept NSFW content.
    NsfwNotAllowed,
    /// The creator is banned from the site hosting the community.
    SiteBan,
    /// The creator is banned from the target community.
    PersonIsBannedFromCommunity,
    /// The post is locked.
    Locked,
    /// The community is removed or deleted.
    CommunityRemoved,
}

impl PolicyViolation {
    /// Stable error code returned to API clients.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BlockedUrl => "blocked_url",
            Self::NsfwNotAllowed => "nsfw_not_allowed",
            Self::SiteBan => "site_ban",
            Self::PersonIsBannedFromCommunity => "person_is_banned_from_community",
            Self::Locked => "locked",
            Self::CommunityRemoved => "community_removed",
        }
    }
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Policy rejected: {0}")]
    PolicyRejected(PolicyViolation),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // === Server Errors ===
    #[error("Unreachable: {0}")]
    Unreachable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The opaque not-found error shared by blocking, visibility and fetch failures.
    #[must_use]
    pub fn opaque_not_found() -> Self {
        Self::NotFound(OPAQUE_NOT_FOUND.to_string())
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::PolicyRejected(_) | Self::BadRequest(_) | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Conflict(_) => StatusCode::CONFLICT,

            // 5xx Server Errors
            Self::Unreachable(_) => StatusCode::BAD_GATEWAY,
            Self::Serialization(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "couldnt_update",
            Self::PolicyRejected(violation) => violation.code(),
            Self::BadRequest(_) => "bad_request",
            Self::Validation(_) => "validation_error",
            Self::Conflict(_) => "conflict",
            Self::Unreachable(_) => "unreachable",
            Self::Serialization(_) => "serialization_error",
            Self::Config(_) => "config_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        // Not-found bodies never carry the underlying cause.
        let message = match &self {
            Self::NotFound(_) => OPAQUE_NOT_FOUND.to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<PolicyViolation> for AppError {
    fn from(violation: PolicyViolation) -> Self {
        Self::PolicyRejected(violation)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        Self::BadRequest(format!("invalid url: {err}"))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_codes() {
        assert_eq!(PolicyViolation::BlockedUrl.code(), "blocked_url");
        assert_eq!(PolicyViolation::NsfwNotAllowed.code(), "nsfw_not_allowed");
        assert_eq!(PolicyViolation::SiteBan.code(), "site_ban");
        assert_eq!(
            AppError::from(PolicyViolation::PersonIsBannedFromCommunity).error_code(),
            "person_is_banned_from_community"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::opaque_not_found().status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::PolicyRejected(PolicyViolation::SiteBan).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert!(AppError::Unreachable("x".into()).is_server_error());
        assert!(!AppError::Conflict("stale".into()).is_server_error());
    }
}

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Boxed error returned by tenant configuration resolvers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building a provider resolver or registering it.
///
/// These are always fatal to registration and surface before any request is
/// served.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid path pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("A tenant configuration resolver is required")]
    MissingResolver,

    #[error("A tenant id pattern is required")]
    MissingTenantIdPattern,

    #[error("Provider '{0}' is already registered")]
    DuplicateProvider(String),
}

/// The tenant configuration resolver rejected (or failed to resolve) a tenant.
#[derive(Debug, thiserror::Error)]
#[error("Invalid identity provider '{tenant_id}': {source}")]
pub struct InvalidTenantError {
    pub tenant_id: String,
    #[source]
    pub source: BoxError,
}

/// Reason code attached to a strategy failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The tenant in the path is unknown or its configuration could not be resolved.
    InvalidIdentityProvider,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidIdentityProvider => "invalid_identity_provider",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure signalled by `setup` in place of the raw resolver error.
///
/// The host adapter turns this into its short-circuit response. The wrapped
/// error is kept for logging and never rendered to clients.
#[derive(Debug)]
pub struct StrategyFailure {
    reason: FailureReason,
    error: InvalidTenantError,
}

impl StrategyFailure {
    pub fn invalid_identity_provider(error: InvalidTenantError) -> Self {
        Self {
            reason: FailureReason::InvalidIdentityProvider,
            error,
        }
    }

    pub fn reason(&self) -> FailureReason {
        self.reason
    }

    pub fn error(&self) -> &InvalidTenantError {
        &self.error
    }

    pub fn tenant_id(&self) -> &str {
        &self.error.tenant_id
    }

    pub fn into_error(self) -> InvalidTenantError {
        self.error
    }
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.error)
    }
}

impl std::error::Error for StrategyFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl IntoResponse for StrategyFailure {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(
            "authentication_error",
            self.reason.as_str(),
            "Unknown or invalid identity provider",
        );
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Standard error response body: `{"error": {"type": ..., "code": ..., "message": ...}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(
        error_type: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorInfo {
                error_type: error_type.into(),
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

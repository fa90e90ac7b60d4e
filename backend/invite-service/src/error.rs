use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use thiserror::Error;

use crate::services::AuthorizationError;

pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Point in the invitation chain where a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Authorize,
    SignUp,
    FindBackendUser,
    LookupIdentity,
    CreateUser,
    CreateResetToken,
    SendResetEmail,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Authorize => "authorize",
            Stage::SignUp => "sign_up",
            Stage::FindBackendUser => "find_backend_user",
            Stage::LookupIdentity => "lookup_identity",
            Stage::CreateUser => "create_user",
            Stage::CreateResetToken => "create_reset_token",
            Stage::SendResetEmail => "send_reset_email",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(#[from] AuthorizationError),

    #[error("Invitee is already registered")]
    AlreadyFullyRegistered,

    #[error("Upstream unavailable at {stage}: {message}")]
    UpstreamUnavailable { stage: Stage, message: String },

    #[error("Failed to create backend user: {0}")]
    PersistenceFailed(String),

    #[error("Failed to send invitation email at {stage}: {message}")]
    NotificationFailed { stage: Stage, message: String },

    #[error("Deadline exceeded before {0}")]
    DeadlineExceeded(Stage),
}

impl WorkflowError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::AlreadyFullyRegistered => StatusCode::CONFLICT,
            WorkflowError::UpstreamUnavailable { .. }
            | WorkflowError::PersistenceFailed(_)
            | WorkflowError::NotificationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            WorkflowError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Short client-facing reason; upstream details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            WorkflowError::InvalidRequest(msg) => format!("request param is invalid: {}", msg),
            WorkflowError::Forbidden(_) => {
                "not permitted to invite members to this group".to_string()
            }
            WorkflowError::AlreadyFullyRegistered => {
                "user is already registered; use the forgot password flow".to_string()
            }
            WorkflowError::UpstreamUnavailable { .. } => {
                "upstream service unavailable".to_string()
            }
            WorkflowError::PersistenceFailed(_) => "failed to create user".to_string(),
            WorkflowError::NotificationFailed { .. } => {
                "user created but the invitation email failed; use the forgot password flow"
                    .to_string()
            }
            WorkflowError::DeadlineExceeded(_) => "invitation timed out".to_string(),
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        (self.status_code(), self.public_message()).into_response()
    }
}

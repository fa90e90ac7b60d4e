/// POST /invite
///
/// Body: `{"name": "...", "email": "...", "groupGuid": "...", "groupId": 1}`
///
/// Response:
/// - 200 OK: empty body
/// - 400 / 403 / 409 / 500 / 504: short plain-text reason
use super::HttpServerState;
use crate::error::{Stage, WorkflowError};
use crate::models::{InvitationRequest, Inviter};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

pub async fn invite(
    State(state): State<Arc<HttpServerState>>,
    Extension(inviter): Extension<Inviter>,
    payload: Result<Json<InvitationRequest>, JsonRejection>,
) -> Result<StatusCode, WorkflowError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(
            stage = %Stage::Validate,
            inviter_id = %inviter.id,
            error = %rejection,
            "Invitation request body could not be decoded"
        );
        WorkflowError::InvalidRequest(rejection.body_text())
    })?;

    let deadline = Instant::now() + state.invite_deadline;
    state
        .workflow
        .invite(&inviter, &request, Some(deadline))
        .await?;

    Ok(StatusCode::OK)
}

/// GET /whoami
///
/// Session variables for Hasura's webhook authentication mode. The role uses the
/// same code → tier table as invitation authorization; a session user without a
/// backend row reads as code 0, i.e. `user`.
use super::HttpServerState;
use crate::models::{Inviter, RoleTier};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    #[serde(rename = "X-Hasura-User-Id")]
    pub user_id: String,

    #[serde(rename = "X-Hasura-Role")]
    pub role: String,

    #[serde(rename = "X-Hasura-Is-Owner")]
    pub is_owner: String,
}

pub async fn whoami(
    State(state): State<Arc<HttpServerState>>,
    Extension(caller): Extension<Inviter>,
) -> Response {
    let code = match state.backend.role_by_id(&caller.id).await {
        Ok(Some(code)) => code,
        Ok(None) => {
            info!(user_id = %caller.id, "Session user has no backend record");
            0
        }
        Err(e) => {
            error!(user_id = %caller.id, error = %e, "Backend role lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to resolve role").into_response();
        }
    };

    let response = WhoAmIResponse {
        user_id: caller.id,
        role: RoleTier::from_code(code).as_str().to_string(),
        is_owner: "false".to_string(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Email/password routes guarded against the placeholder credential
///
/// Request and response bodies follow the SuperTokens frontend interface:
/// - `POST /auth/signin`: `formFields` email + password, sets `sAccessToken`
/// - `POST /auth/user/password/reset`: reset `token` + `formFields` password
/// - `PUT /auth/user/password`: `newPassword` for the session user
use super::{HttpServerState, ACCESS_TOKEN_COOKIE};
use crate::clients::{ResetPasswordOutcome, SignInOutcome, UpdatePasswordOutcome};
use crate::models::Inviter;
use crate::services::CredentialError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const STATUS_OK: &str = "OK";
const STATUS_WRONG_CREDENTIALS: &str = "WRONG_CREDENTIALS_ERROR";
const STATUS_RESET_PASSWORD_INVALID_TOKEN: &str = "RESET_PASSWORD_INVALID_TOKEN_ERROR";
const STATUS_UNKNOWN_USER_ID: &str = "UNKNOWN_USER_ID_ERROR";

#[derive(Debug, Deserialize)]
pub struct FormField {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub form_fields: Vec<FormField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub form_fields: Vec<FormField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<SignedInUser>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignedInUser {
    pub id: String,
    pub email: String,
}

impl StatusResponse {
    fn status(status: &str) -> Json<Self> {
        Json(Self {
            status: status.to_string(),
            user: None,
        })
    }
}

fn field<'a>(fields: &'a [FormField], id: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|field| field.id == id)
        .map(|field| field.value.as_str())
        .filter(|value| !value.is_empty())
}

fn invalid(message: impl std::fmt::Display) -> Response {
    (
        StatusCode::BAD_REQUEST,
        format!("request param is invalid: {}", message),
    )
        .into_response()
}

pub async fn sign_in(
    State(state): State<Arc<HttpServerState>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid(rejection.body_text()),
    };
    let (Some(email), Some(password)) = (
        field(&request.form_fields, "email"),
        field(&request.form_fields, "password"),
    ) else {
        return invalid("email and password are required");
    };

    let user_id = match state.credentials.sign_in(email, password).await {
        Ok(SignInOutcome::Ok { user_id }) => user_id,
        Ok(SignInOutcome::WrongCredentials) => {
            return StatusResponse::status(STATUS_WRONG_CREDENTIALS).into_response()
        }
        Err(e) => return e.into_response(),
    };

    let access_token = match state.sessions.create(&user_id).await {
        Ok(token) => token,
        Err(e) => return CredentialError::Upstream(e).into_response(),
    };
    info!(user_id = %user_id, "Session created");

    let cookie = Cookie::build((ACCESS_TOKEN_COOKIE, access_token))
        .domain(state.cookie_domain.clone())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None);

    let body = StatusResponse {
        status: STATUS_OK.to_string(),
        user: Some(SignedInUser {
            id: user_id,
            email: email.to_string(),
        }),
    };

    (CookieJar::new().add(cookie), Json(body)).into_response()
}

pub async fn reset_password(
    State(state): State<Arc<HttpServerState>>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid(rejection.body_text()),
    };
    let Some(password) = field(&request.form_fields, "password") else {
        return invalid("password is required");
    };

    match state
        .credentials
        .reset_password(&request.token, password)
        .await
    {
        Ok(ResetPasswordOutcome::Ok) => StatusResponse::status(STATUS_OK).into_response(),
        Ok(ResetPasswordOutcome::InvalidToken) => {
            StatusResponse::status(STATUS_RESET_PASSWORD_INVALID_TOKEN).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn update_password(
    State(state): State<Arc<HttpServerState>>,
    Extension(caller): Extension<Inviter>,
    payload: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid(rejection.body_text()),
    };
    if request.new_password.is_empty() {
        return invalid("newPassword is required");
    }

    match state
        .credentials
        .update_password(&caller.id, &request.new_password)
        .await
    {
        Ok(UpdatePasswordOutcome::Ok) => StatusResponse::status(STATUS_OK).into_response(),
        Ok(UpdatePasswordOutcome::UnknownUser) => {
            warn!(user_id = %caller.id, "Password update for unknown user");
            StatusResponse::status(STATUS_UNKNOWN_USER_ID).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_field_lookup() {
        let request: SignInRequest = serde_json::from_str(
            r#"{"formFields":[{"id":"email","value":"a@example.com"},{"id":"password","value":""}]}"#,
        )
        .unwrap();

        assert_eq!(field(&request.form_fields, "email"), Some("a@example.com"));
        assert_eq!(field(&request.form_fields, "password"), None);
        assert_eq!(field(&request.form_fields, "name"), None);
    }

    #[test]
    fn test_status_only_response_omits_user() {
        let json = serde_json::to_string(&StatusResponse::status(STATUS_OK).0).unwrap();
        assert_eq!(json, r#"{"status":"OK"}"#);
    }
}

/// SuperTokens core client
///
/// Talks to the core's REST API (CDI 2.x) for the email/password and session
/// recipes. Invitation emails go out through the service's own SMTP channel,
/// the same place SuperTokens' backend SDK would deliver reset links from.
///
/// ## API Reference
///
/// - Sign up: POST /recipe/signup
/// - Sign in: POST /recipe/signin
/// - User by email: GET /recipe/user?email=
/// - Update password: PUT /recipe/user
/// - Reset token: POST /recipe/user/password/reset/token
/// - Reset password: POST /recipe/user/password/reset
/// - Create session: POST /recipe/session
/// - Verify session: POST /recipe/session/verify
use super::{
    CredentialStore, IdentityProvider, IdentityProviderError, ResetPasswordOutcome,
    SessionStore, SignInOutcome, SignUpOutcome, UpdatePasswordOutcome,
};
use crate::config::SuperTokensSettings;
use crate::services::EmailService;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const CDI_VERSION: &str = "2.21";
const RECIPE_EMAIL_PASSWORD: &str = "emailpassword";
const RECIPE_SESSION: &str = "session";

const STATUS_OK: &str = "OK";
const STATUS_EMAIL_ALREADY_EXISTS: &str = "EMAIL_ALREADY_EXISTS_ERROR";
const STATUS_UNKNOWN_EMAIL: &str = "UNKNOWN_EMAIL_ERROR";
const STATUS_UNKNOWN_USER_ID: &str = "UNKNOWN_USER_ID_ERROR";
const STATUS_UNAUTHORISED: &str = "UNAUTHORISED";
const STATUS_TRY_REFRESH_TOKEN: &str = "TRY_REFRESH_TOKEN";
const STATUS_WRONG_CREDENTIALS: &str = "WRONG_CREDENTIALS_ERROR";
const STATUS_RESET_PASSWORD_INVALID_TOKEN: &str = "RESET_PASSWORD_INVALID_TOKEN_ERROR";

type Result<T> = std::result::Result<T, IdentityProviderError>;

#[derive(Clone)]
pub struct SuperTokensClient {
    http: Client,
    base_url: String,
    api_key: String,
    email: EmailService,
}

impl SuperTokensClient {
    pub fn new(config: &SuperTokensSettings, email: EmailService) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| IdentityProviderError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        info!(connection_uri = %config.connection_uri, "SuperTokens client initialized");

        Ok(Self {
            http,
            base_url: config.connection_uri.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            email,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_headers(&self, builder: RequestBuilder, recipe: &str) -> RequestBuilder {
        builder
            .header("api-key", &self.api_key)
            .header("cdi-version", CDI_VERSION)
            .header("rid", recipe)
    }

    async fn send<R: DeserializeOwned>(&self, builder: RequestBuilder, path: &str) -> Result<R> {
        let response = builder.send().await.map_err(|e| {
            IdentityProviderError::Transport(format!("{} request failed: {}", path, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityProviderError::Transport(format!(
                "{} returned HTTP {}: {}",
                path, status, body
            )));
        }

        response.json::<R>().await.map_err(|e| {
            IdentityProviderError::Transport(format!("Failed to parse {} response: {}", path, e))
        })
    }
}

#[async_trait]
impl IdentityProvider for SuperTokensClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let path = "/recipe/signup";
        let builder = self
            .with_headers(self.http.post(self.url(path)), RECIPE_EMAIL_PASSWORD)
            .json(&EmailPasswordRequest { email, password });

        let response: UserResponse = self.send(builder, path).await?;
        match response.status.as_str() {
            STATUS_OK => {
                let user = response.user.ok_or_else(|| {
                    IdentityProviderError::UnexpectedStatus("OK without user".to_string())
                })?;
                debug!(user_id = %user.id, "SuperTokens sign-up created user");
                Ok(SignUpOutcome::Created { id: user.id })
            }
            STATUS_EMAIL_ALREADY_EXISTS => Ok(SignUpOutcome::EmailAlreadyExists),
            other => Err(IdentityProviderError::UnexpectedStatus(other.to_string())),
        }
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Option<String>> {
        let path = "/recipe/user";
        let builder = self
            .with_headers(self.http.get(self.url(path)), RECIPE_EMAIL_PASSWORD)
            .query(&[("email", email)]);

        let response: UserResponse = self.send(builder, path).await?;
        match response.status.as_str() {
            STATUS_OK => Ok(response.user.map(|user| user.id)),
            STATUS_UNKNOWN_EMAIL => Ok(None),
            other => Err(IdentityProviderError::UnexpectedStatus(other.to_string())),
        }
    }

    async fn create_reset_token(&self, user_id: &str) -> Result<String> {
        let path = "/recipe/user/password/reset/token";
        let builder = self
            .with_headers(self.http.post(self.url(path)), RECIPE_EMAIL_PASSWORD)
            .json(&ResetTokenRequest { user_id });

        let response: ResetTokenResponse = self.send(builder, path).await?;
        match (response.status.as_str(), response.token) {
            (STATUS_OK, Some(token)) => Ok(token),
            (STATUS_UNKNOWN_USER_ID, _) => Err(IdentityProviderError::UnknownUser(user_id.to_string())),
            (other, _) => Err(IdentityProviderError::UnexpectedStatus(other.to_string())),
        }
    }

    async fn send_reset_email(&self, user_id: &str, email: &str, link: &str) -> Result<()> {
        debug!(user_id = %user_id, "Dispatching invitation email");
        self.email.send_invitation_email(email, link).await
    }
}

#[async_trait]
impl CredentialStore for SuperTokensClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome> {
        let path = "/recipe/signin";
        let builder = self
            .with_headers(self.http.post(self.url(path)), RECIPE_EMAIL_PASSWORD)
            .json(&EmailPasswordRequest { email, password });

        let response: UserResponse = self.send(builder, path).await?;
        match response.status.as_str() {
            STATUS_OK => {
                let user = response.user.ok_or_else(|| {
                    IdentityProviderError::UnexpectedStatus("OK without user".to_string())
                })?;
                Ok(SignInOutcome::Ok { user_id: user.id })
            }
            STATUS_WRONG_CREDENTIALS => Ok(SignInOutcome::WrongCredentials),
            other => Err(IdentityProviderError::UnexpectedStatus(other.to_string())),
        }
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<ResetPasswordOutcome> {
        let path = "/recipe/user/password/reset";
        let builder = self
            .with_headers(self.http.post(self.url(path)), RECIPE_EMAIL_PASSWORD)
            .json(&ResetPasswordRequest {
                method: "token",
                token,
                new_password,
            });

        let response: StatusResponse = self.send(builder, path).await?;
        match response.status.as_str() {
            STATUS_OK => Ok(ResetPasswordOutcome::Ok),
            STATUS_RESET_PASSWORD_INVALID_TOKEN => Ok(ResetPasswordOutcome::InvalidToken),
            other => Err(IdentityProviderError::UnexpectedStatus(other.to_string())),
        }
    }

    async fn update_password(&self, user_id: &str, new_password: &str) -> Result<UpdatePasswordOutcome> {
        let path = "/recipe/user";
        let builder = self
            .with_headers(self.http.put(self.url(path)), RECIPE_EMAIL_PASSWORD)
            .json(&UpdateUserRequest {
                user_id,
                password: new_password,
            });

        let response: StatusResponse = self.send(builder, path).await?;
        match response.status.as_str() {
            STATUS_OK => Ok(UpdatePasswordOutcome::Ok),
            STATUS_UNKNOWN_USER_ID => Ok(UpdatePasswordOutcome::UnknownUser),
            other => Err(IdentityProviderError::UnexpectedStatus(other.to_string())),
        }
    }
}

#[async_trait]
impl SessionStore for SuperTokensClient {
    async fn create(&self, user_id: &str) -> Result<String> {
        let path = "/recipe/session";
        let builder = self
            .with_headers(self.http.post(self.url(path)), RECIPE_SESSION)
            .json(&CreateSessionRequest {
                user_id,
                user_data_in_jwt: serde_json::json!({}),
                user_data_in_database: serde_json::json!({}),
                enable_anti_csrf: false,
            });

        let response: CreateSessionResponse = self.send(builder, path).await?;
        match (response.status.as_str(), response.access_token) {
            (STATUS_OK, Some(access)) => Ok(access.token),
            (other, _) => Err(IdentityProviderError::UnexpectedStatus(other.to_string())),
        }
    }

    async fn verify(&self, access_token: &str) -> Result<Option<String>> {
        let path = "/recipe/session/verify";
        let builder = self
            .with_headers(self.http.post(self.url(path)), RECIPE_SESSION)
            .json(&VerifySessionRequest {
                access_token,
                do_anti_csrf_check: false,
                enable_anti_csrf: false,
                check_database: false,
            });

        let response: VerifySessionResponse = self.send(builder, path).await?;
        match response.status.as_str() {
            STATUS_OK => Ok(response.session.map(|session| session.user_id)),
            STATUS_UNAUTHORISED | STATUS_TRY_REFRESH_TOKEN => Ok(None),
            other => Err(IdentityProviderError::UnexpectedStatus(other.to_string())),
        }
    }
}

// ===== SuperTokens Core Request/Response Types =====

#[derive(Debug, Serialize)]
struct EmailPasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetTokenRequest<'a> {
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest<'a> {
    method: &'a str,
    token: &'a str,
    new_password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserRequest<'a> {
    user_id: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest<'a> {
    user_id: &'a str,
    #[serde(rename = "userDataInJWT")]
    user_data_in_jwt: serde_json::Value,
    user_data_in_database: serde_json::Value,
    enable_anti_csrf: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifySessionRequest<'a> {
    access_token: &'a str,
    do_anti_csrf_check: bool,
    enable_anti_csrf: bool,
    check_database: bool,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    status: String,
    user: Option<CoreUser>,
}

#[derive(Debug, Deserialize)]
struct CoreUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResetTokenResponse {
    status: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    status: String,
    access_token: Option<CoreToken>,
}

#[derive(Debug, Deserialize)]
struct CoreToken {
    token: String,
}

#[derive(Debug, Deserialize)]
struct VerifySessionResponse {
    status: String,
    session: Option<CoreSession>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreSession {
    user_id: String,
}

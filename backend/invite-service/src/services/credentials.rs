/// Placeholder-password guard
///
/// Invitees are signed up with a shared placeholder credential and only become
/// usable once they pick their own password through the reset link. Until then
/// the placeholder must never authenticate anyone, and nobody may set it as a
/// real password.
use crate::clients::{
    CredentialStore, IdentityProviderError, ResetPasswordOutcome, SignInOutcome,
    UpdatePasswordOutcome,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Use a different password")]
    PlaceholderPassword,

    #[error(transparent)]
    Upstream(#[from] IdentityProviderError),
}

impl IntoResponse for CredentialError {
    fn into_response(self) -> Response {
        match self {
            CredentialError::PlaceholderPassword => {
                (StatusCode::BAD_REQUEST, "use a different password").into_response()
            }
            CredentialError::Upstream(e) => {
                error!(error = %e, "Identity provider credential call failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "upstream service unavailable").into_response()
            }
        }
    }
}

/// Rejects the placeholder password before anything reaches the identity provider
pub struct CredentialGuard {
    store: Arc<dyn CredentialStore>,
    placeholder_password: String,
}

impl CredentialGuard {
    pub fn new(store: Arc<dyn CredentialStore>, placeholder_password: impl Into<String>) -> Self {
        Self {
            store,
            placeholder_password: placeholder_password.into(),
        }
    }

    fn is_placeholder(&self, password: &str) -> bool {
        password == self.placeholder_password
    }

    /// Sign in; the placeholder reads as wrong credentials.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome, CredentialError> {
        if self.is_placeholder(password) {
            warn!(email = %email, "Sign-in with placeholder password refused");
            return Ok(SignInOutcome::WrongCredentials);
        }
        Ok(self.store.sign_in(email, password).await?)
    }

    /// Consume a reset token; choosing the placeholder reads as an invalid token.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<ResetPasswordOutcome, CredentialError> {
        if self.is_placeholder(new_password) {
            warn!("Password reset to placeholder password refused");
            return Ok(ResetPasswordOutcome::InvalidToken);
        }
        Ok(self.store.reset_password(token, new_password).await?)
    }

    pub async fn update_password(
        &self,
        user_id: &str,
        new_password: &str,
    ) -> Result<UpdatePasswordOutcome, CredentialError> {
        if self.is_placeholder(new_password) {
            warn!(user_id = %user_id, "Password update to placeholder password refused");
            return Err(CredentialError::PlaceholderPassword);
        }
        Ok(self.store.update_password(user_id, new_password).await?)
    }
}

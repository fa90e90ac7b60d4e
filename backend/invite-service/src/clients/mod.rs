/// Collaborator boundaries consumed by the invitation workflow
///
/// - `IdentityProvider`: SuperTokens core (sign-up, lookup, reset tokens, email)
/// - `Backend`: Hasura GraphQL (user creation and role lookups)
/// - `CredentialStore`: SuperTokens core password operations (sign-in, reset, update)
/// - `SessionStore`: access-token creation and verification for the HTTP layer
///
/// Every call is a fallible network round trip; nothing here retries.
pub mod hasura;
pub mod supertokens;

pub use hasura::HasuraClient;
pub use supertokens::SuperTokensClient;

use crate::models::NewUser;
use async_trait::async_trait;
use thiserror::Error;

/// Result of an email/password sign-up attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    Created { id: String },
    EmailAlreadyExists,
}

#[derive(Debug, Error)]
pub enum IdentityProviderError {
    #[error("Identity provider request failed: {0}")]
    Transport(String),

    #[error("Identity provider returned status {0}")]
    UnexpectedStatus(String),

    #[error("Unknown identity provider user: {0}")]
    UnknownUser(String),

    #[error("Email delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    Transport(String),

    #[error("Backend query error: {0}")]
    Query(String),

    #[error("Expected at most one {entity} row, found {rows}")]
    Ambiguous { entity: &'static str, rows: usize },
}

/// Identity provider operations the workflow depends on
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password user with the given credential.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignUpOutcome, IdentityProviderError>;

    /// Find an existing user id by email.
    async fn lookup_by_email(&self, email: &str) -> Result<Option<String>, IdentityProviderError>;

    /// Issue a single-use password reset token for a user.
    async fn create_reset_token(&self, user_id: &str) -> Result<String, IdentityProviderError>;

    /// Deliver the password reset (invitation) link to the user.
    async fn send_reset_email(
        &self,
        user_id: &str,
        email: &str,
        link: &str,
    ) -> Result<(), IdentityProviderError>;
}

/// Data backend operations the workflow and `/whoami` depend on
#[async_trait]
pub trait Backend: Send + Sync {
    /// Insert the user together with its first group membership.
    async fn create_user(&self, user: &NewUser) -> Result<(), BackendError>;

    /// Backend user id for an email, if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<String>, BackendError>;

    /// Role code of a user within a group, if the user is a member.
    async fn role_in_group(
        &self,
        user_id: &str,
        group_guid: &str,
    ) -> Result<Option<i32>, BackendError>;

    /// Role code stored on the user row itself.
    async fn role_by_id(&self, user_id: &str) -> Result<Option<i32>, BackendError>;
}

/// Result of an email/password sign-in attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    Ok { user_id: String },
    WrongCredentials,
}

/// Result of consuming a password reset token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetPasswordOutcome {
    Ok,
    InvalidToken,
}

/// Result of replacing a user's password directly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePasswordOutcome {
    Ok,
    UnknownUser,
}

/// Password operations forwarded to the identity provider
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str)
        -> Result<SignInOutcome, IdentityProviderError>;

    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<ResetPasswordOutcome, IdentityProviderError>;

    async fn update_password(
        &self,
        user_id: &str,
        new_password: &str,
    ) -> Result<UpdatePasswordOutcome, IdentityProviderError>;
}

/// Issues and resolves session access tokens
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a session for `user_id` and return its access token.
    async fn create(&self, user_id: &str) -> Result<String, IdentityProviderError>;

    /// Resolve an access token to the authenticated user id.
    async fn verify(&self, access_token: &str) -> Result<Option<String>, IdentityProviderError>;
}

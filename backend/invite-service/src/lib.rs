/// Invite Service Library
///
/// Provisions invited group members across the SuperTokens identity provider and the
/// Hasura data backend.
///
/// ## Modules
///
/// - `clients`: Collaborator traits and their SuperTokens / Hasura implementations
/// - `config`: Service configuration
/// - `error`: Error types and HTTP status mapping
/// - `http`: Axum router, session middleware, handlers
/// - `models`: Request and domain types
/// - `services`: Authorization, credential guard, invitation workflow, id generation, email
pub mod clients;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use error::{Result, WorkflowError};
pub use services::{Authorizer, CredentialGuard, InvitationWorkflow, MembershipIdGenerator};

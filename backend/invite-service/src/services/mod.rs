/// Service layer for invite-service
///
/// - Authorization (group role gate for inviters)
/// - Credential guard (placeholder password never authenticates)
/// - Invitation workflow (cross-system reconciliation)
/// - Membership id generation (sortable, monotonic ids)
/// - Email service (SMTP delivery of invitation links)
pub mod authorization;
pub mod credentials;
pub mod email;
pub mod id_generator;
pub mod invitation;

pub use authorization::{AuthorizationError, Authorizer};
pub use credentials::{CredentialError, CredentialGuard};
pub use email::EmailService;
pub use id_generator::MembershipIdGenerator;
pub use invitation::InvitationWorkflow;

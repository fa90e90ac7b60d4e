/// Invitation workflow
///
/// Provisions an invitee across the identity provider and the data backend:
///
/// 1. Validate the request (hard stop, no external calls)
/// 2. Authorize the inviter in the target group
/// 3. Sign up the invitee, or reuse an identity left by an earlier attempt
/// 4. Create the backend user with a fresh membership id
/// 5. Issue a reset token and send the password setup link
///
/// Nothing is retried or rolled back. A retry after a failure at step 4 or 5
/// re-derives state from both systems and lands in the reconciliation branch
/// of step 3 instead of duplicating the identity.
use crate::clients::{Backend, IdentityProvider, SignUpOutcome};
use crate::error::{Result, Stage, WorkflowError};
use crate::models::{InvitationRequest, Inviter, NewUser};
use crate::services::{Authorizer, MembershipIdGenerator};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use validator::Validate;

/// Where the invitee's identity id came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentitySource {
    SignedUp,
    Reconciled,
}

pub struct InvitationWorkflow {
    identity: Arc<dyn IdentityProvider>,
    backend: Arc<dyn Backend>,
    authorizer: Authorizer,
    ids: MembershipIdGenerator,
    placeholder_password: String,
    reset_password_url: String,
}

impl InvitationWorkflow {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        backend: Arc<dyn Backend>,
        placeholder_password: impl Into<String>,
        reset_password_url: impl Into<String>,
    ) -> Self {
        Self {
            authorizer: Authorizer::new(Arc::clone(&backend)),
            identity,
            backend,
            ids: MembershipIdGenerator::new(),
            placeholder_password: placeholder_password.into(),
            reset_password_url: reset_password_url.into(),
        }
    }

    /// Run the invitation chain.
    ///
    /// `deadline` is checked before every external call; once it has passed the
    /// chain stops with `DeadlineExceeded` and earlier stages stay committed.
    pub async fn invite(
        &self,
        inviter: &Inviter,
        request: &InvitationRequest,
        deadline: Option<Instant>,
    ) -> Result<()> {
        if let Err(e) = request.validate() {
            warn!(
                stage = %Stage::Validate,
                inviter_id = %inviter.id,
                email = %request.email,
                group_guid = %request.group_guid,
                error = %e,
                "Rejected invalid invitation request"
            );
            return Err(WorkflowError::InvalidRequest(e.to_string()));
        }

        let email = request.email.as_str();
        let group_guid = request.group_guid.as_str();

        check_deadline(deadline, Stage::Authorize)?;
        let tier = self
            .authorizer
            .authorize(&inviter.id, group_guid)
            .await
            .map_err(|e| {
                warn!(
                    stage = %Stage::Authorize,
                    inviter_id = %inviter.id,
                    group_guid = %group_guid,
                    email = %email,
                    error = %e,
                    "Inviter not permitted"
                );
                WorkflowError::Forbidden(e)
            })?;

        let (identity_id, source) = self.resolve_identity(request, deadline).await?;

        check_deadline(deadline, Stage::CreateUser)?;
        let user = NewUser {
            identity_id: identity_id.clone(),
            name: request.name.clone(),
            email: request.email.clone(),
            membership_link_id: self.ids.new_id(Utc::now()),
            group_id: request.group_id,
        };
        if let Err(e) = self.backend.create_user(&user).await {
            error!(
                stage = %Stage::CreateUser,
                identity_id = %identity_id,
                email = %email,
                group_guid = %group_guid,
                group_id = request.group_id,
                error = %e,
                "Backend user creation failed; identity left for reconciliation"
            );
            return Err(WorkflowError::PersistenceFailed(e.to_string()));
        }

        self.send_invitation(&identity_id, request, deadline).await?;

        info!(
            inviter_id = %inviter.id,
            inviter_role = %tier,
            identity_id = %identity_id,
            membership_link_id = %user.membership_link_id,
            email = %email,
            group_guid = %group_guid,
            reconciled = source == IdentitySource::Reconciled,
            "Invitation completed"
        );

        Ok(())
    }

    async fn resolve_identity(
        &self,
        request: &InvitationRequest,
        deadline: Option<Instant>,
    ) -> Result<(String, IdentitySource)> {
        let email = request.email.as_str();
        let group_guid = request.group_guid.as_str();

        check_deadline(deadline, Stage::SignUp)?;
        let outcome = self
            .identity
            .sign_up(email, &self.placeholder_password)
            .await
            .map_err(|e| {
                error!(
                    stage = %Stage::SignUp,
                    email = %email,
                    group_guid = %group_guid,
                    error = %e,
                    "Identity provider sign-up failed"
                );
                WorkflowError::UpstreamUnavailable {
                    stage: Stage::SignUp,
                    message: e.to_string(),
                }
            })?;

        if let SignUpOutcome::Created { id } = outcome {
            return Ok((id, IdentitySource::SignedUp));
        }
        info!(email = %email, group_guid = %group_guid, "Identity already exists; reconciling");

        check_deadline(deadline, Stage::FindBackendUser)?;
        match self.backend.find_by_email(email).await {
            Ok(Some(backend_id)) => {
                info!(
                    email = %email,
                    group_guid = %group_guid,
                    backend_id = %backend_id,
                    "Invitee already registered in both systems"
                );
                return Err(WorkflowError::AlreadyFullyRegistered);
            }
            Ok(None) => {}
            Err(e) => {
                error!(
                    stage = %Stage::FindBackendUser,
                    email = %email,
                    group_guid = %group_guid,
                    error = %e,
                    "Backend lookup by email failed"
                );
                return Err(WorkflowError::UpstreamUnavailable {
                    stage: Stage::FindBackendUser,
                    message: e.to_string(),
                });
            }
        }

        check_deadline(deadline, Stage::LookupIdentity)?;
        match self.identity.lookup_by_email(email).await {
            Ok(Some(id)) => {
                info!(identity_id = %id, email = %email, "Reusing identity from an earlier attempt");
                Ok((id, IdentitySource::Reconciled))
            }
            Ok(None) => {
                error!(
                    stage = %Stage::LookupIdentity,
                    email = %email,
                    group_guid = %group_guid,
                    "Identity reported as existing but lookup found nothing"
                );
                Err(WorkflowError::UpstreamUnavailable {
                    stage: Stage::LookupIdentity,
                    message: "identity disappeared during reconciliation".to_string(),
                })
            }
            Err(e) => {
                error!(
                    stage = %Stage::LookupIdentity,
                    email = %email,
                    group_guid = %group_guid,
                    error = %e,
                    "Identity lookup by email failed"
                );
                Err(WorkflowError::UpstreamUnavailable {
                    stage: Stage::LookupIdentity,
                    message: e.to_string(),
                })
            }
        }
    }

    async fn send_invitation(
        &self,
        identity_id: &str,
        request: &InvitationRequest,
        deadline: Option<Instant>,
    ) -> Result<()> {
        let notification_failed = |stage: Stage, message: String| {
            error!(
                stage = %stage,
                identity_id = %identity_id,
                email = %request.email,
                group_guid = %request.group_guid,
                error = %message,
                "Invitation email not delivered; backend user already committed"
            );
            WorkflowError::NotificationFailed { stage, message }
        };

        check_deadline(deadline, Stage::CreateResetToken)?;
        let token = self
            .identity
            .create_reset_token(identity_id)
            .await
            .map_err(|e| notification_failed(Stage::CreateResetToken, e.to_string()))?;

        let link = self.invitation_link(&token);

        check_deadline(deadline, Stage::SendResetEmail)?;
        self.identity
            .send_reset_email(identity_id, &request.email, &link)
            .await
            .map_err(|e| notification_failed(Stage::SendResetEmail, e.to_string()))
    }

    fn invitation_link(&self, token: &str) -> String {
        format!(
            "{}?token={}",
            self.reset_password_url,
            urlencoding::encode(token)
        )
    }
}

fn check_deadline(deadline: Option<Instant>, next: Stage) -> Result<()> {
    match deadline {
        Some(at) if Instant::now() >= at => {
            warn!(stage = %next, "Invitation deadline passed; stopping before next call");
            Err(WorkflowError::DeadlineExceeded(next))
        }
        _ => Ok(()),
    }
}

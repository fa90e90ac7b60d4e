/// Group role gate for inviters
use crate::clients::{Backend, BackendError};
use crate::models::RoleTier;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("Inviter has no membership in the group")]
    SubjectNotFound,

    #[error("Inviter has {rows} membership rows in the group")]
    AmbiguousSubject { rows: usize },

    #[error("Role {0} may not invite members")]
    InsufficientPrivilege(RoleTier),

    #[error("Role lookup failed: {0}")]
    Upstream(String),
}

/// Decides whether an inviter may add members to a group
#[derive(Clone)]
pub struct Authorizer {
    backend: Arc<dyn Backend>,
}

impl Authorizer {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Resolve the inviter's tier in `group_guid` and require owner or super.
    pub async fn authorize(
        &self,
        inviter_id: &str,
        group_guid: &str,
    ) -> Result<RoleTier, AuthorizationError> {
        let code = match self.backend.role_in_group(inviter_id, group_guid).await {
            Ok(Some(code)) => code,
            Ok(None) => return Err(AuthorizationError::SubjectNotFound),
            Err(BackendError::Ambiguous { rows, .. }) => {
                warn!(
                    inviter_id = %inviter_id,
                    group_guid = %group_guid,
                    rows,
                    "Multiple membership rows for inviter; refusing request"
                );
                return Err(AuthorizationError::AmbiguousSubject { rows });
            }
            Err(e) => return Err(AuthorizationError::Upstream(e.to_string())),
        };

        let tier = RoleTier::from_code(code);
        debug!(inviter_id = %inviter_id, group_guid = %group_guid, role = %tier, "Resolved inviter role");

        if tier.can_invite() {
            Ok(tier)
        } else {
            Err(AuthorizationError::InsufficientPrivilege(tier))
        }
    }
}

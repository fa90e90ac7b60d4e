/// Request and domain types shared by the workflow and the HTTP layer
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// The authenticated actor performing an invitation.
///
/// Resolved from the verified session; never persisted by this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inviter {
    pub id: String,
}

impl Inviter {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Body of `POST /invite`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvitationRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "groupGuid is required"))]
    pub group_guid: String,

    pub group_id: i64,
}

/// Numeric role codes stored on backend membership rows
pub mod role {
    pub const USER: i32 = 1;
    pub const OWNER: i32 = 2;
    pub const SUPER: i32 = 3;
}

/// Named role tier exposed to Hasura as `X-Hasura-Role`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTier {
    User,
    Owner,
    Super,
}

impl RoleTier {
    /// Fixed mapping: 2 → owner, 3 → super, every other code → user.
    pub fn from_code(code: i32) -> Self {
        match code {
            role::OWNER => RoleTier::Owner,
            role::SUPER => RoleTier::Super,
            _ => RoleTier::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTier::User => "user",
            RoleTier::Owner => "owner",
            RoleTier::Super => "super",
        }
    }

    /// Only owners and supers may invite new members.
    pub fn can_invite(&self) -> bool {
        matches!(self, RoleTier::Owner | RoleTier::Super)
    }
}

impl fmt::Display for RoleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary key of the membership join row created alongside a backend user
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipLinkId(String);

impl MembershipLinkId {
    pub(crate) fn from_encoded(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MembershipLinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend user plus its first group membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Identity-provider user id, used as the backend primary key
    pub identity_id: String,
    pub name: String,
    pub email: String,
    pub membership_link_id: MembershipLinkId,
    pub group_id: i64,
}

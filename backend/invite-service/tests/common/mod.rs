//! Stateful in-memory collaborators shared by the integration tests.
//!
//! Unlike the mockall mocks, these keep state across invocations so a second
//! invitation sees what the first one left behind.
#![allow(dead_code)]

use async_trait::async_trait;
use invite_service::clients::{
    Backend, BackendError, CredentialStore, IdentityProvider, IdentityProviderError,
    ResetPasswordOutcome, SessionStore, SignInOutcome, SignUpOutcome, UpdatePasswordOutcome,
};
use invite_service::models::{InvitationRequest, Inviter, NewUser};
use invite_service::InvitationWorkflow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const PLACEHOLDER: &str = "placeholder-Passw0rd!";
pub const RESET_URL: &str = "https://app.example.com/auth/reset-password";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdentityCalls {
    pub sign_up: usize,
    pub lookup_by_email: usize,
    pub create_reset_token: usize,
    pub send_reset_email: usize,
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub user_id: String,
    pub email: String,
    pub link: String,
}

#[derive(Default)]
struct IdentityState {
    users: HashMap<String, String>,
    next_id: usize,
    calls: IdentityCalls,
    sent: Vec<SentEmail>,
    failing_emails: usize,
}

/// Identity provider keyed by email
#[derive(Default)]
pub struct FakeIdentityProvider {
    state: Mutex<IdentityState>,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, email: &str, id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .users
            .insert(email.to_string(), id.to_string());
        self
    }

    /// Make the next `n` email deliveries fail
    pub fn fail_emails(&self, n: usize) {
        self.state.lock().unwrap().failing_emails = n;
    }

    pub fn calls(&self) -> IdentityCalls {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.state.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<SignUpOutcome, IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.sign_up += 1;
        if state.users.contains_key(email) {
            return Ok(SignUpOutcome::EmailAlreadyExists);
        }
        state.next_id += 1;
        let id = format!("U{}", state.next_id);
        state.users.insert(email.to_string(), id.clone());
        Ok(SignUpOutcome::Created { id })
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Option<String>, IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.lookup_by_email += 1;
        Ok(state.users.get(email).cloned())
    }

    async fn create_reset_token(&self, user_id: &str) -> Result<String, IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.create_reset_token += 1;
        Ok(format!("T-{}-{}", user_id, state.calls.create_reset_token))
    }

    async fn send_reset_email(
        &self,
        user_id: &str,
        email: &str,
        link: &str,
    ) -> Result<(), IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.send_reset_email += 1;
        if state.failing_emails > 0 {
            state.failing_emails -= 1;
            return Err(IdentityProviderError::Delivery("smtp unavailable".to_string()));
        }
        state.sent.push(SentEmail {
            user_id: user_id.to_string(),
            email: email.to_string(),
            link: link.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackendCalls {
    pub create_user: usize,
    pub find_by_email: usize,
    pub role_in_group: usize,
    pub role_by_id: usize,
}

#[derive(Default)]
struct BackendState {
    users: HashMap<String, NewUser>,
    memberships: HashMap<(String, String), Vec<i32>>,
    roles: HashMap<String, i32>,
    attempted: Vec<NewUser>,
    calls: BackendCalls,
    failing_creates: usize,
}

/// Backend keyed by identity id, with group memberships for inviters
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `user_id` a membership row with `role` in `group_guid`
    pub fn with_membership(self, user_id: &str, group_guid: &str, role: i32) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state
                .memberships
                .entry((user_id.to_string(), group_guid.to_string()))
                .or_default()
                .push(role);
            state.roles.insert(user_id.to_string(), role);
        }
        self
    }

    pub fn with_user(self, id: &str, email: &str) -> Self {
        self.state.lock().unwrap().users.insert(
            id.to_string(),
            NewUser {
                identity_id: id.to_string(),
                name: "Existing".to_string(),
                email: email.to_string(),
                membership_link_id: invite_service::MembershipIdGenerator::new()
                    .new_id(chrono::Utc::now()),
                group_id: 1,
            },
        );
        self
    }

    /// Make the next `n` user creations fail
    pub fn fail_creates(&self, n: usize) {
        self.state.lock().unwrap().failing_creates = n;
    }

    pub fn calls(&self) -> BackendCalls {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn user(&self, id: &str) -> Option<NewUser> {
        self.state.lock().unwrap().users.get(id).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    /// Every `create_user` payload, including failed attempts
    pub fn attempted(&self) -> Vec<NewUser> {
        self.state.lock().unwrap().attempted.clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn create_user(&self, user: &NewUser) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.create_user += 1;
        state.attempted.push(user.clone());
        if state.failing_creates > 0 {
            state.failing_creates -= 1;
            return Err(BackendError::Transport("connection reset".to_string()));
        }
        if state.users.contains_key(&user.identity_id) {
            return Err(BackendError::Query("Uniqueness violation".to_string()));
        }
        state.users.insert(user.identity_id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<String>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.find_by_email += 1;
        Ok(state
            .users
            .values()
            .find(|user| user.email == email)
            .map(|user| user.identity_id.clone()))
    }

    async fn role_in_group(
        &self,
        user_id: &str,
        group_guid: &str,
    ) -> Result<Option<i32>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.role_in_group += 1;
        match state
            .memberships
            .get(&(user_id.to_string(), group_guid.to_string()))
            .map(Vec::as_slice)
        {
            None | Some([]) => Ok(None),
            Some([role]) => Ok(Some(*role)),
            Some(rows) => Err(BackendError::Ambiguous {
                entity: "user_groups",
                rows: rows.len(),
            }),
        }
    }

    async fn role_by_id(&self, user_id: &str) -> Result<Option<i32>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.role_by_id += 1;
        Ok(state.roles.get(user_id).copied())
    }
}

/// Issues and accepts `tok-<user id>` access tokens
pub struct FakeSessions;

#[async_trait]
impl SessionStore for FakeSessions {
    async fn create(&self, user_id: &str) -> Result<String, IdentityProviderError> {
        Ok(format!("tok-{user_id}"))
    }

    async fn verify(&self, access_token: &str) -> Result<Option<String>, IdentityProviderError> {
        Ok(access_token.strip_prefix("tok-").map(str::to_string))
    }
}

#[derive(Default)]
struct CredentialState {
    /// email -> (user id, password)
    accounts: HashMap<String, (String, String)>,
    /// reset token -> user id
    reset_tokens: HashMap<String, String>,
    calls: usize,
}

/// Password store that counts every call reaching it
#[derive(Default)]
pub struct FakeCredentialStore {
    state: Mutex<CredentialState>,
}

impl FakeCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, email: &str, user_id: &str, password: &str) -> Self {
        self.state.lock().unwrap().accounts.insert(
            email.to_string(),
            (user_id.to_string(), password.to_string()),
        );
        self
    }

    pub fn with_reset_token(self, token: &str, user_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .reset_tokens
            .insert(token.to_string(), user_id.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn password_of(&self, user_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .values()
            .find(|(id, _)| id == user_id)
            .map(|(_, password)| password.clone())
    }

    fn set_password(state: &mut CredentialState, user_id: &str, password: &str) -> bool {
        match state.accounts.values_mut().find(|(id, _)| id == user_id) {
            Some(account) => {
                account.1 = password.to_string();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CredentialStore for FakeCredentialStore {
    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInOutcome, IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        Ok(match state.accounts.get(email) {
            Some((id, stored)) if stored == password => SignInOutcome::Ok {
                user_id: id.clone(),
            },
            _ => SignInOutcome::WrongCredentials,
        })
    }

    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<ResetPasswordOutcome, IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        let Some(user_id) = state.reset_tokens.remove(token) else {
            return Ok(ResetPasswordOutcome::InvalidToken);
        };
        Self::set_password(&mut state, &user_id, new_password);
        Ok(ResetPasswordOutcome::Ok)
    }

    async fn update_password(
        &self,
        user_id: &str,
        new_password: &str,
    ) -> Result<UpdatePasswordOutcome, IdentityProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if Self::set_password(&mut state, user_id, new_password) {
            Ok(UpdatePasswordOutcome::Ok)
        } else {
            Ok(UpdatePasswordOutcome::UnknownUser)
        }
    }
}

pub fn workflow(
    identity: Arc<FakeIdentityProvider>,
    backend: Arc<FakeBackend>,
) -> InvitationWorkflow {
    InvitationWorkflow::new(identity, backend, PLACEHOLDER, RESET_URL)
}

pub fn owner() -> Inviter {
    Inviter::new("owner-1")
}

pub fn request(email: &str) -> InvitationRequest {
    InvitationRequest {
        name: "New Member".to_string(),
        email: email.to_string(),
        group_guid: "g1".to_string(),
        group_id: 1,
    }
}

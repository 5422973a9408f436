//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

use crate::claims::Principal;
use crate::error::TokenResult;
use crate::provider::{IdentityProvider, SignInResult, TokenIssuer, UserDirectory};
use crate::ticket::{AuthenticatedTicket, Ticket};
use crate::token::TokenResponse;
use crate::types::{claims, TokenType};

pub const VALID_REFRESH_TOKEN: &str = "valid-refresh";

#[derive(Debug, Clone)]
pub struct FakeUser {
    pub id: String,
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub enabled: bool,
}

pub fn alice() -> FakeUser {
    FakeUser {
        id: "1".to_string(),
        username: "alice".to_string(),
        password: "correct horse".to_string(),
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        roles: vec!["user".to_string()],
        enabled: true,
    }
}

#[derive(Debug, Default)]
pub struct FakeDirectory {
    users: Vec<FakeUser>,
}

impl FakeDirectory {
    pub fn with_users(users: Vec<FakeUser>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    type User = FakeUser;

    async fn find_by_name(
        &self,
        username: &str,
        _cancel: &CancellationToken,
    ) -> TokenResult<Option<FakeUser>> {
        Ok(self.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_principal(
        &self,
        principal: &Principal,
        _cancel: &CancellationToken,
    ) -> TokenResult<Option<FakeUser>> {
        Ok(principal
            .subject()
            .and_then(|sub| self.users.iter().find(|u| u.id == sub).cloned()))
    }
}

#[derive(Debug, Default)]
pub struct FakeIdentity {
    pub failures: AtomicUsize,
    pub lockout_requested: AtomicBool,
    locked: bool,
}

impl FakeIdentity {
    pub fn locked_out() -> Self {
        Self {
            locked: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl IdentityProvider<FakeUser> for FakeIdentity {
    async fn check_password(
        &self,
        user: &FakeUser,
        password: &str,
        lockout_on_failure: bool,
        _cancel: &CancellationToken,
    ) -> TokenResult<SignInResult> {
        if self.locked {
            return Ok(SignInResult::LockedOut);
        }
        if user.password == password {
            return Ok(SignInResult::Succeeded);
        }
        self.failures.fetch_add(1, Ordering::SeqCst);
        self.lockout_requested
            .store(lockout_on_failure, Ordering::SeqCst);
        Ok(SignInResult::Failed)
    }

    async fn can_sign_in(&self, user: &FakeUser, _cancel: &CancellationToken) -> TokenResult<bool> {
        Ok(user.enabled && !self.locked)
    }

    async fn create_principal(
        &self,
        user: &FakeUser,
        _cancel: &CancellationToken,
    ) -> TokenResult<Principal> {
        let mut principal = Principal::default()
            .with_claim(claims::SUBJECT, &user.id)
            .with_claim(claims::NAME, &user.name)
            .with_claim(claims::EMAIL, &user.email);
        for role in &user.roles {
            principal = principal.with_claim(claims::ROLE, role);
        }
        Ok(principal.with_claim(claims::SECURITY_STAMP, "stamp"))
    }
}

/// Accepts [`VALID_REFRESH_TOKEN`] when a stored ticket is configured.
#[derive(Debug, Default)]
pub struct FakeIssuer {
    stored: Option<AuthenticatedTicket>,
}

impl FakeIssuer {
    pub fn with_stored(stored: AuthenticatedTicket) -> Self {
        Self {
            stored: Some(stored),
        }
    }
}

#[async_trait]
impl TokenIssuer for FakeIssuer {
    async fn authenticate_incoming(
        &self,
        refresh_token: &str,
        _cancel: &CancellationToken,
    ) -> TokenResult<Option<AuthenticatedTicket>> {
        if refresh_token == VALID_REFRESH_TOKEN {
            Ok(self.stored.clone())
        } else {
            Ok(None)
        }
    }

    async fn issue(&self, ticket: &Ticket, _cancel: &CancellationToken) -> TokenResult<TokenResponse> {
        let scope = ticket.scopes().iter().cloned().collect::<Vec<_>>().join(" ");
        Ok(TokenResponse {
            access_token: format!("access-token-for-{}", ticket.subject().unwrap_or_default()),
            token_type: TokenType::Bearer,
            expires_in: 300,
            refresh_token: None,
            id_token: None,
            scope: (!scope.is_empty()).then_some(scope),
        })
    }
}

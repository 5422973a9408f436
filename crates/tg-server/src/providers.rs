//! Provider implementations for the server.
//!
//! Connects the grant dispatcher's collaborator traits to the in-memory
//! identity store.

use std::sync::Arc;

use async_trait::async_trait;
use tg_identity::{IdentityError, InMemoryIdentityStore, PasswordCheck, User};
use tg_protocol::claims::Principal;
use tg_protocol::error::{TokenError, TokenResult};
use tg_protocol::provider::{IdentityProvider, SignInResult, UserDirectory};
use tg_protocol::types::claims;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// User directory and identity provider backed by [`InMemoryIdentityStore`].
#[derive(Clone)]
pub struct IdentityProviders {
    store: Arc<InMemoryIdentityStore>,
}

impl IdentityProviders {
    /// Creates providers over a store.
    #[must_use]
    pub const fn new(store: Arc<InMemoryIdentityStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &InMemoryIdentityStore {
        &self.store
    }
}

fn storage_error(err: &IdentityError) -> TokenError {
    TokenError::ServerError(format!("identity store error: {err}"))
}

#[async_trait]
impl UserDirectory for IdentityProviders {
    type User = User;

    async fn find_by_name(
        &self,
        username: &str,
        _cancel: &CancellationToken,
    ) -> TokenResult<Option<User>> {
        if let Some(user) = self.store.find_by_username(username) {
            return Ok(Some(user));
        }

        // Unknown names pay for one verification too.
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.verify_unknown_user())
            .await
            .map_err(|e| TokenError::ServerError(format!("password check task failed: {e}")))?;
        Ok(None)
    }

    async fn find_by_principal(
        &self,
        principal: &Principal,
        _cancel: &CancellationToken,
    ) -> TokenResult<Option<User>> {
        let Some(id) = principal.subject().and_then(|sub| Uuid::parse_str(sub).ok()) else {
            return Ok(None);
        };
        Ok(self.store.get(id))
    }
}

#[async_trait]
impl IdentityProvider<User> for IdentityProviders {
    async fn check_password(
        &self,
        user: &User,
        password: &str,
        lockout_on_failure: bool,
        _cancel: &CancellationToken,
    ) -> TokenResult<SignInResult> {
        // Argon2 is CPU bound; keep it off the async workers.
        let store = Arc::clone(&self.store);
        let id = user.id;
        let password = password.to_string();
        let outcome = tokio::task::spawn_blocking(move || {
            store.check_password(id, &password, lockout_on_failure)
        })
        .await
        .map_err(|e| TokenError::ServerError(format!("password check task failed: {e}")))?;

        match outcome {
            Ok(PasswordCheck::Success) => Ok(SignInResult::Succeeded),
            Ok(PasswordCheck::Failed) => Ok(SignInResult::Failed),
            Ok(PasswordCheck::LockedOut) => Ok(SignInResult::LockedOut),
            Ok(PasswordCheck::Disabled) => Ok(SignInResult::NotAllowed),
            // Deleted between lookup and check.
            Err(IdentityError::UserNotFound(_)) => Ok(SignInResult::Failed),
            Err(ref err) => Err(storage_error(err)),
        }
    }

    async fn can_sign_in(&self, user: &User, _cancel: &CancellationToken) -> TokenResult<bool> {
        Ok(self.store.can_sign_in(user.id))
    }

    async fn create_principal(
        &self,
        user: &User,
        _cancel: &CancellationToken,
    ) -> TokenResult<Principal> {
        // Re-read so role and profile changes since the lookup are picked up.
        let current = self
            .store
            .get(user.id)
            .ok_or_else(|| storage_error(&IdentityError::UserNotFound(user.id)))?;

        let mut principal = Principal::default()
            .with_claim(claims::SUBJECT, current.id.to_string())
            .with_claim(claims::NAME, current.name());
        if let Some(email) = &current.email {
            principal = principal.with_claim(claims::EMAIL, email);
        }
        for role in &current.roles {
            principal = principal.with_claim(claims::ROLE, role);
        }
        Ok(principal.with_claim(claims::SECURITY_STAMP, &current.security_stamp))
    }
}

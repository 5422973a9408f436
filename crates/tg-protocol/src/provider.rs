//! Collaborator traits consumed by the grant dispatcher.
//!
//! User storage, credential checks and token serialization live outside this
//! crate. Implement these traits to plug them in. Every method receives the
//! request's cancellation token and should stop work once it fires.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::claims::Principal;
use crate::error::TokenResult;
use crate::ticket::{AuthenticatedTicket, Ticket};
use crate::token::TokenResponse;

/// Outcome of a password check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInResult {
    /// The password matched.
    Succeeded,
    /// The password did not match.
    Failed,
    /// The account is locked out.
    LockedOut,
    /// The account may not sign in (disabled, unconfirmed).
    NotAllowed,
}

impl SignInResult {
    /// Returns `true` if the check succeeded.
    #[must_use]
    pub const fn succeeded(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Looks users up.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// User handle returned by lookups.
    type User: Send + Sync;

    /// Finds a user by username.
    async fn find_by_name(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> TokenResult<Option<Self::User>>;

    /// Finds the user a stored principal belongs to.
    async fn find_by_principal(
        &self,
        principal: &Principal,
        cancel: &CancellationToken,
    ) -> TokenResult<Option<Self::User>>;
}

/// Verifies credentials and derives principals.
#[async_trait]
pub trait IdentityProvider<U: Send + Sync>: Send + Sync {
    /// Checks a password.
    ///
    /// With `lockout_on_failure` set, a failed check counts towards the
    /// account lockout threshold.
    async fn check_password(
        &self,
        user: &U,
        password: &str,
        lockout_on_failure: bool,
        cancel: &CancellationToken,
    ) -> TokenResult<SignInResult>;

    /// Returns whether the user may currently sign in.
    async fn can_sign_in(&self, user: &U, cancel: &CancellationToken) -> TokenResult<bool>;

    /// Builds a fresh principal for the user.
    async fn create_principal(&self, user: &U, cancel: &CancellationToken)
        -> TokenResult<Principal>;
}

/// Serializes tickets into tokens and reads back refresh tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Resolves a refresh token into the ticket it was issued for.
    ///
    /// Returns `Ok(None)` for tokens that are malformed, expired, or not
    /// refresh tokens.
    async fn authenticate_incoming(
        &self,
        refresh_token: &str,
        cancel: &CancellationToken,
    ) -> TokenResult<Option<AuthenticatedTicket>>;

    /// Issues tokens for a ticket.
    async fn issue(&self, ticket: &Ticket, cancel: &CancellationToken) -> TokenResult<TokenResponse>;
}

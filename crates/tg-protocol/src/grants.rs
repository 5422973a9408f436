//! Grant dispatcher for the token endpoint.
//!
//! Two grant types are handled:
//! - `password`: the user presents a username and password
//! - `refresh_token`: the client presents a refresh token issued earlier
//!
//! Each request walks through the states of [`ExchangeState`]:
//!
//! ```text
//! Received -> GrantTypeResolved -> PrincipalResolved -> TicketBuilt -> Issued
//!                    |                    |
//!                    +------> Rejected <--+
//! ```
//!
//! Collaborator calls are awaited one after the other and every one of them
//! is raced against the request's cancellation token.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{InvalidGrantReason, TokenError, TokenResult};
use crate::provider::{IdentityProvider, TokenIssuer, UserDirectory};
use crate::request::TokenRequest;
use crate::ticket::{Properties, Ticket};
use crate::token::TokenResponse;
use crate::types::{scopes, GrantType};

/// Per-request exchange state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// The request arrived.
    Received,
    /// The grant type is known and supported.
    GrantTypeResolved,
    /// The user behind the grant was authenticated.
    PrincipalResolved,
    /// The request failed. Terminal.
    Rejected,
    /// A ticket was assembled.
    TicketBuilt,
    /// Tokens were issued. Terminal.
    Issued,
}

impl ExchangeState {
    /// Returns `true` for states a request never leaves.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Issued)
    }
}

impl fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::GrantTypeResolved => "grant_type_resolved",
            Self::PrincipalResolved => "principal_resolved",
            Self::Rejected => "rejected",
            Self::TicketBuilt => "ticket_built",
            Self::Issued => "issued",
        };
        f.write_str(name)
    }
}

/// Intersects requested scopes with the scopes a password grant may obtain.
#[must_use]
pub fn granted_scopes(requested: &BTreeSet<String>) -> BTreeSet<String> {
    requested
        .iter()
        .filter(|scope| scopes::ALLOWED.contains(&scope.as_str()))
        .cloned()
        .collect()
}

/// Runs a token exchange end to end.
///
/// This is the seam the HTTP layer depends on.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Exchanges a grant for tokens.
    async fn exchange_tokens(
        &self,
        request: &TokenRequest,
        cancel: &CancellationToken,
    ) -> TokenResult<TokenResponse>;
}

/// Dispatches token requests to the grant handlers.
pub struct GrantDispatcher<D, P, I> {
    directory: Arc<D>,
    identity: Arc<P>,
    issuer: Arc<I>,
}

impl<D, P, I> GrantDispatcher<D, P, I>
where
    D: UserDirectory,
    P: IdentityProvider<D::User>,
    I: TokenIssuer,
{
    /// Creates a dispatcher over the given collaborators.
    #[must_use]
    pub const fn new(directory: Arc<D>, identity: Arc<P>, issuer: Arc<I>) -> Self {
        Self {
            directory,
            identity,
            issuer,
        }
    }

    /// Resolves a request into a ticket.
    ///
    /// # Errors
    ///
    /// - `invalid_request` when a required parameter is missing
    /// - `unsupported_grant_type` for anything but `password` and
    ///   `refresh_token`
    /// - `invalid_grant` when the credentials or refresh token are rejected
    /// - collaborator failures and cancellation as-is
    pub async fn exchange(
        &self,
        request: &TokenRequest,
        cancel: &CancellationToken,
    ) -> TokenResult<Ticket> {
        let mut state = ExchangeState::Received;
        let result = self.resolve(request, cancel, &mut state).await;
        match &result {
            Ok(_) => advance(&mut state, ExchangeState::TicketBuilt),
            Err(_) => advance(&mut state, ExchangeState::Rejected),
        }
        result
    }

    /// Resolves a request and issues tokens for it.
    ///
    /// # Errors
    ///
    /// Everything [`exchange`](Self::exchange) returns, plus issuer failures.
    #[tracing::instrument(skip_all, fields(grant_type = %request.grant_type))]
    pub async fn handle(
        &self,
        request: &TokenRequest,
        cancel: &CancellationToken,
    ) -> TokenResult<TokenResponse> {
        let result = match self.exchange(request, cancel).await {
            Ok(ticket) => guarded(cancel, self.issuer.issue(&ticket, cancel)).await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(response) => {
                tracing::info!(
                    state = %ExchangeState::Issued,
                    scope = response.scope.as_deref().unwrap_or_default(),
                    "tokens issued"
                );
            }
            Err(err) if err.is_client_error() => {
                tracing::info!(
                    error = err.error_code(),
                    description = %err,
                    "token request rejected"
                );
            }
            Err(TokenError::Cancelled) => {
                tracing::debug!("token request cancelled");
            }
            Err(err) => {
                tracing::error!(error = %err, "token request failed");
            }
        }
        result
    }

    async fn resolve(
        &self,
        request: &TokenRequest,
        cancel: &CancellationToken,
        state: &mut ExchangeState,
    ) -> TokenResult<Ticket> {
        let ticket = match request.parsed_grant_type()? {
            GrantType::Password => {
                advance(state, ExchangeState::GrantTypeResolved);
                self.password_grant(request, cancel).await?
            }
            GrantType::RefreshToken => {
                advance(state, ExchangeState::GrantTypeResolved);
                self.refresh_token_grant(request, cancel).await?
            }
            GrantType::Unsupported(grant_type) => {
                return Err(TokenError::UnsupportedGrantType(grant_type));
            }
        };
        advance(state, ExchangeState::PrincipalResolved);
        Ok(ticket)
    }

    async fn password_grant(
        &self,
        request: &TokenRequest,
        cancel: &CancellationToken,
    ) -> TokenResult<Ticket> {
        let username = TokenRequest::require(request.username.as_deref(), "username")?;
        let password = TokenRequest::require(request.password.as_deref(), "password")?;

        let rejected = TokenError::invalid_grant(InvalidGrantReason::InvalidCredentials);

        let Some(user) = guarded(cancel, self.directory.find_by_name(username, cancel)).await?
        else {
            return Err(rejected);
        };

        let outcome = guarded(
            cancel,
            self.identity.check_password(&user, password, true, cancel),
        )
        .await?;
        if !outcome.succeeded() {
            tracing::debug!(?outcome, "password check failed");
            return Err(rejected);
        }

        let principal = guarded(cancel, self.identity.create_principal(&user, cancel)).await?;

        Ok(Ticket::build(
            principal,
            granted_scopes(&request.scopes()),
            Properties::new(),
        ))
    }

    async fn refresh_token_grant(
        &self,
        request: &TokenRequest,
        cancel: &CancellationToken,
    ) -> TokenResult<Ticket> {
        let refresh_token =
            TokenRequest::require(request.refresh_token.as_deref(), "refresh_token")?;

        let revoked = || TokenError::invalid_grant(InvalidGrantReason::RefreshTokenRevoked);

        let stored = guarded(
            cancel,
            self.issuer.authenticate_incoming(refresh_token, cancel),
        )
        .await?
        .ok_or_else(revoked)?;

        let user = guarded(
            cancel,
            self.directory.find_by_principal(&stored.principal, cancel),
        )
        .await?
        .ok_or_else(revoked)?;

        if !guarded(cancel, self.identity.can_sign_in(&user, cancel)).await? {
            return Err(TokenError::invalid_grant(
                InvalidGrantReason::SignInNotAllowed,
            ));
        }

        let principal = guarded(cancel, self.identity.create_principal(&user, cancel)).await?;

        // Scopes and properties come from the original grant, not the request.
        Ok(Ticket::build(principal, stored.scopes, stored.properties))
    }
}

#[async_trait]
impl<D, P, I> TokenExchange for GrantDispatcher<D, P, I>
where
    D: UserDirectory,
    P: IdentityProvider<D::User>,
    I: TokenIssuer,
{
    async fn exchange_tokens(
        &self,
        request: &TokenRequest,
        cancel: &CancellationToken,
    ) -> TokenResult<TokenResponse> {
        self.handle(request, cancel).await
    }
}

fn advance(state: &mut ExchangeState, next: ExchangeState) {
    tracing::debug!(from = %state, to = %next, "exchange state");
    *state = next;
}

/// Awaits a collaborator call unless the request is cancelled first.
async fn guarded<T, F>(cancel: &CancellationToken, call: F) -> TokenResult<T>
where
    F: Future<Output = TokenResult<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(TokenError::Cancelled),
        result = call => result,
    }
}

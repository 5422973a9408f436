//! # tg-protocol
//!
//! OAuth 2.0 token endpoint engine.
//!
//! This crate turns token requests into tickets and tickets into tokens:
//! - Grant dispatch for the `password` and `refresh_token` grant types
//! - Claim routing between access and identity tokens
//! - Ticket building with a fixed resource audience
//! - An HS384 JWT token issuer
//! - The `POST /connect/token` Axum handler
//!
//! User storage and credential checks are plugged in through the traits in
//! [`provider`].
//!
//! ## Modules
//!
//! - [`claims`] - Principals, claims and the claim router
//! - [`endpoints`] - Axum handler for the token endpoint
//! - [`error`] - Token endpoint errors following RFC 6749
//! - [`grants`] - Grant dispatcher
//! - [`provider`] - Collaborator traits
//! - [`request`] - Token request form
//! - [`ticket`] - Ticket builder
//! - [`token`] - JWT token issuer and token response
//! - [`types`] - Grant types, destinations, scope and claim names

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod claims;
pub mod endpoints;
pub mod error;
pub mod grants;
pub mod provider;
pub mod request;
pub mod ticket;
pub mod token;
pub mod types;

#[cfg(test)]
mod testing;

pub use claims::{destinations, Claim, Destinations, Principal};
pub use endpoints::{token_router, TokenEndpointState, TOKEN_PATH};
pub use error::{ErrorResponse, InvalidGrantReason, TokenError, TokenResult};
pub use grants::{granted_scopes, ExchangeState, GrantDispatcher, TokenExchange};
pub use provider::{IdentityProvider, SignInResult, TokenIssuer, UserDirectory};
pub use request::TokenRequest;
pub use ticket::{AuthenticatedTicket, Properties, Ticket};
pub use token::{
    AccessTokenClaims, IdTokenClaims, JwtTokenIssuer, RefreshTokenClaims, TokenConfig,
    TokenResponse,
};
pub use types::{Destination, GrantType, TokenType, RESOURCE_AUDIENCE};

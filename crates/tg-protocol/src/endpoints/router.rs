//! Token endpoint router.

use axum::{routing::post, Router};

use super::state::TokenEndpointState;
use super::token::token;
use crate::grants::TokenExchange;

/// Path of the token endpoint.
pub const TOKEN_PATH: &str = "/connect/token";

/// Creates the token endpoint router.
///
/// | Method | Path             | Handler | Description    |
/// |--------|------------------|---------|----------------|
/// | POST   | `/connect/token` | `token` | Token endpoint |
pub fn token_router<T: TokenExchange + 'static>() -> Router<TokenEndpointState<T>> {
    Router::new().route(TOKEN_PATH, post(token::<T>))
}

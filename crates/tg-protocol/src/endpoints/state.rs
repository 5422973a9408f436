//! Shared state for the token endpoint.

use std::sync::Arc;

use crate::grants::TokenExchange;

/// Shared state for the token endpoint.
pub struct TokenEndpointState<T: TokenExchange> {
    /// Runs the token exchange.
    pub exchange: Arc<T>,
}

impl<T: TokenExchange> TokenEndpointState<T> {
    /// Creates a new endpoint state.
    pub fn new(exchange: T) -> Self {
        Self {
            exchange: Arc::new(exchange),
        }
    }

    /// Creates a new endpoint state from an Arc.
    pub const fn from_arc(exchange: Arc<T>) -> Self {
        Self { exchange }
    }
}

// Manual impl: `T` itself need not be `Clone`.
impl<T: TokenExchange> Clone for TokenEndpointState<T> {
    fn clone(&self) -> Self {
        Self {
            exchange: Arc::clone(&self.exchange),
        }
    }
}

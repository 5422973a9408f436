//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use tg_identity::InMemoryIdentityStore;
use tg_protocol::endpoints::TokenEndpointState;
use tg_protocol::grants::GrantDispatcher;
use tg_protocol::token::JwtTokenIssuer;

use crate::config::ServerConfig;
use crate::providers::IdentityProviders;

/// Grant dispatcher wired to the server's providers.
pub type Dispatcher = GrantDispatcher<IdentityProviders, IdentityProviders, JwtTokenIssuer>;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,

    /// Identity providers.
    pub providers: Arc<IdentityProviders>,

    /// Token exchange.
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Creates a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is unusable.
    pub fn new(config: ServerConfig, store: Arc<InMemoryIdentityStore>) -> anyhow::Result<Self> {
        let issuer = JwtTokenIssuer::from_secret(
            config.token_config(),
            config.signing_secret.as_bytes(),
        )?;
        let providers = Arc::new(IdentityProviders::new(store));
        let dispatcher = Arc::new(GrantDispatcher::new(
            Arc::clone(&providers),
            Arc::clone(&providers),
            Arc::new(issuer),
        ));

        Ok(Self {
            config,
            providers,
            dispatcher,
        })
    }

    /// Gets the state for the token endpoint.
    #[must_use]
    pub fn token_state(&self) -> TokenEndpointState<Dispatcher> {
        TokenEndpointState::from_arc(Arc::clone(&self.dispatcher))
    }

    /// Returns the identity providers.
    #[must_use]
    pub fn providers(&self) -> &IdentityProviders {
        &self.providers
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }
}

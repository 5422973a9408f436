//! Token endpoint handler for Axum.
//!
//! ## Router Setup
//!
//! Use [`token_router`] to mount `POST /connect/token`.
//!
//! ```rust,ignore
//! use tg_protocol::endpoints::{token_router, TokenEndpointState};
//!
//! let app = Router::new()
//!     .merge(token_router())
//!     .with_state(TokenEndpointState::new(dispatcher));
//! ```

mod router;
mod state;
mod token;

pub use router::{token_router, TOKEN_PATH};
pub use state::TokenEndpointState;

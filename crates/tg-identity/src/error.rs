//! Identity store error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in the identity store.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No user with this id.
    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    /// The username is already taken.
    #[error("duplicate user: username '{0}' already exists")]
    DuplicateUsername(String),

    /// A seed entry is unusable.
    #[error("invalid user seed: {0}")]
    InvalidSeed(String),

    /// Password hashing or hash parsing failed.
    #[error("password hashing error: {0}")]
    PasswordHash(String),

    /// Reading the seed file failed.
    #[error("failed to read user seed file: {0}")]
    Io(#[from] std::io::Error),

    /// The seed file is not valid JSON.
    #[error("failed to parse user seed file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for identity store operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

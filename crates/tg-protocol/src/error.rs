//! Token endpoint error types.
//!
//! Implements the OAuth 2.0 error responses of RFC 6749 section 5.2 for the
//! subset of failures the token endpoint can produce.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an `invalid_grant` rejection was produced.
///
/// Each reason maps to a fixed, deliberately generic description so callers
/// cannot tell an unknown username from a wrong password or a locked account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidGrantReason {
    /// Unknown user, wrong password, or locked out account.
    InvalidCredentials,
    /// The refresh token does not resolve to an existing user.
    RefreshTokenRevoked,
    /// The user behind a refresh token may no longer sign in.
    SignInNotAllowed,
}

impl InvalidGrantReason {
    /// Returns the human-readable description sent to the client.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "The username/password couple is invalid.",
            Self::RefreshTokenRevoked => "The refresh token is no longer valid.",
            Self::SignInNotAllowed => "The user is no longer allowed to sign in.",
        }
    }
}

/// Token endpoint errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Missing or malformed request parameters.
    #[error("{0}")]
    InvalidRequest(String),

    /// The presented grant (credentials or refresh token) was rejected.
    #[error("{}", .0.description())]
    InvalidGrant(InvalidGrantReason),

    /// The grant type is not handled by this endpoint.
    #[error("the grant type '{0}' is not supported")]
    UnsupportedGrantType(String),

    /// A presented token could not be validated.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// A collaborator failed (storage, identity backend).
    #[error("{0}")]
    ServerError(String),

    /// Token serialization or signing failed.
    #[error("token signing failed: {0}")]
    TokenSigning(String),

    /// The request was aborted before it completed.
    #[error("the request was cancelled")]
    Cancelled,
}

impl TokenError {
    /// Builds the rejection for a failed grant.
    ///
    /// Every `invalid_grant` path goes through here so the error code and
    /// description stay consistent.
    #[must_use]
    pub const fn invalid_grant(reason: InvalidGrantReason) -> Self {
        Self::InvalidGrant(reason)
    }

    /// Returns the OAuth 2.0 error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::InvalidToken(_) => "invalid_token",
            Self::Cancelled => "temporarily_unavailable",
            Self::ServerError(_) | Self::TokenSigning(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) | Self::InvalidGrant(_) | Self::UnsupportedGrantType(_) => 400,
            Self::InvalidToken(_) => 401,
            Self::ServerError(_) | Self::TokenSigning(_) => 500,
            Self::Cancelled => 503,
        }
    }

    /// Returns `true` for failures caused by the caller rather than the server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::InvalidGrant(_)
                | Self::UnsupportedGrantType(_)
                | Self::InvalidToken(_)
        )
    }

    /// Creates an error response for the wire.
    ///
    /// Server-side failures are described generically; their details only go
    /// to the logs.
    #[must_use]
    pub fn to_error_response(&self) -> ErrorResponse {
        let description = if self.is_client_error() {
            self.to_string()
        } else {
            "An internal error occurred while processing the request.".to_string()
        };
        ErrorResponse {
            error: self.error_code().to_string(),
            error_description: Some(description),
            error_uri: None,
        }
    }
}

/// OAuth 2.0 error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// URI with more information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

/// Result type for token endpoint operations.
pub type TokenResult<T> = Result<T, TokenError>;

//! Common token endpoint types and constants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Grant types understood by the token endpoint.
///
/// Unknown values are kept in [`GrantType::Unsupported`] so the dispatcher
/// has to handle them explicitly instead of failing while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GrantType {
    /// Resource owner password credentials grant (RFC 6749 Section 4.3).
    Password,

    /// Refresh token grant (RFC 6749 Section 6).
    RefreshToken,

    /// Any other `grant_type` value.
    Unsupported(String),
}

impl GrantType {
    /// Returns `true` for grant types the dispatcher can handle.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl From<&str> for GrantType {
    fn from(value: &str) -> Self {
        match value {
            "password" => Self::Password,
            "refresh_token" => Self::RefreshToken,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password => write!(f, "password"),
            Self::RefreshToken => write!(f, "refresh_token"),
            Self::Unsupported(value) => write!(f, "{value}"),
        }
    }
}

/// Token compartment a claim may be written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// The access token presented to resource servers.
    AccessToken,
    /// The `OpenID` Connect identity token returned to the client.
    IdentityToken,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessToken => write!(f, "access_token"),
            Self::IdentityToken => write!(f, "id_token"),
        }
    }
}

/// Token type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TokenType {
    /// Bearer token (RFC 6750).
    #[serde(rename = "Bearer")]
    #[default]
    Bearer,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer => write!(f, "Bearer"),
        }
    }
}

/// Audience stamped on every ticket.
pub const RESOURCE_AUDIENCE: &str = "resource_server";

/// Scope names.
pub mod scopes {
    /// `OpenID` Connect scope; requests an identity token.
    pub const OPENID: &str = "openid";
    /// Email scope.
    pub const EMAIL: &str = "email";
    /// Profile scope.
    pub const PROFILE: &str = "profile";
    /// Offline access scope; requests a refresh token.
    pub const OFFLINE_ACCESS: &str = "offline_access";
    /// Roles scope.
    pub const ROLES: &str = "roles";

    /// Scopes a password grant may be given.
    pub const ALLOWED: [&str; 5] = [OPENID, EMAIL, PROFILE, OFFLINE_ACCESS, ROLES];
}

/// Claim type names.
pub mod claims {
    /// Subject identifier.
    pub const SUBJECT: &str = "sub";
    /// Display name.
    pub const NAME: &str = "name";
    /// Email address.
    pub const EMAIL: &str = "email";
    /// Role membership; one claim per role.
    pub const ROLE: &str = "role";
    /// Rotating secret used for local session invalidation.
    pub const SECURITY_STAMP: &str = "security_stamp";
}

//! Token endpoint request type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{TokenError, TokenResult};
use crate::types::GrantType;

/// Token endpoint request, as posted in the form body.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Grant type (required).
    #[serde(default)]
    pub grant_type: String,

    /// Scope (space-separated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Username (for password grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (for password grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Refresh token (for `refresh_token` grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("scope", &self.scope)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl TokenRequest {
    /// Creates a password grant request.
    #[must_use]
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            grant_type: "password".to_string(),
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Creates a refresh token grant request.
    #[must_use]
    pub fn refresh(refresh_token: impl Into<String>) -> Self {
        Self {
            grant_type: "refresh_token".to_string(),
            refresh_token: Some(refresh_token.into()),
            ..Self::default()
        }
    }

    /// Sets the requested scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Parses the grant type.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` if `grant_type` is missing. Unknown values are
    /// not an error here; they come back as [`GrantType::Unsupported`].
    pub fn parsed_grant_type(&self) -> TokenResult<GrantType> {
        let value = self.grant_type.trim();
        if value.is_empty() {
            return Err(TokenError::InvalidRequest(
                "grant_type is required".to_string(),
            ));
        }
        Ok(GrantType::from(value))
    }

    /// Returns the requested scopes as a set.
    #[must_use]
    pub fn scopes(&self) -> BTreeSet<String> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Returns a required, non-empty parameter.
    pub(crate) fn require<'a>(value: Option<&'a str>, name: &str) -> TokenResult<&'a str> {
        value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TokenError::InvalidRequest(format!("{name} is required")))
    }
}

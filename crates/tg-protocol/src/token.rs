//! Token issuance.
//!
//! [`JwtTokenIssuer`] is the reference [`TokenIssuer`]: it signs access,
//! identity and refresh tokens as HS384 JWTs and reads refresh tokens back
//! into the ticket they were issued for.
//!
//! - Access tokens carry every claim routed to [`Destination::AccessToken`].
//! - Identity tokens are only issued when `openid` was granted and carry the
//!   claims routed to [`Destination::IdentityToken`].
//! - Refresh tokens are only issued when `offline_access` was granted.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::claims::{Claim, Principal};
use crate::error::{TokenError, TokenResult};
use crate::provider::TokenIssuer;
use crate::ticket::{AuthenticatedTicket, Properties, Ticket};
use crate::types::{claims, scopes, Destination, TokenType};

/// Minimum length of the HMAC signing secret.
pub const MIN_SECRET_LEN: usize = 32;

/// `typ` value stamped into refresh tokens.
const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Registered JWT claim names that principal claims may not overwrite.
const RESERVED_CLAIMS: [&str; 8] = ["iss", "sub", "aud", "exp", "iat", "nbf", "jti", "scope"];

/// Token configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Issuer URL.
    pub issuer: String,

    /// Access token lifespan in seconds.
    pub access_token_lifespan: i64,

    /// Identity token lifespan in seconds.
    pub identity_token_lifespan: i64,

    /// Refresh token lifespan in seconds.
    pub refresh_token_lifespan: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            access_token_lifespan: 300,        // 5 minutes
            identity_token_lifespan: 300,      // 5 minutes
            refresh_token_lifespan: 1_209_600, // 14 days
        }
    }
}

/// Successful token endpoint response (RFC 6749 section 5.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Token type, always `Bearer`.
    pub token_type: TokenType,

    /// Access token lifetime in seconds.
    pub expires_in: i64,

    /// Refresh token, when `offline_access` was granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Identity token, when `openid` was granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Granted scopes (space-separated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer.
    pub iss: String,
    /// Subject.
    pub sub: String,
    /// Audience.
    pub aud: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at time (Unix timestamp).
    pub iat: i64,
    /// JWT ID.
    pub jti: String,
    /// Granted scopes (space-separated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Principal claims routed to the access token.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

/// Identity token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer.
    pub iss: String,
    /// Subject.
    pub sub: String,
    /// Audience.
    pub aud: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at time (Unix timestamp).
    pub iat: i64,
    /// Principal claims routed to the identity token.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

/// Refresh token claims.
///
/// Carries enough of the original ticket to rebuild it on the next refresh
/// grant. Secrets are stripped before the principal is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Issuer.
    pub iss: String,
    /// Subject.
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at time (Unix timestamp).
    pub iat: i64,
    /// JWT ID.
    pub jti: String,
    /// Token type marker.
    pub typ: String,
    /// Scopes granted by the original grant.
    pub scopes: BTreeSet<String>,
    /// Principal claims at issuance.
    pub claims: Vec<Claim>,
    /// Ticket properties.
    #[serde(default)]
    pub properties: Properties,
}

/// Reference token issuer signing HS384 JWTs.
pub struct JwtTokenIssuer {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenIssuer")
            .field("config", &self.config)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl JwtTokenIssuer {
    /// Creates an issuer signing with a shared secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is shorter than [`MIN_SECRET_LEN`].
    pub fn from_secret(config: TokenConfig, secret: &[u8]) -> TokenResult<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::TokenSigning(format!(
                "signing secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        Ok(Self {
            config,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Returns the token configuration.
    #[must_use]
    pub const fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Creates the token response for a ticket.
    ///
    /// # Errors
    ///
    /// Returns an error if the ticket has no subject or signing fails.
    pub fn create_token_response(&self, ticket: &Ticket) -> TokenResult<TokenResponse> {
        let subject = ticket
            .subject()
            .ok_or_else(|| TokenError::ServerError("principal has no subject claim".to_string()))?
            .to_string();
        let now = Utc::now();
        let scope = (!ticket.scopes().is_empty())
            .then(|| ticket.scopes().iter().cloned().collect::<Vec<_>>().join(" "));

        let access_claims = AccessTokenClaims {
            iss: self.config.issuer.clone(),
            sub: subject.clone(),
            aud: ticket.audience().to_string(),
            exp: (now + Duration::seconds(self.config.access_token_lifespan)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            scope: scope.clone(),
            additional: claim_map(ticket.claims_for(Destination::AccessToken)),
        };
        let access_token = self.sign(&access_claims)?;

        let id_token = if ticket.has_scope(scopes::OPENID) {
            let id_claims = IdTokenClaims {
                iss: self.config.issuer.clone(),
                sub: subject.clone(),
                aud: ticket.audience().to_string(),
                exp: (now + Duration::seconds(self.config.identity_token_lifespan)).timestamp(),
                iat: now.timestamp(),
                additional: claim_map(ticket.claims_for(Destination::IdentityToken)),
            };
            Some(self.sign(&id_claims)?)
        } else {
            None
        };

        let refresh_token = if ticket.has_scope(scopes::OFFLINE_ACCESS) {
            let stored = ticket.to_authenticated();
            let refresh_claims = RefreshTokenClaims {
                iss: self.config.issuer.clone(),
                sub: subject,
                exp: (now + Duration::seconds(self.config.refresh_token_lifespan)).timestamp(),
                iat: now.timestamp(),
                jti: Uuid::now_v7().to_string(),
                typ: REFRESH_TOKEN_TYPE.to_string(),
                scopes: stored.scopes,
                claims: stored.principal.claims().to_vec(),
                properties: stored.properties,
            };
            Some(self.sign(&refresh_claims)?)
        } else {
            None
        };

        Ok(TokenResponse {
            access_token,
            token_type: TokenType::Bearer,
            expires_in: self.config.access_token_lifespan,
            refresh_token,
            id_token,
            scope,
        })
    }

    /// Validates and decodes an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or expired.
    pub fn validate_access_token(&self, token: &str) -> TokenResult<AccessTokenClaims> {
        self.validate(token, Some(crate::types::RESOURCE_AUDIENCE))
    }

    /// Validates and decodes an identity token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or expired.
    pub fn validate_id_token(&self, token: &str) -> TokenResult<IdTokenClaims> {
        self.validate(token, Some(crate::types::RESOURCE_AUDIENCE))
    }

    /// Validates and decodes a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or not a refresh
    /// token.
    pub fn validate_refresh_token(&self, token: &str) -> TokenResult<RefreshTokenClaims> {
        let claims: RefreshTokenClaims = self.validate(token, None)?;
        if claims.typ != REFRESH_TOKEN_TYPE {
            return Err(TokenError::InvalidToken("not a refresh token".to_string()));
        }
        Ok(claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> TokenResult<String> {
        let mut header = Header::new(Algorithm::HS384);
        header.typ = Some("JWT".to_string());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| TokenError::TokenSigning(e.to_string()))
    }

    fn validate<T: DeserializeOwned>(&self, token: &str, audience: Option<&str>) -> TokenResult<T> {
        let mut validation = Validation::new(Algorithm::HS384);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::InvalidToken(e.to_string()))
    }
}

#[async_trait]
impl TokenIssuer for JwtTokenIssuer {
    async fn authenticate_incoming(
        &self,
        refresh_token: &str,
        _cancel: &CancellationToken,
    ) -> TokenResult<Option<AuthenticatedTicket>> {
        match self.validate_refresh_token(refresh_token) {
            Ok(claims) => Ok(Some(AuthenticatedTicket {
                principal: Principal::new(claims.claims),
                scopes: claims.scopes,
                properties: claims.properties,
            })),
            Err(err) => {
                tracing::debug!(error = %err, "refresh token rejected");
                Ok(None)
            }
        }
    }

    async fn issue(&self, ticket: &Ticket, _cancel: &CancellationToken) -> TokenResult<TokenResponse> {
        self.create_token_response(ticket)
    }
}

/// Folds claims into a JWT claim map.
///
/// Repeated claim types become arrays; `role` is always an array.
fn claim_map<'a>(routed: impl Iterator<Item = &'a Claim>) -> Map<String, Value> {
    let mut map = Map::new();
    for claim in routed {
        if RESERVED_CLAIMS.contains(&claim.claim_type.as_str()) {
            continue;
        }
        let value = Value::String(claim.value.clone());
        match map.get_mut(&claim.claim_type) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None if claim.claim_type == claims::ROLE => {
                map.insert(claim.claim_type.clone(), Value::Array(vec![value]));
            }
            None => {
                map.insert(claim.claim_type.clone(), value);
            }
        }
    }
    map
}

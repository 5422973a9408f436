//! Principals, claims and claim routing.
//!
//! The claim router decides which tokens a claim may be written to. Access
//! tokens carry every claim except the security stamp. Identity tokens only
//! carry profile data whose scope was granted:
//!
//! | claim type       | access token | identity token             |
//! |------------------|--------------|----------------------------|
//! | `name`           | always       | `profile` scope granted    |
//! | `email`          | always       | `email` scope granted      |
//! | `role`           | always       | `roles` scope granted      |
//! | `security_stamp` | never        | never                      |
//! | anything else    | always       | never                      |

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{claims, scopes, Destination};

/// Set of token compartments a claim is routed to.
pub type Destinations = BTreeSet<Destination>;

/// A single claim about the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim type, e.g. `email`.
    #[serde(rename = "type")]
    pub claim_type: String,

    /// Claim value.
    pub value: String,
}

impl Claim {
    /// Creates a new claim.
    #[must_use]
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// An authenticated subject and its claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    claims: Vec<Claim>,
}

impl Principal {
    /// Creates a principal from a list of claims.
    #[must_use]
    pub const fn new(claims: Vec<Claim>) -> Self {
        Self { claims }
    }

    /// Adds a claim.
    #[must_use]
    pub fn with_claim(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.push(Claim::new(claim_type, value));
        self
    }

    /// Returns all claims in insertion order.
    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Returns the value of the first claim of the given type.
    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Returns the subject identifier (`sub` claim).
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.find_first(claims::SUBJECT)
    }

    /// Returns the principal without claims that must never leave the server.
    #[must_use]
    pub fn without_secrets(&self) -> Self {
        Self {
            claims: self
                .claims
                .iter()
                .filter(|c| c.claim_type != claims::SECURITY_STAMP)
                .cloned()
                .collect(),
        }
    }
}

/// Computes the tokens a claim may be written to.
///
/// Pure function of its inputs: the same claim and scopes always produce the
/// same set.
#[must_use]
pub fn destinations(claim: &Claim, granted_scopes: &BTreeSet<String>) -> Destinations {
    let identity_scope = match claim.claim_type.as_str() {
        claims::SECURITY_STAMP => return Destinations::new(),
        claims::NAME => Some(scopes::PROFILE),
        claims::EMAIL => Some(scopes::EMAIL),
        claims::ROLE => Some(scopes::ROLES),
        _ => None,
    };

    let mut routed = Destinations::from([Destination::AccessToken]);
    if identity_scope.is_some_and(|scope| granted_scopes.contains(scope)) {
        routed.insert(Destination::IdentityToken);
    }
    routed
}

//! Authentication tickets.
//!
//! A [`Ticket`] bundles everything the token issuer needs for one response:
//! the principal, the granted scopes, opaque properties carried over between
//! grants, the audience, and the destinations of every claim.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::claims::{destinations, Claim, Destinations, Principal};
use crate::types::{Destination, RESOURCE_AUDIENCE};

/// Opaque ticket properties, preserved across refresh grants.
pub type Properties = BTreeMap<String, String>;

/// A previously issued ticket, recovered from a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedTicket {
    /// Principal as it was when the refresh token was issued.
    pub principal: Principal,

    /// Scopes granted by the original grant.
    pub scopes: BTreeSet<String>,

    /// Properties of the original ticket.
    #[serde(default)]
    pub properties: Properties,
}

/// Ticket handed to the token issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    principal: Principal,
    scopes: BTreeSet<String>,
    properties: Properties,
    audience: &'static str,
    destinations: Vec<Destinations>,
}

impl Ticket {
    /// Builds a ticket.
    ///
    /// Claim destinations are computed against `scopes`, the scopes of this
    /// ticket, never the raw scopes of the current request.
    #[must_use]
    pub fn build(principal: Principal, scopes: BTreeSet<String>, properties: Properties) -> Self {
        let destinations = principal
            .claims()
            .iter()
            .map(|claim| destinations(claim, &scopes))
            .collect();

        Self {
            principal,
            scopes,
            properties,
            audience: RESOURCE_AUDIENCE,
            destinations,
        }
    }

    /// Returns the principal.
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the granted scopes.
    #[must_use]
    pub const fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    /// Returns `true` if `scope` was granted.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Returns the ticket properties.
    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Returns the resource audience.
    #[must_use]
    pub const fn audience(&self) -> &'static str {
        self.audience
    }

    /// Returns the subject identifier.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.principal.subject()
    }

    /// Returns every claim with its destinations.
    pub fn routed_claims(&self) -> impl Iterator<Item = (&Claim, &Destinations)> {
        self.principal.claims().iter().zip(self.destinations.iter())
    }

    /// Returns the claims routed to `destination`.
    pub fn claims_for(&self, destination: Destination) -> impl Iterator<Item = &Claim> {
        self.routed_claims()
            .filter(move |(_, routed)| routed.contains(&destination))
            .map(|(claim, _)| claim)
    }

    /// Returns the ticket in the form stored inside a refresh token.
    #[must_use]
    pub fn to_authenticated(&self) -> AuthenticatedTicket {
        AuthenticatedTicket {
            principal: self.principal.without_secrets(),
            scopes: self.scopes.clone(),
            properties: self.properties.clone(),
        }
    }
}

//! User model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lockout::LockoutState;

/// A user known to the identity store.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique identifier, used as the token subject.
    pub id: Uuid,
    /// Unique username, stored lowercase.
    pub username: String,
    /// Argon2id hash in PHC format.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Email address.
    pub email: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// Role names.
    pub roles: Vec<String>,
    /// Rotated whenever credentials change.
    #[serde(skip_serializing)]
    pub security_stamp: String,
    /// Whether the account is enabled.
    pub enabled: bool,
    /// Failed sign-in tracking.
    pub lockout: LockoutState,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates an enabled user with no profile data.
    #[must_use]
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: normalize_username(&username.into()),
            password_hash: password_hash.into(),
            email: None,
            display_name: None,
            roles: Vec::new(),
            security_stamp: new_security_stamp(),
            enabled: true,
            lockout: LockoutState::default(),
            created_at: Utc::now(),
        }
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Name shown in tokens: display name, else username.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    /// Returns `true` while a lockout is in effect.
    #[must_use]
    pub fn is_locked_out(&self) -> bool {
        self.lockout.is_locked_out(Utc::now())
    }
}

/// A user entry in a seed file. Passwords are hashed on load.
#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    /// Username.
    pub username: String,
    /// Plaintext password.
    pub password: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Role names.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Whether the account is enabled.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl UserSeed {
    /// Creates a seed with just credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: None,
            display_name: None,
            roles: Vec::new(),
            enabled: true,
        }
    }
}

const fn enabled_by_default() -> bool {
    true
}

/// Lowercases and trims a username.
#[must_use]
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub(crate) fn new_security_stamp() -> String {
    Uuid::new_v4().simple().to_string()
}

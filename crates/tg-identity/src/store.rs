//! In-memory identity store.
//!
//! Holds users, verifies passwords and applies the lockout policy. Password
//! verification runs outside the lock; only the counter update takes the
//! write lock.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::error::{IdentityError, IdentityResult};
use crate::lockout::LockoutPolicy;
use crate::password::PasswordHasherService;
use crate::user::{new_security_stamp, normalize_username, User, UserSeed};

/// Outcome of [`InMemoryIdentityStore::check_password`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    /// The password matched.
    Success,
    /// The password did not match.
    Failed,
    /// The account is locked out, either already or by this attempt.
    LockedOut,
    /// The account is disabled.
    Disabled,
}

#[derive(Debug, Default)]
struct Users {
    by_id: HashMap<Uuid, User>,
    by_name: HashMap<String, Uuid>,
}

/// Thread-safe in-memory user store.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    hasher: PasswordHasherService,
    lockout: LockoutPolicy,
    users: RwLock<Users>,
    dummy_hash: OnceLock<String>,
}

const UNKNOWN_USER_PASSWORD: &str = "unknown-user";

impl InMemoryIdentityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(hasher: PasswordHasherService, lockout: LockoutPolicy) -> Self {
        Self {
            hasher,
            lockout,
            users: RwLock::default(),
            dummy_hash: OnceLock::new(),
        }
    }

    /// Creates a store from a JSON array of [`UserSeed`] entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an entry is
    /// invalid or duplicated.
    pub fn from_seed_file(
        path: impl AsRef<Path>,
        hasher: PasswordHasherService,
        lockout: LockoutPolicy,
    ) -> IdentityResult<Self> {
        let path = path.as_ref();
        let seeds: Vec<UserSeed> = serde_json::from_slice(&std::fs::read(path)?)?;

        let store = Self::new(hasher, lockout);
        for seed in seeds {
            store.add_user(seed)?;
        }

        tracing::info!(path = %path.display(), users = store.len(), "loaded user seed file");
        Ok(store)
    }

    /// Returns the lockout policy.
    #[must_use]
    pub const fn lockout_policy(&self) -> &LockoutPolicy {
        &self.lockout
    }

    /// Adds a user, hashing its password.
    ///
    /// # Errors
    ///
    /// Returns an error if the username is empty or taken, or hashing fails.
    pub fn add_user(&self, seed: UserSeed) -> IdentityResult<User> {
        let username = normalize_username(&seed.username);
        if username.is_empty() {
            return Err(IdentityError::InvalidSeed("username is empty".to_string()));
        }
        if self.users.read().by_name.contains_key(&username) {
            return Err(IdentityError::DuplicateUsername(username));
        }

        let mut user = User::new(username, self.hasher.hash(&seed.password)?);
        user.email = seed.email;
        user.display_name = seed.display_name;
        user.roles = seed.roles;
        user.enabled = seed.enabled;

        self.insert(user)
    }

    /// Inserts a fully built user.
    ///
    /// # Errors
    ///
    /// Returns an error if the username is taken.
    pub fn insert(&self, user: User) -> IdentityResult<User> {
        let mut users = self.users.write();
        if users.by_name.contains_key(&user.username) {
            return Err(IdentityError::DuplicateUsername(user.username));
        }
        users.by_name.insert(user.username.clone(), user.id);
        users.by_id.insert(user.id, user.clone());

        tracing::debug!(user_id = %user.id, "user added");
        Ok(user)
    }

    /// Removes a user.
    pub fn remove_user(&self, id: Uuid) -> Option<User> {
        let mut users = self.users.write();
        let user = users.by_id.remove(&id)?;
        users.by_name.remove(&user.username);
        Some(user)
    }

    /// Finds a user by username, case-insensitively.
    #[must_use]
    pub fn find_by_username(&self, username: &str) -> Option<User> {
        let users = self.users.read();
        users
            .by_name
            .get(&normalize_username(username))
            .and_then(|id| users.by_id.get(id))
            .cloned()
    }

    /// Gets a user by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.read().by_id.get(&id).cloned()
    }

    /// Returns the number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().by_id.len()
    }

    /// Returns `true` if the store holds no users.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verifies a password.
    ///
    /// A locked out or disabled account fails without verifying. With
    /// `lockout_on_failure`, a mismatch counts towards the lockout policy; a
    /// match always clears the counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or its hash is unreadable.
    pub fn check_password(
        &self,
        id: Uuid,
        password: &str,
        lockout_on_failure: bool,
    ) -> IdentityResult<PasswordCheck> {
        let user = self.get(id).ok_or(IdentityError::UserNotFound(id))?;
        if !user.enabled {
            return Ok(PasswordCheck::Disabled);
        }
        if user.is_locked_out() {
            return Ok(PasswordCheck::LockedOut);
        }

        let verified = self.hasher.verify(password, &user.password_hash)?;
        self.record_attempt(id, verified, lockout_on_failure)
    }

    /// Applies a verification result to the user's lockout state.
    ///
    /// Another attempt may have locked the account while the hash was being
    /// verified, so the lockout is checked again under the write lock.
    fn record_attempt(
        &self,
        id: Uuid,
        verified: bool,
        lockout_on_failure: bool,
    ) -> IdentityResult<PasswordCheck> {
        let now = Utc::now();
        let mut users = self.users.write();
        let Some(stored) = users.by_id.get_mut(&id) else {
            return Err(IdentityError::UserNotFound(id));
        };

        if stored.lockout.is_locked_out(now) {
            return Ok(PasswordCheck::LockedOut);
        }

        if verified {
            stored.lockout.reset();
            return Ok(PasswordCheck::Success);
        }

        if lockout_on_failure && stored.lockout.register_failure(&self.lockout, now) {
            tracing::info!(user_id = %id, "account locked out after repeated failures");
            return Ok(PasswordCheck::LockedOut);
        }
        Ok(PasswordCheck::Failed)
    }

    /// Runs one password verification against a throwaway hash.
    ///
    /// Lookups of unknown usernames call this so they cost as much as a
    /// failed password check. Returns `false` if no verification ran.
    pub fn verify_unknown_user(&self) -> bool {
        let hash = if let Some(hash) = self.dummy_hash.get() {
            hash
        } else {
            match self.hasher.hash(&new_security_stamp()) {
                Ok(hash) => self.dummy_hash.get_or_init(|| hash),
                Err(err) => {
                    tracing::warn!(error = %err, "could not create placeholder password hash");
                    return false;
                }
            }
        };
        self.hasher.verify(UNKNOWN_USER_PASSWORD, hash).is_ok()
    }

    /// Returns `true` if the user exists, is enabled and is not locked out.
    #[must_use]
    pub fn can_sign_in(&self, id: Uuid) -> bool {
        self.get(id)
            .is_some_and(|user| user.enabled && !user.is_locked_out())
    }

    /// Enables or disables a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist.
    pub fn set_enabled(&self, id: Uuid, enabled: bool) -> IdentityResult<()> {
        self.update(id, |user| user.enabled = enabled)
    }

    /// Replaces a user's roles.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist.
    pub fn set_roles(&self, id: Uuid, roles: Vec<String>) -> IdentityResult<()> {
        self.update(id, |user| user.roles = roles)
    }

    /// Changes a user's password and rotates the security stamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or hashing fails.
    pub fn set_password(&self, id: Uuid, password: &str) -> IdentityResult<()> {
        let hash = self.hasher.hash(password)?;
        self.update(id, |user| {
            user.password_hash = hash;
            user.security_stamp = new_security_stamp();
            user.lockout.reset();
        })
    }

    fn update(&self, id: Uuid, change: impl FnOnce(&mut User)) -> IdentityResult<()> {
        let mut users = self.users.write();
        let user = users
            .by_id
            .get_mut(&id)
            .ok_or(IdentityError::UserNotFound(id))?;
        change(user);
        Ok(())
    }
}

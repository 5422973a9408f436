//! # tg-identity
//!
//! In-memory user store for tokengate.
//!
//! - Argon2id password hashing
//! - Lockout after repeated failed sign-ins
//! - User seeding from a JSON file
//!
//! ## Modules
//!
//! - [`error`] - Identity store errors
//! - [`lockout`] - Lockout policy and per-user failure tracking
//! - [`password`] - Argon2id password hashing
//! - [`store`] - The in-memory store
//! - [`user`] - User model and seed entries

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod lockout;
pub mod password;
pub mod store;
pub mod user;

pub use error::{IdentityError, IdentityResult};
pub use lockout::{LockoutPolicy, LockoutState};
pub use password::{PasswordHasherService, PasswordPolicy};
pub use store::{InMemoryIdentityStore, PasswordCheck};
pub use user::{normalize_username, User, UserSeed};

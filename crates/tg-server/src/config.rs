//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.
//! A `.env` file in the working directory is read first if present.

use std::fmt;
use std::path::PathBuf;

use chrono::Duration;
use tg_identity::LockoutPolicy;
use tg_protocol::token::{TokenConfig, MIN_SECRET_LEN};

/// Upper bound for lifespans and the lockout duration (one year).
pub const MAX_DURATION_SECS: i64 = 365 * 24 * 60 * 60;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Issuer URL stamped into every token.
    pub issuer: String,

    /// HMAC secret used to sign tokens.
    pub signing_secret: String,

    /// Access token lifespan in seconds.
    pub access_token_lifespan: i64,

    /// Identity token lifespan in seconds.
    pub identity_token_lifespan: i64,

    /// Refresh token lifespan in seconds.
    pub refresh_token_lifespan: i64,

    /// Failed sign-ins before an account is locked. Zero disables lockout.
    pub lockout_max_failures: u32,

    /// Lockout duration in seconds.
    pub lockout_duration: i64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// JSON file with users to load at startup.
    pub users_file: Option<PathBuf>,

    /// Log filter.
    pub log_level: String,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        fn parsed<T: std::str::FromStr>(
            var: &impl Fn(&str) -> Option<String>,
            key: &str,
            default: T,
        ) -> anyhow::Result<T> {
            match var(key) {
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("{key} has an invalid value: '{value}'")),
                None => Ok(default),
            }
        }

        fn seconds(
            var: &impl Fn(&str) -> Option<String>,
            key: &str,
            default: i64,
        ) -> anyhow::Result<i64> {
            let value: i64 = parsed(var, key, default)?;
            if !(1..=MAX_DURATION_SECS).contains(&value) {
                anyhow::bail!("{key} must be between 1 and {MAX_DURATION_SECS} seconds, got {value}");
            }
            Ok(value)
        }

        let host = var("TG_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parsed(&var, "TG_PORT", 8080)?;

        let issuer = var("TG_ISSUER").unwrap_or_else(|| format!("http://{host}:{port}"));

        let signing_secret = var("TG_SIGNING_SECRET")
            .ok_or_else(|| anyhow::anyhow!("TG_SIGNING_SECRET environment variable is required"))?;
        if signing_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("TG_SIGNING_SECRET must be at least {MIN_SECRET_LEN} bytes");
        }

        let access_token_lifespan = seconds(&var, "TG_ACCESS_TOKEN_LIFESPAN", 300)?; // 5 minutes
        let identity_token_lifespan = seconds(&var, "TG_IDENTITY_TOKEN_LIFESPAN", 300)?; // 5 minutes
        let refresh_token_lifespan = seconds(&var, "TG_REFRESH_TOKEN_LIFESPAN", 1_209_600)?; // 14 days

        let lockout_max_failures: u32 = parsed(&var, "TG_LOCKOUT_MAX_FAILURES", 5)?;
        let lockout_duration = seconds(&var, "TG_LOCKOUT_DURATION", 300)?; // 5 minutes

        let cors_origins = var("TG_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_else(|| vec!["*".to_string()]);

        let users_file = var("TG_USERS_FILE")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let log_level = var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            host,
            port,
            issuer,
            signing_secret,
            access_token_lifespan,
            identity_token_lifespan,
            refresh_token_lifespan,
            lockout_max_failures,
            lockout_duration,
            cors_origins,
            users_file,
            log_level,
        })
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            issuer: "http://localhost:8080".to_string(),
            signing_secret: "tokengate-test-signing-secret-0123456789".to_string(),
            log_level: "debug".to_string(),
            ..Self::default()
        }
    }

    /// Returns the token issuer configuration.
    #[must_use]
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            issuer: self.issuer.clone(),
            access_token_lifespan: self.access_token_lifespan,
            identity_token_lifespan: self.identity_token_lifespan,
            refresh_token_lifespan: self.refresh_token_lifespan,
        }
    }

    /// Returns the account lockout policy.
    #[must_use]
    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy::new(
            self.lockout_max_failures,
            Duration::seconds(self.lockout_duration),
        )
    }

    /// Returns the socket address to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("issuer", &self.issuer)
            .field("signing_secret", &"[REDACTED]")
            .field("access_token_lifespan", &self.access_token_lifespan)
            .field("identity_token_lifespan", &self.identity_token_lifespan)
            .field("refresh_token_lifespan", &self.refresh_token_lifespan)
            .field("lockout_max_failures", &self.lockout_max_failures)
            .field("lockout_duration", &self.lockout_duration)
            .field("cors_origins", &self.cors_origins)
            .field("users_file", &self.users_file)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            issuer: "http://localhost:8080".to_string(),
            signing_secret: String::new(),
            access_token_lifespan: 300,
            identity_token_lifespan: 300,
            refresh_token_lifespan: 1_209_600,
            lockout_max_failures: 5,
            lockout_duration: 300,
            cors_origins: vec!["*".to_string()],
            users_file: None,
            log_level: "info".to_string(),
        }
    }
}

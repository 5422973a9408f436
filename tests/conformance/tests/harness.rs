//! Test harness for token endpoint conformance testing.
//!
//! Starts a tokengate server with an in-memory user store on a random port.

use std::sync::{Arc, Once};
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

use tg_identity::{
    InMemoryIdentityStore, LockoutPolicy, PasswordHasherService, PasswordPolicy, UserSeed,
};
use tg_server::{Server, ServerConfig};

/// Standard test user.
pub const TEST_USERNAME: &str = "testuser";
pub const TEST_PASSWORD: &str = "testpassword";
pub const TEST_EMAIL: &str = "testuser@example.com";
pub const TEST_DISPLAY_NAME: &str = "Test User";

/// Failed attempts before lockout in the test server.
pub const TEST_LOCKOUT_MAX_FAILURES: u32 = 3;

/// Token response from the token endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub scope: Option<String>,
}

/// Error response from the token endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

/// Test harness that manages a running server instance.
pub struct TestHarness {
    /// Base URL of the running server.
    pub base_url: String,
    /// HTTP client configured for testing.
    pub client: Client,
    /// The server's user store.
    pub store: Arc<InMemoryIdentityStore>,
    server: JoinHandle<()>,
}

impl TestHarness {
    /// Creates a new test harness with a running server and one test user.
    pub async fn new() -> anyhow::Result<Self> {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let base_url = format!("http://127.0.0.1:{port}");

        let mut config = ServerConfig::for_testing();
        config.port = port;
        config.issuer = base_url.clone();
        config.lockout_max_failures = TEST_LOCKOUT_MAX_FAILURES;

        let store = Arc::new(InMemoryIdentityStore::new(
            PasswordHasherService::new(PasswordPolicy::new().memory_cost(1024).time_cost(1)),
            LockoutPolicy::new(TEST_LOCKOUT_MAX_FAILURES, chrono::Duration::minutes(5)),
        ));
        let mut seed = UserSeed::new(TEST_USERNAME, TEST_PASSWORD);
        seed.email = Some(TEST_EMAIL.to_string());
        seed.display_name = Some(TEST_DISPLAY_NAME.to_string());
        seed.roles = vec!["user".to_string()];
        store.add_user(seed)?;

        let server = Server::with_identity_store(config, Arc::clone(&store));
        let server = tokio::spawn(async move {
            if let Err(e) = server.serve(listener).await {
                tracing::error!("Server error: {}", e);
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        wait_for_server(&client, &base_url).await?;

        Ok(Self {
            base_url,
            client,
            store,
            server,
        })
    }

    /// Returns the token endpoint URL.
    pub fn token_url(&self) -> String {
        format!("{}/connect/token", self.base_url)
    }

    /// Posts a form to the token endpoint.
    pub async fn token_request(&self, form: &[(&str, &str)]) -> anyhow::Result<Response> {
        Ok(self
            .client
            .post(self.token_url())
            .form(form)
            .send()
            .await?)
    }

    /// Runs a password grant for the test user.
    pub async fn password_grant(&self, scope: &str) -> anyhow::Result<TokenResponse> {
        let response = self
            .token_request(&[
                ("grant_type", "password"),
                ("username", TEST_USERNAME),
                ("password", TEST_PASSWORD),
                ("scope", scope),
            ])
            .await?;
        anyhow::ensure!(
            response.status().is_success(),
            "password grant failed with {}",
            response.status()
        );
        Ok(response.json().await?)
    }

    /// Returns the id of the test user.
    pub fn test_user_id(&self) -> anyhow::Result<Uuid> {
        self.store
            .find_by_username(TEST_USERNAME)
            .map(|user| user.id)
            .ok_or_else(|| anyhow::anyhow!("test user missing"))
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Decodes the payload of a JWT without verifying it.
pub fn jwt_payload(token: &str) -> anyhow::Result<serde_json::Value> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("not a JWT"))?;
    Ok(serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload)?)?)
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Waits for the server to be ready.
async fn wait_for_server(client: &Client, base_url: &str) -> anyhow::Result<()> {
    let health_url = format!("{base_url}/health");
    let max_attempts = 30;

    for attempt in 1..=max_attempts {
        match client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Server ready after {} attempts", attempt);
                return Ok(());
            }
            Ok(response) => {
                tracing::debug!(
                    "Server not ready (status {}), attempt {}/{}",
                    response.status(),
                    attempt,
                    max_attempts
                );
            }
            Err(e) => {
                tracing::debug!(
                    "Server not ready ({}), attempt {}/{}",
                    e,
                    attempt,
                    max_attempts
                );
            }
        }
        sleep(Duration::from_millis(100)).await;
    }

    anyhow::bail!("Server did not become ready in time")
}

//! Token Endpoint Conformance Tests
//!
//! Password grant, error responses and token contents.
//!
//! Reference: RFC 6749 sections 4.3 and 5

use crate::harness::{
    jwt_payload, ErrorResponse, TestHarness, TEST_DISPLAY_NAME, TEST_EMAIL, TEST_PASSWORD,
    TEST_USERNAME,
};

/// token-endpoint-1: Password grant returns a bearer access token.
#[tokio::test]
async fn test_password_grant_valid_credentials() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;

    let response = harness
        .token_request(&[
            ("grant_type", "password"),
            ("username", TEST_USERNAME),
            ("password", TEST_PASSWORD),
        ])
        .await?;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("no-store")
    );

    let token: crate::harness::TokenResponse = response.json().await?;
    assert!(!token.access_token.is_empty());
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.expires_in, Some(300));
    assert!(token.id_token.is_none(), "no openid scope, no id_token");
    assert!(token.refresh_token.is_none(), "no offline_access, no refresh_token");

    Ok(())
}

/// token-endpoint-2: Requested scopes are intersected with the allowed set.
#[tokio::test]
async fn test_password_grant_drops_unknown_scopes() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;

    let token = harness.password_grant("openid custom_scope").await?;
    assert_eq!(token.scope.as_deref(), Some("openid"));
    assert!(token.id_token.is_some(), "openid scope should return id_token");

    Ok(())
}

/// token-endpoint-3: Unknown user and wrong password are indistinguishable.
#[tokio::test]
async fn test_invalid_credentials_do_not_enumerate_users() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;

    let unknown = harness
        .token_request(&[
            ("grant_type", "password"),
            ("username", "nobody"),
            ("password", TEST_PASSWORD),
        ])
        .await?;
    assert_eq!(unknown.status(), 400);
    let unknown: ErrorResponse = unknown.json().await?;

    let wrong = harness
        .token_request(&[
            ("grant_type", "password"),
            ("username", TEST_USERNAME),
            ("password", "wrong-password"),
        ])
        .await?;
    assert_eq!(wrong.status(), 400);
    let wrong: ErrorResponse = wrong.json().await?;

    assert_eq!(unknown.error, "invalid_grant");
    assert_eq!(unknown.error, wrong.error);
    assert_eq!(unknown.error_description, wrong.error_description);
    assert_eq!(
        unknown.error_description.as_deref(),
        Some("The username/password couple is invalid.")
    );

    Ok(())
}

/// token-endpoint-4: Unsupported grant types get a structured error.
#[tokio::test]
async fn test_unsupported_grant_type() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;

    let response = harness
        .token_request(&[("grant_type", "client_credentials")])
        .await?;

    assert_eq!(response.status(), 400);
    let error: ErrorResponse = response.json().await?;
    assert_eq!(error.error, "unsupported_grant_type");

    Ok(())
}

/// token-endpoint-5: Missing parameters are invalid requests.
#[tokio::test]
async fn test_missing_parameters() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;

    let response = harness
        .token_request(&[("grant_type", "password"), ("username", TEST_USERNAME)])
        .await?;
    assert_eq!(response.status(), 400);
    let error: ErrorResponse = response.json().await?;
    assert_eq!(error.error, "invalid_request");
    assert_eq!(error.error_description.as_deref(), Some("password is required"));

    let response = harness.token_request(&[("username", TEST_USERNAME)]).await?;
    assert_eq!(response.status(), 400);
    let error: ErrorResponse = response.json().await?;
    assert_eq!(error.error, "invalid_request");

    Ok(())
}

/// token-endpoint-6: Identity token claims follow the granted scopes.
#[tokio::test]
async fn test_id_token_claims_follow_scopes() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    let user_id = harness.test_user_id()?.to_string();

    let token = harness.password_grant("openid email").await?;
    let id_token = jwt_payload(token.id_token.as_deref().unwrap_or_default())?;
    assert_eq!(id_token["sub"], user_id.as_str());
    assert_eq!(id_token["aud"], "resource_server");
    assert_eq!(id_token["iss"], harness.base_url.as_str());
    assert_eq!(id_token["email"], TEST_EMAIL);
    assert!(id_token.get("name").is_none(), "profile scope not granted");
    assert!(id_token.get("role").is_none(), "roles scope not granted");

    let token = harness.password_grant("openid profile roles").await?;
    let id_token = jwt_payload(token.id_token.as_deref().unwrap_or_default())?;
    assert_eq!(id_token["name"], TEST_DISPLAY_NAME);
    assert_eq!(id_token["role"], serde_json::json!(["user"]));
    assert!(id_token.get("email").is_none(), "email scope not granted");

    Ok(())
}

/// token-endpoint-7: Access tokens carry every claim except the security stamp.
#[tokio::test]
async fn test_access_token_claims() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;

    let token = harness.password_grant("").await?;
    let access = jwt_payload(&token.access_token)?;

    assert_eq!(access["aud"], "resource_server");
    assert_eq!(access["name"], TEST_DISPLAY_NAME);
    assert_eq!(access["email"], TEST_EMAIL);
    assert_eq!(access["role"], serde_json::json!(["user"]));
    assert!(access.get("security_stamp").is_none());
    assert!(access.get("jti").is_some());

    Ok(())
}

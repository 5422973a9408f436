//! Refresh Token Grant Conformance Tests
//!
//! Reference: RFC 6749 section 6

use crate::harness::{jwt_payload, ErrorResponse, TestHarness, TokenResponse};

async fn refresh(harness: &TestHarness, refresh_token: &str, scope: Option<&str>) -> anyhow::Result<reqwest::Response> {
    let mut form = vec![("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
    if let Some(scope) = scope {
        form.push(("scope", scope));
    }
    harness.token_request(&form).await
}

/// refresh-1: offline_access yields a refresh token that can be redeemed.
#[tokio::test]
async fn test_refresh_token_grant() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;

    let initial = harness.password_grant("openid offline_access").await?;
    let refresh_token = initial
        .refresh_token
        .ok_or_else(|| anyhow::anyhow!("offline_access should return a refresh token"))?;

    let response = refresh(&harness, &refresh_token, None).await?;
    assert_eq!(response.status(), 200);
    let refreshed: TokenResponse = response.json().await?;

    assert!(!refreshed.access_token.is_empty());
    assert!(refreshed.id_token.is_some());
    assert!(refreshed.refresh_token.is_some());
    assert_eq!(refreshed.scope, initial.scope);

    Ok(())
}

/// refresh-2: Scopes come from the original grant, not the refresh request.
#[tokio::test]
async fn test_refresh_keeps_original_scopes() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;

    let initial = harness.password_grant("offline_access profile").await?;
    let refresh_token = initial.refresh_token.unwrap_or_default();

    let response = refresh(&harness, &refresh_token, Some("openid email roles")).await?;
    assert_eq!(response.status(), 200);
    let refreshed: TokenResponse = response.json().await?;

    assert_eq!(refreshed.scope.as_deref(), Some("offline_access profile"));
    assert!(refreshed.id_token.is_none(), "openid was not part of the original grant");

    Ok(())
}

/// refresh-3: Role changes since sign-in show up in refreshed tokens.
#[tokio::test]
async fn test_refresh_rederives_claims() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    let user_id = harness.test_user_id()?;

    let initial = harness.password_grant("offline_access roles").await?;
    harness
        .store
        .set_roles(user_id, vec!["user".to_string(), "auditor".to_string()])?;

    let response = refresh(&harness, &initial.refresh_token.unwrap_or_default(), None).await?;
    let refreshed: TokenResponse = response.json().await?;
    let access = jwt_payload(&refreshed.access_token)?;
    assert_eq!(access["role"], serde_json::json!(["user", "auditor"]));

    Ok(())
}

/// refresh-4: A disabled user can no longer refresh.
#[tokio::test]
async fn test_refresh_for_disabled_user() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;

    let initial = harness.password_grant("offline_access").await?;
    harness.store.set_enabled(harness.test_user_id()?, false)?;

    let response = refresh(&harness, &initial.refresh_token.unwrap_or_default(), None).await?;
    assert_eq!(response.status(), 400);
    let error: ErrorResponse = response.json().await?;
    assert_eq!(error.error, "invalid_grant");
    assert_eq!(
        error.error_description.as_deref(),
        Some("The user is no longer allowed to sign in.")
    );

    Ok(())
}

/// refresh-5: A deleted user's refresh token is no longer valid.
#[tokio::test]
async fn test_refresh_for_deleted_user() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;

    let initial = harness.password_grant("offline_access").await?;
    harness.store.remove_user(harness.test_user_id()?);

    let response = refresh(&harness, &initial.refresh_token.unwrap_or_default(), None).await?;
    assert_eq!(response.status(), 400);
    let error: ErrorResponse = response.json().await?;
    assert_eq!(
        error.error_description.as_deref(),
        Some("The refresh token is no longer valid.")
    );

    Ok(())
}

/// refresh-6: Access tokens and garbage are not refresh tokens.
#[tokio::test]
async fn test_invalid_refresh_tokens() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;

    let initial = harness.password_grant("offline_access").await?;
    for candidate in [initial.access_token.as_str(), "not-a-token"] {
        let response = refresh(&harness, candidate, None).await?;
        assert_eq!(response.status(), 400);
        let error: ErrorResponse = response.json().await?;
        assert_eq!(error.error, "invalid_grant");
        assert_eq!(
            error.error_description.as_deref(),
            Some("The refresh token is no longer valid.")
        );
    }

    Ok(())
}

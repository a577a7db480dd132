// Token refresh logic

use anyhow::{Context, Result};
use reqwest::Client;

use super::types::{RefreshRequest, TokenPair};
use crate::models::ApiEnvelope;

/// Renewal endpoint, relative to the API base address
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh-token";

/// Exchange a refresh token for a new token pair.
///
/// This is a plain call on the shared connection pool; it never goes through
/// the client's 401 recovery, so a 401 here cannot start another refresh.
pub async fn renew(client: &Client, base_url: &str, refresh_token: &str) -> Result<TokenPair> {
    tracing::info!("Refreshing access token...");

    let url = format!("{}{}", base_url, REFRESH_PATH);

    let response = client
        .post(&url)
        .json(&RefreshRequest { refresh_token })
        .send()
        .await
        .context("Failed to send refresh request")?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Token refresh failed: {} - {}", status, error_text);
    }

    let envelope: ApiEnvelope<TokenPair> = response
        .json()
        .await
        .context("Failed to parse refresh response")?;

    if !envelope.success {
        anyhow::bail!("Token refresh rejected: {}", envelope.summary());
    }

    let tokens = envelope
        .data
        .context("Refresh response does not contain token data")?;

    if tokens.access_token.is_empty() {
        anyhow::bail!("Refresh response does not contain access_token");
    }

    let token_prefix: String = tokens.access_token.chars().take(8).collect();
    tracing::info!(token_prefix = %token_prefix, "Access token refreshed");

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_renew_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", REFRESH_PATH)
            .match_body(Matcher::Json(json!({"refresh_token": "r1"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "success": true,
                    "data": {"access_token": "a2", "refresh_token": "r2"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let tokens = renew(&Client::new(), &server.url(), "r1").await.unwrap();
        assert_eq!(tokens.access_token, "a2");
        assert_eq!(tokens.refresh_token, "r2");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_renew_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", REFRESH_PATH)
            .with_status(401)
            .with_body(r#"{"success":false,"message":"Invalid refresh token"}"#)
            .create_async()
            .await;

        let err = renew(&Client::new(), &server.url(), "stale").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_renew_unsuccessful_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", REFRESH_PATH)
            .with_status(200)
            .with_body(r#"{"success":false,"message":"Refresh token revoked"}"#)
            .create_async()
            .await;

        let err = renew(&Client::new(), &server.url(), "r1").await.unwrap_err();
        assert!(err.to_string().contains("Refresh token revoked"));
    }

    #[tokio::test]
    async fn test_renew_missing_access_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", REFRESH_PATH)
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"access_token":"","refresh_token":"r2"}}"#)
            .create_async()
            .await;

        assert!(renew(&Client::new(), &server.url(), "r1").await.is_err());
    }
}

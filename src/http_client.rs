use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{refresh, Session};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{ApiEnvelope, PendingRequest, RequestBody, RequestOptions};
use crate::navigation::{is_public_path, Navigator, ROOT_PATH};
use crate::upload::UploadPayload;

/// HTTP client for the e-service API with transparent token refresh.
///
/// Every call reads the access token from the injected session store. A 401
/// on an original call triggers exactly one renewal through the refresh
/// endpoint and one replay of the call. If renewal is impossible, or the
/// replay is rejected with 401 as well, the session is cleared and, outside
/// the public pages, the navigator is sent back to the root.
///
/// Concurrent calls that hit 401 at the same time each run their own renewal;
/// there is no cross-call deduplication and the last token pair written to the
/// store wins.
#[derive(Clone)]
pub struct EServiceClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Base address without trailing slash
    base_url: String,

    /// Persisted credentials
    session: Session,

    /// Location tracking for forced redirects
    navigator: Arc<dyn Navigator>,
}

impl EServiceClient {
    /// Create a new client
    pub fn new(
        config: &ClientConfig,
        session: Session,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        config
            .validate()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(default_headers)
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            navigator,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    // ===== Request API =====

    /// Issue a call and decode the response envelope
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        let mut pending = PendingRequest::new(method, path).with_options(options);
        if let Some(body) = body {
            pending = pending.with_json(body);
        }
        self.execute(pending).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiEnvelope<T>, ClientError> {
        self.request(Method::GET, path, None, RequestOptions::default())
            .await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        self.request(Method::GET, path, None, options).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PUT, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PATCH, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        self.request(Method::DELETE, path, None, RequestOptions::default())
            .await
    }

    /// POST a file as multipart form data
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: UploadPayload,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        let pending =
            PendingRequest::new(Method::POST, path).with_body(RequestBody::Multipart(payload));
        self.execute(pending).await
    }

    /// Run a pending request through the send / refresh / replay cycle
    pub async fn execute<T: DeserializeOwned>(
        &self,
        pending: PendingRequest,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        let response = self.send(&pending).await?;
        let status = response.status();

        if status.is_success() {
            return Self::decode(response).await;
        }

        if status == StatusCode::UNAUTHORIZED && !pending.is_retry() {
            let original = Self::error_from_response(response).await;
            return self.recover_unauthorized(pending, original).await;
        }

        Err(Self::error_from_response(response).await)
    }

    // ===== Internals =====

    /// AuthFailure: renew once and replay, or clear the session
    async fn recover_unauthorized<T: DeserializeOwned>(
        &self,
        pending: PendingRequest,
        original: ClientError,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        let replay = pending.next_attempt();

        tracing::warn!(
            request_id = %pending.id(),
            method = %pending.method(),
            path = pending.path(),
            "Received 401, attempting token refresh"
        );

        match self.session.refresh_token() {
            Some(refresh_token) => {
                match refresh::renew(&self.client, &self.base_url, &refresh_token).await {
                    Ok(tokens) => match self.session.store_tokens(&tokens) {
                        Ok(()) => return self.replay(replay).await,
                        Err(e) => {
                            tracing::error!(
                                request_id = %pending.id(),
                                error = %e,
                                "Failed to store renewed tokens"
                            );
                        }
                    },
                    Err(e) => {
                        tracing::error!(
                            request_id = %pending.id(),
                            error = %e,
                            "Token refresh failed"
                        );
                    }
                }
            }
            None => {
                tracing::debug!(
                    request_id = %pending.id(),
                    "No refresh token stored, skipping renewal"
                );
            }
        }

        Err(self.session_expired(original))
    }

    /// Replay: one more send; a 401 here ends the session without another refresh
    async fn replay<T: DeserializeOwned>(
        &self,
        replay: PendingRequest,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        tracing::debug!(
            request_id = %replay.id(),
            attempt = replay.attempt(),
            "Replaying request with renewed token"
        );

        let response = self.send(&replay).await?;
        let status = response.status();
        if status.is_success() {
            return Self::decode(response).await;
        }

        let error = Self::error_from_response(response).await;
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                request_id = %replay.id(),
                "Replay rejected with 401 after renewal"
            );
            return Err(self.session_expired(error));
        }
        Err(error)
    }

    /// Clear the session and describe the loss using the server's message
    fn session_expired(&self, cause: ClientError) -> ClientError {
        let redirected = self.expire_session();
        let message = match &cause {
            ClientError::Api { envelope, .. } => envelope.summary(),
            other => other.to_string(),
        };
        ClientError::SessionExpired {
            message,
            redirected,
        }
    }

    /// Clear persisted credentials; returns whether a hard redirect happened
    fn expire_session(&self) -> bool {
        if let Err(e) = self.session.clear() {
            tracing::error!(error = %e, "Failed to clear session state");
        }

        let current = self.navigator.current_path();
        if is_public_path(&current) {
            tracing::info!(path = %current, "Session cleared on public page, staying put");
            false
        } else {
            tracing::warn!(path = %current, "Session cleared, returning to application root");
            self.navigator.hard_redirect(ROOT_PATH);
            true
        }
    }

    /// Build and send one attempt, attaching the current bearer token
    async fn send(&self, pending: &PendingRequest) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, pending.path());

        tracing::debug!(
            request_id = %pending.id(),
            method = %pending.method(),
            url = %url,
            attempt = pending.attempt(),
            "Sending HTTP request"
        );

        let mut builder = self
            .client
            .request(pending.method().clone(), &url)
            .headers(pending.headers().clone());

        if !pending.query().is_empty() {
            builder = builder.query(pending.query());
        }

        if let Some(token) = self.session.access_token() {
            builder = builder.bearer_auth(token);
        }

        builder = match pending.body() {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(payload) => builder.multipart(payload.to_form()?),
        };

        match builder.send().await {
            Ok(response) => {
                tracing::debug!(
                    request_id = %pending.id(),
                    status = %response.status(),
                    "Received HTTP response"
                );
                Ok(response)
            }
            Err(e) => {
                // Categorize the error for better debugging
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection_failed"
                } else if e.is_request() {
                    "request_error"
                } else if e.is_body() {
                    "body_error"
                } else {
                    "unknown"
                };

                tracing::warn!(
                    request_id = %pending.id(),
                    error_kind = error_kind,
                    error = %e,
                    url = %url,
                    "HTTP request error"
                );
                Err(ClientError::Transport(e))
            }
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<ApiEnvelope<T>, ClientError> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(ApiEnvelope::empty_success());
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn error_from_response(response: Response) -> ClientError {
        let status = response.status();
        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        let envelope = ApiEnvelope::from_error_body(&body);

        tracing::warn!(
            status = status.as_u16(),
            url = %url,
            message = %envelope.summary(),
            "Received error response"
        );

        ClientError::Api {
            status: status.as_u16(),
            envelope,
        }
    }
}

impl std::fmt::Debug for EServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EServiceClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::MemoryNavigator;

    fn client(base_url: &str) -> Result<EServiceClient, ClientError> {
        EServiceClient::new(
            &ClientConfig::default().with_base_url(base_url),
            Session::in_memory(),
            Arc::new(MemoryNavigator::default()),
        )
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = client("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        assert!(matches!(
            client("localhost:3000"),
            Err(ClientError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_transport_error_propagates_without_clearing() {
        // Port 9 (discard) is not listening in test environments
        let client = client("http://127.0.0.1:9").unwrap();
        client
            .session()
            .store_tokens(&crate::auth::TokenPair {
                access_token: "a1".to_string(),
                refresh_token: "r1".to_string(),
            })
            .unwrap();

        let result = client.get::<Value>("/api/v1/licenses/my").await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert!(client.session().is_authenticated());
    }
}

//! Authentication endpoints

use serde_json::{Map, Value};

use super::API_PREFIX;
use crate::auth::types::{ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::auth::{AuthData, User};
use crate::error::ClientError;
use crate::http_client::EServiceClient;
use crate::models::ApiEnvelope;

impl EServiceClient {
    /// Log in and persist tokens and the user record
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let envelope: ApiEnvelope<AuthData> =
            self.post(&format!("{}/auth/login", API_PREFIX), &request).await?;
        self.persist_auth(envelope)
    }

    /// Register a citizen account; the backend logs the new user in directly
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        profile: Map<String, Value>,
    ) -> Result<User, ClientError> {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            profile,
        };
        let envelope: ApiEnvelope<AuthData> =
            self.post(&format!("{}/auth/register", API_PREFIX), &request).await?;
        self.persist_auth(envelope)
    }

    /// Tell the backend, then drop local state whatever the answer was
    pub async fn logout(&self) -> Result<(), ClientError> {
        let body = match self.session().refresh_token() {
            Some(refresh_token) => serde_json::json!({ "refresh_token": refresh_token }),
            None => serde_json::json!({}),
        };

        if let Err(e) = self
            .post::<Value, _>(&format!("{}/auth/logout", API_PREFIX), &body)
            .await
        {
            tracing::warn!(error = %e, "Logout request failed, clearing local session anyway");
        }

        self.session().clear()?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Fetch the profile and refresh the cached user record
    pub async fn profile(&self) -> Result<User, ClientError> {
        let envelope: ApiEnvelope<User> = self.get(&format!("{}/auth/profile", API_PREFIX)).await?;
        let user = envelope.into_data()?;
        self.session().store_user(&user)?;
        Ok(user)
    }

    pub async fn update_profile(&self, fields: &Map<String, Value>) -> Result<User, ClientError> {
        let envelope: ApiEnvelope<User> =
            self.put(&format!("{}/auth/profile", API_PREFIX), fields).await?;
        let user = envelope.into_data()?;
        self.session().store_user(&user)?;
        Ok(user)
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        if new_password.is_empty() {
            return Err(ClientError::InvalidRequest("new password must not be empty".into()));
        }
        let request = ChangePasswordRequest {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        self.put(&format!("{}/auth/password", API_PREFIX), &request)
            .await
    }

    fn persist_auth(&self, envelope: ApiEnvelope<AuthData>) -> Result<User, ClientError> {
        let data = envelope.into_data()?;
        self.session().store_login(&data.tokens, &data.user)?;
        tracing::info!(
            user = %data.user.display_name(),
            capability = %data.user.capability(),
            "Session established"
        );
        Ok(data.user)
    }
}

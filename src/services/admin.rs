//! Admin Portal endpoints: user and e-service management

use serde_json::{json, Value};

use super::{segment, API_PREFIX};
use crate::auth::User;
use crate::error::ClientError;
use crate::http_client::EServiceClient;
use crate::models::{ApiEnvelope, PageQuery};

impl EServiceClient {
    pub async fn users(
        &self,
        page: PageQuery,
        role: Option<&str>,
    ) -> Result<ApiEnvelope<Vec<User>>, ClientError> {
        self.ensure_capability(|c| c.can_manage_users(), "Listing users")?;
        let mut options = page.to_options();
        if let Some(role) = role {
            options = options.query("role", role);
        }
        self.get_with(&format!("{}/admin/users", API_PREFIX), options)
            .await
    }

    /// Send an invitation; the invitee completes registration from `/invite/<code>`
    pub async fn invite_user(&self, email: &str, role: &str) -> Result<ApiEnvelope<Value>, ClientError> {
        self.ensure_capability(|c| c.can_manage_users(), "Inviting users")?;
        if !email.contains('@') {
            return Err(ClientError::InvalidRequest(format!("invalid email: {}", email)));
        }
        self.post(
            &format!("{}/admin/users/invite", API_PREFIX),
            &json!({ "email": email, "role": role }),
        )
        .await
    }

    pub async fn update_user_role(&self, id: &str, role: &str) -> Result<ApiEnvelope<User>, ClientError> {
        self.ensure_capability(|c| c.can_manage_users(), "Changing user roles")?;
        self.put(
            &format!("{}/admin/users/{}/role", API_PREFIX, segment(id)?),
            &json!({ "role": role }),
        )
        .await
    }

    /// E-service catalog as configured in the Admin Portal
    pub async fn services(&self) -> Result<ApiEnvelope<Vec<Value>>, ClientError> {
        self.get(&format!("{}/admin/services", API_PREFIX)).await
    }

    pub async fn toggle_service(&self, id: &str, enabled: bool) -> Result<ApiEnvelope<Value>, ClientError> {
        self.ensure_capability(|c| c.can_manage_users(), "Changing e-service availability")?;
        self.patch(
            &format!("{}/admin/services/{}", API_PREFIX, segment(id)?),
            &json!({ "enabled": enabled }),
        )
        .await
    }

    /// Counters for the staff and admin dashboards
    pub async fn dashboard_stats(&self) -> Result<ApiEnvelope<Value>, ClientError> {
        self.ensure_capability(|c| c.can_review(), "Viewing dashboard statistics")?;
        self.get(&format!("{}/admin/dashboard", API_PREFIX)).await
    }
}

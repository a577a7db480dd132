//! Notification endpoints

use serde_json::{json, Value};

use super::{segment, API_PREFIX};
use crate::error::ClientError;
use crate::http_client::EServiceClient;
use crate::models::{ApiEnvelope, Notification, PageQuery, UnreadCount};

impl EServiceClient {
    pub async fn notifications(
        &self,
        page: PageQuery,
    ) -> Result<ApiEnvelope<Vec<Notification>>, ClientError> {
        self.get_with(&format!("{}/notifications", API_PREFIX), page.to_options())
            .await
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<ApiEnvelope<Value>, ClientError> {
        self.put(
            &format!("{}/notifications/{}/read", API_PREFIX, segment(id)?),
            &json!({}),
        )
        .await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<ApiEnvelope<Value>, ClientError> {
        self.put(&format!("{}/notifications/read-all", API_PREFIX), &json!({}))
            .await
    }

    pub async fn unread_notification_count(&self) -> Result<u64, ClientError> {
        let envelope: ApiEnvelope<UnreadCount> = self
            .get(&format!("{}/notifications/unread-count", API_PREFIX))
            .await?;
        Ok(envelope.into_data()?.count)
    }
}

//! Inspection and audit report endpoints

use serde_json::{Map, Value};

use super::{segment, API_PREFIX};
use crate::error::ClientError;
use crate::http_client::EServiceClient;
use crate::models::{ApiEnvelope, PageQuery};

impl EServiceClient {
    /// Inspections visible to the current user (assigned ones for inspectors)
    pub async fn inspections(&self, page: PageQuery) -> Result<ApiEnvelope<Vec<Value>>, ClientError> {
        self.get_with(&format!("{}/inspections", API_PREFIX), page.to_options())
            .await
    }

    pub async fn inspection(&self, id: &str) -> Result<ApiEnvelope<Value>, ClientError> {
        self.get(&format!("{}/inspections/{}", API_PREFIX, segment(id)?))
            .await
    }

    /// File the findings of a site inspection
    pub async fn submit_inspection_report(
        &self,
        id: &str,
        report: &Map<String, Value>,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.ensure_capability(|c| c.can_review(), "Submitting inspection reports")?;
        self.post(
            &format!("{}/inspections/{}/report", API_PREFIX, segment(id)?),
            report,
        )
        .await
    }

    pub async fn audit_reports(&self, page: PageQuery) -> Result<ApiEnvelope<Vec<Value>>, ClientError> {
        self.ensure_capability(|c| c.can_review(), "Viewing audit reports")?;
        self.get_with(&format!("{}/audit-reports", API_PREFIX), page.to_options())
            .await
    }
}

//! License request endpoints

use serde_json::{Map, Value};

use super::{segment, API_PREFIX};
use crate::error::ClientError;
use crate::http_client::EServiceClient;
use crate::models::{
    ApiEnvelope, InspectorAssignment, LicenseRequestSubmission, PageQuery, ReviewDecision,
    ReviewRequest,
};
use crate::upload::UploadPayload;

fn licenses_path() -> String {
    format!("{}/licenses", API_PREFIX)
}

fn license_path(id: &str) -> Result<String, ClientError> {
    Ok(format!("{}/{}", licenses_path(), segment(id)?))
}

impl EServiceClient {
    /// License requests filed by the current user
    pub async fn my_license_requests(
        &self,
        page: PageQuery,
    ) -> Result<ApiEnvelope<Vec<Value>>, ClientError> {
        self.get_with(&format!("{}/my", licenses_path()), page.to_options())
            .await
    }

    /// All license requests (staff/admin listing)
    pub async fn license_requests(
        &self,
        page: PageQuery,
        status: Option<&str>,
    ) -> Result<ApiEnvelope<Vec<Value>>, ClientError> {
        self.ensure_capability(|c| c.can_review(), "Listing all license requests")?;
        let mut options = page.to_options();
        if let Some(status) = status {
            options = options.query("status", status);
        }
        self.get_with(&licenses_path(), options).await
    }

    pub async fn license_request(&self, id: &str) -> Result<ApiEnvelope<Value>, ClientError> {
        self.get(&license_path(id)?).await
    }

    /// File a new, renewal, extension or reduction request
    pub async fn submit_license_request(
        &self,
        submission: &LicenseRequestSubmission,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        submission.validate().map_err(ClientError::InvalidRequest)?;
        self.post(&licenses_path(), submission).await
    }

    pub async fn update_license_request(
        &self,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.put(&license_path(id)?, fields).await
    }

    pub async fn cancel_license_request(&self, id: &str) -> Result<ApiEnvelope<Value>, ClientError> {
        self.delete(&license_path(id)?).await
    }

    /// Approve or reject a request
    pub async fn review_license_request(
        &self,
        id: &str,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.ensure_capability(|c| c.can_review(), "Reviewing license requests")?;
        if decision == ReviewDecision::Reject && comment.map_or(true, |c| c.trim().is_empty()) {
            return Err(ClientError::InvalidRequest(
                "a rejection must carry a comment".into(),
            ));
        }
        let request = ReviewRequest {
            decision,
            comment: comment.map(str::to_string),
        };
        self.post(&format!("{}/review", license_path(id)?), &request)
            .await
    }

    pub async fn assign_inspector(
        &self,
        id: &str,
        assignment: &InspectorAssignment,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.ensure_capability(|c| c.can_review(), "Assigning inspectors")?;
        segment(&assignment.inspector_id)?;
        self.post(&format!("{}/assign-inspector", license_path(id)?), assignment)
            .await
    }

    /// Attach a supporting document to a request
    pub async fn upload_license_document(
        &self,
        id: &str,
        document: UploadPayload,
    ) -> Result<ApiEnvelope<Value>, ClientError> {
        self.upload(&format!("{}/documents", license_path(id)?), document)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_license_paths() {
        assert_eq!(licenses_path(), "/api/v1/licenses");
        assert_eq!(license_path("LIC-9").unwrap(), "/api/v1/licenses/LIC-9");
        assert!(license_path("../admin").is_err());
    }
}

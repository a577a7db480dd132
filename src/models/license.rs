use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::request::RequestOptions;

// ==================================================================================================
// License Requests
// ==================================================================================================

/// Kind of license request a citizen can file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseRequestType {
    New,
    Renewal,
    Extension,
    Reduction,
}

impl LicenseRequestType {
    /// Every type except `New` amends an existing license
    pub fn requires_existing_license(&self) -> bool {
        !matches!(self, LicenseRequestType::New)
    }
}

impl std::str::FromStr for LicenseRequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "renewal" | "renew" => Ok(Self::Renewal),
            "extension" | "extend" => Ok(Self::Extension),
            "reduction" | "reduce" => Ok(Self::Reduction),
            other => Err(format!("unknown license request type: {}", other)),
        }
    }
}

/// Payload for filing a license request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseRequestSubmission {
    pub request_type: LicenseRequestType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    /// Form fields specific to the request type, sent as-is
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl LicenseRequestSubmission {
    pub fn new(request_type: LicenseRequestType) -> Self {
        Self {
            request_type,
            license_id: None,
            details: Map::new(),
        }
    }

    pub fn for_license(mut self, license_id: impl Into<String>) -> Self {
        self.license_id = Some(license_id.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Check the submission is coherent before sending it
    pub fn validate(&self) -> Result<(), String> {
        if self.request_type.requires_existing_license()
            && self.license_id.as_deref().map_or(true, |id| id.trim().is_empty())
        {
            return Err(format!(
                "{:?} requests must reference an existing license",
                self.request_type
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// Staff decision on a license request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectorAssignment {
    pub inspector_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
}

// ==================================================================================================
// Listing
// ==================================================================================================

/// Page selection for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl PageQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn to_options(self) -> RequestOptions {
        RequestOptions::new()
            .query("page", self.page)
            .query("limit", self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_type_serialization() {
        assert_eq!(
            serde_json::to_value(LicenseRequestType::Renewal).unwrap(),
            json!("renewal")
        );
        let parsed: LicenseRequestType = serde_json::from_value(json!("reduction")).unwrap();
        assert_eq!(parsed, LicenseRequestType::Reduction);
    }

    #[test]
    fn test_request_type_from_str() {
        assert_eq!("NEW".parse::<LicenseRequestType>(), Ok(LicenseRequestType::New));
        assert_eq!("extend".parse::<LicenseRequestType>(), Ok(LicenseRequestType::Extension));
        assert!("transfer".parse::<LicenseRequestType>().is_err());
    }

    #[test]
    fn test_submission_flattens_details() {
        let submission = LicenseRequestSubmission::new(LicenseRequestType::Extension)
            .for_license("LIC-2024-0012")
            .field("capacity_kw", 250)
            .field("site_name", "Solar Farm A");

        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(value["request_type"], "extension");
        assert_eq!(value["license_id"], "LIC-2024-0012");
        assert_eq!(value["capacity_kw"], 250);
        assert_eq!(value["site_name"], "Solar Farm A");
    }

    #[test]
    fn test_submission_validation() {
        assert!(LicenseRequestSubmission::new(LicenseRequestType::New)
            .validate()
            .is_ok());
        assert!(LicenseRequestSubmission::new(LicenseRequestType::Renewal)
            .validate()
            .is_err());
        assert!(LicenseRequestSubmission::new(LicenseRequestType::Renewal)
            .for_license("  ")
            .validate()
            .is_err());
        assert!(LicenseRequestSubmission::new(LicenseRequestType::Reduction)
            .for_license("LIC-1")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_page_query_clamps() {
        let page = PageQuery::new(0, 0);
        assert_eq!(page, PageQuery { page: 1, limit: 1 });
        let options = PageQuery::default().to_options();
        assert_eq!(options.query[0], ("page".to_string(), "1".to_string()));
        assert_eq!(options.query[1], ("limit".to_string(), "10".to_string()));
    }

    #[test]
    fn test_review_request_skips_empty_comment() {
        let review = ReviewRequest {
            decision: ReviewDecision::Approve,
            comment: None,
        };
        assert_eq!(serde_json::to_value(&review).unwrap(), json!({"decision": "approve"}));
    }
}

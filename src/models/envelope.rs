use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Maximum length for raw error bodies folded into a synthesized envelope
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Uniform response wrapper returned by every backend endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T = Value> {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

impl Pagination {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

impl<T> ApiEnvelope<T> {
    /// Envelope for an empty 2xx body (e.g. 204 No Content)
    pub fn empty_success() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            error: None,
            pagination: None,
        }
    }

    /// Human-readable description: message, then error, then a generic fallback
    pub fn summary(&self) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .or_else(|| self.error.as_deref().filter(|e| !e.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| {
                if self.success {
                    "ok".to_string()
                } else {
                    "request was not successful".to_string()
                }
            })
    }

    /// Turn `success: false` into an error, yielding the payload otherwise
    pub fn into_result(self) -> Result<Option<T>, ClientError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ClientError::Rejected(self.summary()))
        }
    }

    /// Like `into_result`, but a successful envelope must carry data
    pub fn into_data(self) -> Result<T, ClientError> {
        self.into_result()?
            .ok_or_else(|| ClientError::Rejected("response did not contain data".to_string()))
    }
}

impl ApiEnvelope<Value> {
    /// Decode an error body, keeping the raw text when it is not an envelope
    pub fn from_error_body(body: &str) -> Self {
        let mut envelope = serde_json::from_str::<ApiEnvelope<Value>>(body).unwrap_or_else(|_| Self {
            success: false,
            data: None,
            message: None,
            error: None,
            pagination: None,
        });

        if envelope.message.is_none() && envelope.error.is_none() && !body.trim().is_empty() {
            envelope.error = Some(truncate_body(body));
        }
        envelope
    }
}

/// Truncate a response body to avoid carrying excessive data around
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

//! Typed endpoint wrappers over [`EServiceClient`](crate::http_client::EServiceClient).
//!
//! Each submodule adds methods for one backend resource. All of them go
//! through the client's request path, so bearer attachment and token refresh
//! apply uniformly.

pub mod admin;
pub mod auth;
pub mod inspections;
pub mod licenses;
pub mod notifications;

use crate::auth::Capability;
use crate::error::ClientError;
use crate::http_client::EServiceClient;

/// API version prefix shared by every endpoint
pub const API_PREFIX: &str = "/api/v1";

/// Validate an identifier used as a single path segment
pub(crate) fn segment(id: &str) -> Result<&str, ClientError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ClientError::InvalidRequest("identifier must not be empty".into()));
    }
    if id.contains(|c: char| matches!(c, '/' | '?' | '#')) {
        return Err(ClientError::InvalidRequest(format!(
            "identifier must be a single path segment: {}",
            id
        )));
    }
    Ok(id)
}

impl EServiceClient {
    /// Refuse early when the cached user's capability rules the action out.
    /// Without a cached user the decision is left to the server.
    pub(crate) fn ensure_capability(
        &self,
        allowed: impl Fn(Capability) -> bool,
        action: &str,
    ) -> Result<(), ClientError> {
        match self.session().capability() {
            Some(capability) if !allowed(capability) => Err(ClientError::NotPermitted(format!(
                "{} is not available to {} accounts",
                action, capability
            ))),
            _ => Ok(()),
        }
    }
}

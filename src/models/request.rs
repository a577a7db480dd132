use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

use crate::upload::UploadPayload;

/// Body carried by an outbound request
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(UploadPayload),
}

/// Per-call extras: query parameters and headers
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Immutable descriptor of an outbound call.
///
/// A replay is derived by value through [`PendingRequest::next_attempt`]; the
/// original descriptor is never mutated, so the client decides retry
/// eligibility by looking at `attempt` alone.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    id: Uuid,
    method: Method,
    path: String,
    options: RequestOptions,
    body: RequestBody,
    attempt: u32,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            options: RequestOptions::default(),
            body: RequestBody::Empty,
            attempt: 0,
        }
    }

    pub fn with_body(self, body: RequestBody) -> Self {
        Self { body, ..self }
    }

    pub fn with_json(self, body: Value) -> Self {
        self.with_body(RequestBody::Json(body))
    }

    pub fn with_options(self, options: RequestOptions) -> Self {
        Self { options, ..self }
    }

    /// The same request, one attempt later
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }

    /// Whether this descriptor is already a replay
    pub fn is_retry(&self) -> bool {
        self.attempt > 0
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.options.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.options.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_next_attempt_leaves_original_untouched() {
        let original = PendingRequest::new(Method::POST, "/api/v1/licenses")
            .with_json(json!({"request_type": "new"}))
            .with_options(RequestOptions::new().query("draft", true));

        let replay = original.next_attempt();

        assert_eq!(original.attempt(), 0);
        assert!(!original.is_retry());
        assert_eq!(replay.attempt(), 1);
        assert!(replay.is_retry());

        // Replay carries the descriptor verbatim
        assert_eq!(replay.id(), original.id());
        assert_eq!(replay.method(), &Method::POST);
        assert_eq!(replay.path(), "/api/v1/licenses");
        assert_eq!(replay.query(), original.query());
        match replay.body() {
            RequestBody::Json(v) => assert_eq!(v["request_type"], "new"),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_options_builder() {
        let options = RequestOptions::new()
            .query("page", 2)
            .query("limit", 20)
            .header(
                HeaderName::from_static("x-portal"),
                HeaderValue::from_static("web-view"),
            );

        assert_eq!(
            options.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "20".to_string())
            ]
        );
        assert_eq!(options.headers.get("x-portal").unwrap(), "web-view");
    }

    #[test]
    fn test_new_request_defaults() {
        let request = PendingRequest::new(Method::GET, "/api/v1/notifications");
        assert!(matches!(request.body(), RequestBody::Empty));
        assert!(request.headers().is_empty());
        assert!(request.query().is_empty());
    }
}

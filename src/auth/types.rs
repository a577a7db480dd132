// Authentication types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::capability::Capability;

/// Access/refresh token pair issued by login, registration or refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh request body
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Cached user record, persisted JSON-serialized under the `user` key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: String,
    /// Remaining profile fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn capability(&self) -> Capability {
        Capability::from_role(&self.role)
    }

    pub fn display_name(&self) -> String {
        ["full_name", "name", "fullName"]
            .iter()
            .find_map(|key| self.extra.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| match &self.id {
                Value::String(id) => id.clone(),
                other => other.to_string(),
            })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration payload; portal-specific fields travel in `profile`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

/// `data` of a successful login or registration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthData {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

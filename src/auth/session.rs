// Session persistence
// Key/value session store injected into the client, plus a typed facade

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::capability::Capability;
use super::types::{TokenPair, User};

/// Storage key for the access token
pub const TOKEN_KEY: &str = "token";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Storage key for the JSON-serialized user record
pub const USER_KEY: &str = "user";

/// Client-side key/value persistence for session state.
///
/// Individual operations are atomic; sequences of them are not.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

// ==================================================================================================
// In-memory store
// ==================================================================================================

/// Process-local store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// ==================================================================================================
// File-backed store
// ==================================================================================================

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    saved_at: DateTime<Utc>,
    entries: BTreeMap<String, String>,
}

/// Write-through store persisted as a JSON file.
///
/// The file is created on first write and deleted once the last entry is
/// removed.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: DashMap<String, String>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, loading existing entries if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = DashMap::new();

        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session file: {}", path.display()))?;
            let file: SessionFile = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
            tracing::debug!(
                path = %path.display(),
                saved_at = %file.saved_at.to_rfc3339(),
                "Loaded session file"
            );
            for (key, value) in file.entries {
                entries.insert(key, value);
            }
        }

        Ok(Self {
            path,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let entries: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).with_context(|| {
                    format!("Failed to remove session file: {}", self.path.display())
                })?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory: {}", parent.display())
            })?;
        }

        let contents = serde_json::to_string_pretty(&SessionFile {
            saved_at: Utc::now(),
            entries,
        })?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

// ==================================================================================================
// Typed facade
// ==================================================================================================

/// Typed access to the session keys of an injected store.
/// Clone is cheap: the store is shared.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Cached user record; an unreadable record is treated as absent
    pub fn user(&self) -> Option<User> {
        let raw = self.store.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cached user record");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Capability of the cached user, if any
    pub fn capability(&self) -> Option<Capability> {
        self.user().map(|u| u.capability())
    }

    pub fn store_tokens(&self, tokens: &TokenPair) -> Result<()> {
        self.store
            .set(TOKEN_KEY, &tokens.access_token)
            .context("Failed to store access token")?;
        self.store
            .set(REFRESH_TOKEN_KEY, &tokens.refresh_token)
            .context("Failed to store refresh token")?;
        Ok(())
    }

    pub fn store_user(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user).context("Failed to serialize user record")?;
        self.store.set(USER_KEY, &raw).context("Failed to store user record")
    }

    /// Persist everything a successful login or registration yields
    pub fn store_login(&self, tokens: &TokenPair, user: &User) -> Result<()> {
        self.store_tokens(tokens)?;
        self.store_user(user)
    }

    /// Remove every session key. All removals are attempted; the first
    /// failure is returned.
    pub fn clear(&self) -> Result<()> {
        let mut first_error = None;
        for key in [TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::error!(key = key, error = %e, "Failed to remove session key");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.context("Failed to clear session")),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("has_refresh_token", &self.refresh_token().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tokens(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    fn user(role: &str) -> User {
        serde_json::from_value(json!({"id": 7, "email": "a@b.co", "role": role})).unwrap()
    }

    #[test]
    fn test_memory_store_basic_ops() {
        let store = MemoryStore::new();
        assert!(store.get("token").is_none());
        store.set("token", "abc").unwrap();
        assert_eq!(store.get("token").as_deref(), Some("abc"));
        store.remove("token").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_session_uses_expected_keys() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone());

        session.store_login(&tokens("a1", "r1"), &user("citizen")).unwrap();

        assert_eq!(store.get("token").as_deref(), Some("a1"));
        assert_eq!(store.get("refreshToken").as_deref(), Some("r1"));
        let raw_user: serde_json::Value =
            serde_json::from_str(&store.get("user").unwrap()).unwrap();
        assert_eq!(raw_user["email"], "a@b.co");
    }

    #[test]
    fn test_session_clear_removes_everything() {
        let session = Session::in_memory();
        session.store_login(&tokens("a1", "r1"), &user("admin")).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.capability(), Some(Capability::Admin));

        session.clear().unwrap();

        assert!(!session.is_authenticated());
        assert!(session.refresh_token().is_none());
        assert!(session.user().is_none());
        assert!(session.capability().is_none());
    }

    #[test]
    fn test_empty_token_means_unauthenticated() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "").unwrap();
        let session = Session::new(store);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_unreadable_user_is_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set(USER_KEY, "{not json").unwrap();
        assert!(Session::new(store).user().is_none());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        {
            let session = Session::new(Arc::new(FileStore::open(&path).unwrap()));
            session.store_login(&tokens("a1", "r1"), &user("staff")).unwrap();
        }
        assert!(path.exists());

        let reopened = Session::new(Arc::new(FileStore::open(&path).unwrap()));
        assert_eq!(reopened.access_token().as_deref(), Some("a1"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("r1"));
        assert_eq!(reopened.capability(), Some(Capability::Staff));
    }

    #[test]
    fn test_file_store_removes_file_when_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = Arc::new(FileStore::open(&path).unwrap());
        let session = Session::new(store.clone());

        session.store_tokens(&tokens("a1", "r1")).unwrap();
        assert!(path.exists());

        session.clear().unwrap();
        assert!(!path.exists());
        assert!(store.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "garbage").unwrap();
        assert!(FileStore::open(&path).is_err());
    }
}

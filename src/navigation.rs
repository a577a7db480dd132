// Navigation
// Where the user currently is, and the forced return to the root after session loss

use std::sync::{Mutex, PoisonError, RwLock};

/// Application root, target of every forced redirect
pub const ROOT_PATH: &str = "/";

/// Pages that stay put when the session is lost
pub const PUBLIC_PATHS: &[&str] = &[ROOT_PATH, "/login", "/register", "/reset-password", "/invite"];

/// Strip query, fragment and trailing slashes from a location
fn normalize(path: &str) -> &str {
    let end = path.find(|c: char| c == '?' || c == '#').unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() {
        ROOT_PATH
    } else {
        trimmed
    }
}

/// Whether `path` is a public/auth page exempt from the forced redirect.
///
/// The root matches exactly; other entries also cover their sub-paths
/// (`/invite/<code>`, `/reset-password/<token>`).
pub fn is_public_path(path: &str) -> bool {
    let path = normalize(path);
    PUBLIC_PATHS.iter().any(|public| {
        path == *public
            || (*public != ROOT_PATH
                && path
                    .strip_prefix(public)
                    .is_some_and(|rest| rest.starts_with('/')))
    })
}

/// Current location and full-reload navigation
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    /// Full navigation that discards application state
    fn hard_redirect(&self, to: &str);
}

/// Navigator that keeps the location in memory and records redirects
#[derive(Debug)]
pub struct MemoryNavigator {
    current: RwLock<String>,
    redirects: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(path.into()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    /// Client-side route change; not recorded as a redirect
    pub fn navigate(&self, path: impl Into<String>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = path.into();
    }

    /// Hard redirects performed so far, oldest first
    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new(ROOT_PATH)
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn hard_redirect(&self, to: &str) {
        tracing::warn!(from = %self.current_path(), to = to, "Forcing full navigation");
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(to.to_string());
        self.navigate(to);
    }
}

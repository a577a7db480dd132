// Authentication module
// Session persistence, token renewal and role classification

pub mod capability;
pub mod refresh;
pub mod session;
pub mod types;

pub use capability::Capability;
pub use session::{FileStore, MemoryStore, Session, SessionStore};
pub use types::{AuthData, TokenPair, User};

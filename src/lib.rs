// E-Service Client - Library root

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
pub mod navigation;
pub mod services;
pub mod upload;

pub use auth::{Capability, FileStore, MemoryStore, Session, SessionStore, TokenPair, User};
pub use config::ClientConfig;
pub use error::ClientError;
pub use http_client::EServiceClient;
pub use models::{ApiEnvelope, Pagination, RequestOptions};
pub use navigation::{MemoryNavigator, Navigator};
pub use upload::UploadPayload;

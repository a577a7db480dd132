use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Local development backend
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Application name used for the data directory
const APP_NAME: &str = "eservice";

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

const DEFAULT_CONNECT_TIMEOUT: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// E-Service Portal command-line client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Backend base address
    #[arg(short = 'u', long, env = "API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Path to the persisted session file
    #[arg(short = 's', long, env = "SESSION_FILE")]
    pub session_file: Option<String>,

    /// Page the session is considered to be on (decides forced redirects)
    #[arg(long, env = "CURRENT_PAGE", default_value = "/")]
    pub page: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value_t = DEFAULT_CONNECT_TIMEOUT)]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT)]
    pub http_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log in and persist the session
    Login {
        email: String,
        /// Password (prompted when omitted)
        #[arg(long, env = "ESERVICE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log out and clear the local session
    Logout,
    /// Show the cached user and its capability
    Whoami,
    /// GET an arbitrary API path
    Get {
        path: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },
    /// POST a JSON body to an arbitrary API path
    Post {
        path: String,
        /// JSON body
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Upload a file as multipart form data
    Upload {
        path: String,
        file: PathBuf,
        /// Form field name of the file part
        #[arg(long, default_value = "file")]
        field: String,
        /// MIME type of the file
        #[arg(long)]
        mime: Option<String>,
    },
    /// List my license requests
    Licenses {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// List notifications
    Notifications {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

/// Settings the HTTP client itself needs
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout: u64,
    pub request_timeout: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: format!("eservice-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Read settings from the environment (and `.env` if present)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("API_BASE_URL")
                .filter(|s| !s.trim().is_empty())
                .map(|s| normalize_base_url(&s))
                .unwrap_or(defaults.base_url),

            connect_timeout: lookup("HTTP_CONNECT_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.connect_timeout),

            request_timeout: lookup("HTTP_REQUEST_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout),

            user_agent: defaults.user_agent,
        }
    }

    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = normalize_base_url(base_url.as_ref());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            anyhow::bail!(
                "API_BASE_URL must start with http:// or https://: {}",
                self.base_url
            );
        }
        Ok(())
    }
}

/// Full CLI configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub client: ClientConfig,
    pub session_file: PathBuf,
    pub current_page: String,
    pub log_level: String,
    pub command: Command,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let session_file = match args.session_file {
            Some(path) => expand_tilde(&path),
            None => default_session_path()
                .context("Could not determine a data directory; set SESSION_FILE")?,
        };

        Ok(Config {
            client: ClientConfig {
                base_url: normalize_base_url(&args.base_url),
                connect_timeout: args.connect_timeout,
                request_timeout: args.http_timeout,
                ..ClientConfig::default()
            },
            session_file,
            current_page: args.page,
            log_level: args.log_level,
            command: args.command,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.client.validate()
    }
}

/// Trim whitespace and trailing slashes so paths can be appended directly
fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn default_session_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_NAME).join(SESSION_FILE))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a `key=value` query argument
fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
    if key.is_empty() {
        return Err(format!("empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/session.json");
        assert!(path.to_string_lossy().contains("test/session.json"));
        assert!(!path.to_string_lossy().starts_with("~"));

        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_tilde_just_tilde() {
        // Just "~" without slash should not expand
        assert_eq!(expand_tilde("~"), PathBuf::from("~"));
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("status=pending"),
            Ok(("status".to_string(), "pending".to_string()))
        );
        assert_eq!(
            parse_key_value("q=a=b"),
            Ok(("q".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, "http://localhost:3000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_config_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("API_BASE_URL", " https://eservice.example.go.th/ "),
            ("HTTP_CONNECT_TIMEOUT", "3"),
            ("HTTP_REQUEST_TIMEOUT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.base_url, "https://eservice.example.go.th");
        assert_eq!(config.connect_timeout, 3);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_validate_rejects_non_http() {
        let config = ClientConfig::default().with_base_url("ftp://example.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_args() {
        let args = CliArgs::try_parse_from([
            "eservice",
            "--base-url",
            "http://10.0.0.5:8080/",
            "--session-file",
            "/tmp/eservice/session.json",
            "--page",
            "/eservice/dede",
            "get",
            "/api/v1/licenses/my",
            "-q",
            "page=2",
        ])
        .unwrap();

        let config = Config::from_args(args).unwrap();
        assert_eq!(config.client.base_url, "http://10.0.0.5:8080");
        assert_eq!(config.session_file, PathBuf::from("/tmp/eservice/session.json"));
        assert_eq!(config.current_page, "/eservice/dede");
        assert_eq!(
            config.command,
            Command::Get {
                path: "/api/v1/licenses/my".to_string(),
                query: vec![("page".to_string(), "2".to_string())],
            }
        );
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(CliArgs::try_parse_from(["eservice"]).is_err());
    }
}

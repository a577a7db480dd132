use anyhow::{Context, Result};
use dialoguer::Password;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use eservice_client::auth::{FileStore, Session};
use eservice_client::config::{Command, Config};
use eservice_client::http_client::EServiceClient;
use eservice_client::models::{PageQuery, RequestOptions};
use eservice_client::navigation::MemoryNavigator;
use eservice_client::upload::UploadPayload;
use eservice_client::ApiEnvelope;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level; RUST_LOG wins when set
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!(
        base_url = %config.client.base_url,
        session_file = %config.session_file.display(),
        page = %config.current_page,
        "Configuration loaded"
    );

    let store = FileStore::open(&config.session_file)?;
    let session = Session::new(Arc::new(store));
    let navigator = Arc::new(MemoryNavigator::new(config.current_page.clone()));
    let client = EServiceClient::new(&config.client, session, navigator.clone())?;

    let outcome = run(&client, config.command.clone()).await;

    for target in navigator.redirects() {
        eprintln!("Session expired, redirected to {}", target);
    }

    outcome
}

async fn run(client: &EServiceClient, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => Password::new()
                    .with_prompt(format!("Password for {}", email))
                    .interact()
                    .context("Failed to read password")?,
            };
            let user = client.login(&email, &password).await?;
            let capability = user.capability();
            println!(
                "Logged in as {} ({}), landing page {}",
                user.display_name(),
                capability,
                capability.landing_path()
            );
        }
        Command::Logout => {
            client.logout().await?;
            println!("Logged out");
        }
        Command::Whoami => match client.session().user() {
            Some(user) => {
                println!("{} ({})", user.display_name(), user.capability());
                print_json(&user)?;
            }
            None if client.session().is_authenticated() => {
                println!("Authenticated, but no user record is cached");
            }
            None => println!("Not logged in"),
        },
        Command::Get { path, query } => {
            let options = query
                .into_iter()
                .fold(RequestOptions::new(), |options, (key, value)| {
                    options.query(key, value)
                });
            let envelope: ApiEnvelope = client.get_with(&path, options).await?;
            print_json(&envelope)?;
        }
        Command::Post { path, data } => {
            let body: Value = match data {
                Some(data) => serde_json::from_str(&data).context("--data is not valid JSON")?,
                None => Value::Object(Default::default()),
            };
            let envelope: ApiEnvelope = client.post(&path, &body).await?;
            print_json(&envelope)?;
        }
        Command::Upload {
            path,
            file,
            field,
            mime,
        } => {
            let payload = read_upload(&file, field, mime).await?;
            let envelope: ApiEnvelope = client.upload(&path, payload).await?;
            eprintln!();
            print_json(&envelope)?;
        }
        Command::Licenses { page, limit } => {
            let envelope = client
                .my_license_requests(PageQuery::new(page, limit))
                .await?;
            print_json(&envelope)?;
        }
        Command::Notifications { page, limit } => {
            let envelope = client.notifications(PageQuery::new(page, limit)).await?;
            print_json(&envelope)?;
        }
    }
    Ok(())
}

/// Load a file and attach a progress line on stderr
async fn read_upload(file: &Path, field: String, mime: Option<String>) -> Result<UploadPayload> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let mut payload = UploadPayload::new(file_name, data)
        .field_name(field)
        .on_progress(|percent| eprint!("\rUploading... {:>3}%", percent));
    if let Some(mime) = mime {
        payload = payload.mime_type(mime);
    }
    Ok(payload)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

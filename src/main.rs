//! CLI entry point for the mxmedia tool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use mxmedia_core::{Client, ClientConfig, ContentUri};
use tracing::{debug, info};

mod app_config;
mod cli;

use app_config::{FileConfig, load_file_config};
use cli::{Args, Command, content_type_for_path};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let file_config = load_file_config(args.config.as_deref())?;
    debug!(?file_config, "config file loaded");

    let client = Client::with_config(build_client_config(&args, &file_config)?)?;
    info!(homeserver = %client.config().homeserver(), "mxmedia starting");

    let user = args.user.as_deref().or(file_config.user.as_deref());
    if let Some(user) = user {
        let Some(password) = args.password.as_deref() else {
            bail!("--password (or MXMEDIA_PASSWORD) is required when logging in as '{user}'");
        };
        let login = client
            .login_async(user, password)
            .await
            .with_context(|| format!("Login failed for '{user}'"))?;
        info!(user_id = %login.user_id, "logged in");
    }

    let outcome = run_command(&client, args.command).await;
    client.shutdown().await;
    outcome
}

fn build_client_config(args: &Args, file_config: &FileConfig) -> Result<ClientConfig> {
    let homeserver = args
        .homeserver
        .as_deref()
        .or(file_config.homeserver.as_deref())
        .unwrap_or("localhost");

    let mut config = ClientConfig::new(homeserver)?;
    if let Some(secs) = file_config.connect_timeout_secs {
        config = config.with_connect_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = file_config.request_timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    let max_in_flight = args
        .max_in_flight
        .map(usize::from)
        .or(file_config
            .max_in_flight
            .and_then(|value| usize::try_from(value).ok()));
    if let Some(max_in_flight) = max_in_flight {
        config = config.with_max_in_flight(max_in_flight);
    }

    let authenticated_downloads =
        args.authenticated_downloads || file_config.authenticated_downloads.unwrap_or(false);
    config = config.with_authenticated_downloads(authenticated_downloads);

    config.validate()?;
    Ok(config)
}

async fn run_command(client: &Client, command: Command) -> Result<()> {
    match command {
        Command::Upload {
            file,
            content_type,
            filename,
        } => {
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read '{}'", file.display()))?;
            let content_type = content_type
                .unwrap_or_else(|| content_type_for_path(&file).to_string());
            let filename = filename.unwrap_or_else(|| {
                file.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

            let uri = client
                .upload_async(content, &content_type, &filename)
                .await
                .with_context(|| format!("Upload of '{}' failed", file.display()))?;
            println!("{uri}");
        }
        Command::Download {
            target,
            media_id,
            output,
        } => {
            let uri = match media_id {
                Some(media_id) => ContentUri::new(target, media_id)?,
                None => ContentUri::parse(&target)?,
            };
            let media = client
                .download_async(uri.authority(), uri.media_id())
                .await
                .with_context(|| format!("Download of '{uri}' failed"))?;

            let path = output.unwrap_or_else(|| {
                default_output_path(media.filename.as_deref(), uri.media_id())
            });
            tokio::fs::write(&path, &media.content)
                .await
                .with_context(|| format!("Failed to write '{}'", path.display()))?;

            info!(path = %path.display(), bytes = media.content.len(), "media saved");
            println!("content_type: {}", media.content_type);
            println!("filename: {}", media.filename.as_deref().unwrap_or("-"));
            println!("saved: {}", path.display());
        }
    }
    Ok(())
}

/// Output path for a download: the stored filename stripped to its last
/// component, falling back to the media id.
fn default_output_path(filename: Option<&str>, media_id: &str) -> PathBuf {
    filename
        .and_then(|name| Path::new(name).file_name())
        .map_or_else(|| PathBuf::from(media_id), PathBuf::from)
}

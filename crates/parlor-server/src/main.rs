//! parlor-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and serves the game API over HTTP.
//!
//! # Registering users
//!
//! The user directory lives in the same database. To add a user:
//!
//! ```text
//! parlor-server add-user alice
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use parlor_core::{ids::UserId, lobby::Lobby};
use parlor_server::{ServerConfig, sweeper};
use parlor_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Parlor game server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Register a user in the directory and print its id.
  AddUser {
    username: String,
    /// Refuse game invitations for this user.
    #[arg(long)]
    no_messages: bool,
  },
  /// Delete a user's invitations, games and moves.
  PurgeUser { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PARLOR"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Build application state.
  let lobby = Arc::new(Lobby::new(store.clone(), store.clone(), server_cfg.lobby_config()));

  match cli.command {
    Some(Command::AddUser { username, no_messages }) => {
      let id = store
        .add_user(&username, !no_messages)
        .await
        .with_context(|| format!("failed to add user {username:?}"))?;
      println!("{id}");
      return Ok(());
    }
    Some(Command::PurgeUser { id }) => {
      let summary = lobby
        .purge_user(UserId(id))
        .await
        .with_context(|| format!("failed to purge user {id}"))?;
      println!(
        "removed {} invitations, {} games, {} moves",
        summary.invitations, summary.sessions, summary.moves
      );
      return Ok(());
    }
    None => {}
  }

  // Start the forfeit sweeper.
  if let Some(secs) = server_cfg.forfeit_after_secs {
    let idle = i64::try_from(secs)
      .ok()
      .and_then(TimeDelta::try_seconds)
      .context("forfeit_after_secs is out of range")?;
    let every = Duration::from_secs(server_cfg.sweep_interval_secs.max(1));
    tracing::info!(idle_secs = secs, every_secs = every.as_secs(), "forfeit sweeper enabled");
    tokio::spawn(sweeper::run(lobby.clone(), idle, every));
  }

  // Serve.
  let app = parlor_server::router(lobby);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

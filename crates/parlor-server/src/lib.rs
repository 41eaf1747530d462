//! HTTP server wiring for Parlor: configuration, the top-level router and
//! the inactivity sweeper.

pub mod sweeper;

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, routing::get};
use parlor_core::{
  lobby::{ColorAssignment, Lobby, LobbyConfig},
  store::{Directory, GameStore},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PARLOR_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  #[serde(default)]
  pub colors:              ColorAssignment,
  /// Idle time after which an unfinished game is forfeited. Unset disables
  /// the sweeper.
  #[serde(default)]
  pub forfeit_after_secs:  Option<u64>,
  #[serde(default = "default_sweep_interval")]
  pub sweep_interval_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("parlor.db") }

fn default_sweep_interval() -> u64 { 60 }

impl ServerConfig {
  pub fn lobby_config(&self) -> LobbyConfig { LobbyConfig { colors: self.colors } }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: `/health` plus the game API under `/api`.
pub fn router<S, D>(lobby: Arc<Lobby<S, D>>) -> Router
where
  S: GameStore + 'static,
  D: Directory + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", parlor_api::api_router(lobby))
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{body::Body, http::{Request, StatusCode}};
  use parlor_core::memory::MemoryStore;
  use tower::ServiceExt as _;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = parse("");
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.store_path, PathBuf::from("parlor.db"));
    assert_eq!(cfg.colors, ColorAssignment::Random);
    assert_eq!(cfg.forfeit_after_secs, None);
    assert_eq!(cfg.sweep_interval_secs, 60);
  }

  #[test]
  fn config_overrides_apply() {
    let cfg = parse(
      r#"
        port = 9000
        colors = "sender_white"
        forfeit_after_secs = 604800
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.lobby_config().colors, ColorAssignment::SenderWhite);
    assert_eq!(cfg.forfeit_after_secs, Some(604_800));
  }

  #[tokio::test]
  async fn health_and_api_are_mounted() {
    let store = MemoryStore::new();
    let app = router(Arc::new(Lobby::new(store.clone(), store, LobbyConfig::default())));

    let resp = app
      .clone()
      .oneshot(Request::get("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
      .oneshot(
        Request::get("/api/invitations/pending-count")
          .header(parlor_api::USER_ID_HEADER, "1")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }
}

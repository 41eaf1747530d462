//! Handlers for `/games` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/games` | The caller's games; `?active=true` hides finished ones |
//! | `GET`  | `/games/{id}` | Current state |
//! | `GET`  | `/games/{id}/moves` | Move log, oldest first |
//! | `POST` | `/games/{id}/moves` | Body: `{"from":"e2","to":"e4","promotion":null}` |
//! | `GET`  | `/games/{id}/legal-moves` | Coordinate notation, e.g. `e7e8q` |
//! | `POST` | `/games/{id}/resign` | Only on your own turn |
//! | `GET`  | `/games/{id}/events` | Server-sent `game_state` events |
//!
//! Everything under `/games/{id}` is for the game's two players only.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  response::sse::{Event, KeepAlive, Sse},
};
use parlor_core::{
  engine::{PieceKind, Square},
  ids::GameId,
  lobby::Lobby,
  moves::{MoveRecord, MoveSpec},
  session::GameSession,
  store::{Directory, GameStore},
};
use serde::Deserialize;
use tokio_stream::{
  Stream, StreamExt as _,
  wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};

use crate::{actor::Actor, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub active: bool,
}

/// `GET /games[?active=true]`
pub async fn list<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<GameSession>>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  Ok(Json(lobby.list_sessions(user, params.active).await?))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /games/{id}`
pub async fn get_one<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
  Path(id): Path<GameId>,
) -> Result<Json<GameSession>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  Ok(Json(lobby.get_session_for(id, user).await?))
}

/// `GET /games/{id}/moves`
pub async fn history<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
  Path(id): Path<GameId>,
) -> Result<Json<Vec<MoveRecord>>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  Ok(Json(lobby.move_history(id, user).await?))
}

/// `GET /games/{id}/legal-moves`
pub async fn legal_moves<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
  Path(id): Path<GameId>,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  Ok(Json(lobby.legal_moves(id, user).await?))
}

// ─── Moves ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PlayBody {
  pub from:      Square,
  pub to:        Square,
  #[serde(default)]
  pub promotion: Option<PieceKind>,
}

/// `POST /games/{id}/moves`, body: `{"from":"e2","to":"e4"}`
pub async fn play<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
  Path(id): Path<GameId>,
  Json(body): Json<PlayBody>,
) -> Result<Json<GameSession>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  let spec = MoveSpec::Play { from: body.from, to: body.to, promotion: body.promotion };
  Ok(Json(lobby.apply_move(id, user, spec).await?))
}

/// `POST /games/{id}/resign`
pub async fn resign<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
  Path(id): Path<GameId>,
) -> Result<Json<GameSession>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  Ok(Json(lobby.apply_move(id, user, MoveSpec::Resign).await?))
}

// ─── Live updates ────────────────────────────────────────────────────────────

/// `GET /games/{id}/events`
///
/// One `game_state` event carrying the full session for the current state,
/// then one per committed move. The stream ends after the game does.
pub async fn events<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
  Path(id): Path<GameId>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  let feed = lobby.watch(id, user).await?;

  // Every event is a full snapshot, so a lagging watcher just skips ahead.
  let updates = BroadcastStream::new(feed.updates).filter_map(move |update| match update {
    Ok(session) => Some(session),
    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
      tracing::debug!(game_id = %id, skipped, "watcher lagged");
      None
    }
  });
  let stream = tokio_stream::once(feed.current)
    .chain(updates)
    .map(|session| Event::default().event("game_state").json_data(&session));

  Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

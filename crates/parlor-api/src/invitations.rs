//! Handlers for `/invitations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/invitations` | Optional `?status=pending\|accepted\|declined` |
//! | `POST` | `/invitations` | Body: `{"recipient_id":2,"game_type":"chess"}` |
//! | `GET`  | `/invitations/pending-count` | Invitations awaiting the caller |
//! | `GET`  | `/invitations/{id}` | Participants only |
//! | `POST` | `/invitations/{id}/accept` | Recipient only; returns the new game |
//! | `POST` | `/invitations/{id}/decline` | Recipient only |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use parlor_core::{
  Error as LobbyError,
  game::GameKind,
  ids::{GameId, UserId},
  invitation::{Invitation, InvitationStatus},
  lobby::{InvitationResponse, Lobby},
  store::{Directory, GameStore},
};
use serde::{Deserialize, Serialize};

use crate::{actor::Actor, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<InvitationStatus>,
}

/// `GET /invitations[?status=<status>]`
pub async fn list<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Invitation>>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  Ok(Json(lobby.list_invitations(user, params.status).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub recipient_id: UserId,
  /// Parsed leniently so unknown games get a precise error.
  pub game_type:    String,
}

/// `POST /invitations`, body: `{"recipient_id":2,"game_type":"chess"}`
pub async fn create<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(sender): Actor,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GameStore,
  D: Directory,
{
  let game_type: GameKind = body.game_type.parse()?;
  let invitation = lobby.create_invitation(sender, body.recipient_id, game_type).await?;
  Ok((StatusCode::CREATED, Json(invitation)))
}

// ─── Pending count ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PendingCount {
  pub count: usize,
}

/// `GET /invitations/pending-count`
pub async fn pending_count<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
) -> Result<Json<PendingCount>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  let count = lobby.pending_invite_count(user).await?;
  Ok(Json(PendingCount { count }))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /invitations/{id}`
pub async fn get_one<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
  Path(id): Path<GameId>,
) -> Result<Json<Invitation>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  let invitation = lobby.get_invitation(id).await?;
  if !invitation.involves(user) {
    return Err(LobbyError::Unauthorized(format!("invitation {id} is not yours")).into());
  }
  Ok(Json(invitation))
}

// ─── Respond ─────────────────────────────────────────────────────────────────

/// `POST /invitations/{id}/accept`
pub async fn accept<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
  Path(id): Path<GameId>,
) -> Result<Json<InvitationResponse>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  Ok(Json(lobby.respond_to_invitation(id, user, true).await?))
}

/// `POST /invitations/{id}/decline`
pub async fn decline<S, D>(
  State(lobby): State<Arc<Lobby<S, D>>>,
  Actor(user): Actor,
  Path(id): Path<GameId>,
) -> Result<Json<InvitationResponse>, ApiError>
where
  S: GameStore,
  D: Directory,
{
  Ok(Json(lobby.respond_to_invitation(id, user, false).await?))
}

//! The `GameStore` and `Directory` traits.
//!
//! Storage backends (e.g. `parlor-store-sqlite`, or [`MemoryStore`] in this
//! crate) implement both. The [`Lobby`] depends on these abstractions, not on
//! any concrete backend.
//!
//! [`MemoryStore`]: crate::memory::MemoryStore
//! [`Lobby`]: crate::lobby::Lobby

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  ids::{GameId, UserId},
  invitation::{Invitation, InvitationQuery, InvitationStatus},
  moves::MoveRecord,
  session::GameSession,
};

/// Rows removed by [`GameStore::purge_user`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeSummary {
  pub invitations: u64,
  pub sessions:    u64,
  pub moves:       u64,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Persistence for invitations, sessions and move logs.
///
/// The two write paths that race in practice are expressed as guarded
/// operations that report whether they applied, so callers never need to
/// read-then-write:
///
/// - [`insert_invitation`](Self::insert_invitation) refuses a second pending
///   invitation between the same pair.
/// - [`resolve_invitation`](Self::resolve_invitation) only moves a `pending`
///   invitation, and inserts the session in the same atomic step.
/// - [`commit_move`](Self::commit_move) only applies when the stored session
///   still has the move count the new move was computed against, and writes
///   the session update and the log entry together.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
///
/// Backend errors convert into [`crate::Error`]; a row that no longer decodes
/// should become [`Error::CorruptState`](crate::Error::CorruptState).
pub trait GameStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Invitations ───────────────────────────────────────────────────────

  /// Persist a new pending invitation unless one for the same game type is
  /// already pending between the two users, in either direction.
  ///
  /// The check and the insert are one atomic step. Returns the blocking
  /// invitation, having written nothing, when there is one. Fails if the game
  /// id is taken.
  fn insert_invitation(
    &self,
    invitation: Invitation,
  ) -> impl Future<Output = Result<Option<Invitation>, Self::Error>> + Send + '_;

  fn get_invitation(
    &self,
    game_id: GameId,
  ) -> impl Future<Output = Result<Option<Invitation>, Self::Error>> + Send + '_;

  /// Invitations matching `query`, newest first.
  fn list_invitations(
    &self,
    query: InvitationQuery,
  ) -> impl Future<Output = Result<Vec<Invitation>, Self::Error>> + Send + '_;

  /// Move a pending invitation to `status` and, when given, insert `session`
  /// atomically with it.
  ///
  /// Returns `false` without writing anything if the invitation is no longer
  /// pending.
  fn resolve_invitation(
    &self,
    game_id: GameId,
    status: InvitationStatus,
    responded_at: DateTime<Utc>,
    session: Option<GameSession>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn get_session(
    &self,
    game_id: GameId,
  ) -> impl Future<Output = Result<Option<GameSession>, Self::Error>> + Send + '_;

  /// Sessions `user` plays in, most recently updated first.
  fn list_sessions(
    &self,
    user: UserId,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<GameSession>, Self::Error>> + Send + '_;

  /// Unfinished sessions last updated strictly before `cutoff`.
  fn stale_sessions(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<GameSession>, Self::Error>> + Send + '_;

  /// Write `session` and append `record` as one atomic unit.
  ///
  /// Applies only if the stored session is unfinished and its move count is
  /// `record.move_number - 1`; otherwise returns `false` and writes nothing.
  fn commit_move(
    &self,
    session: GameSession,
    record: MoveRecord,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Move log ──────────────────────────────────────────────────────────

  /// The move log of a session ordered by move number ascending.
  fn move_history(
    &self,
    game_id: GameId,
  ) -> impl Future<Output = Result<Vec<MoveRecord>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Remove every invitation, session and move involving `user`.
  fn purge_user(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<PurgeSummary, Self::Error>> + Send + '_;
}

// ─── Directory ───────────────────────────────────────────────────────────────

/// The external user directory and its messaging gate, as seen by the lobby.
pub trait Directory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn user_exists(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Whether `from` may contact `to`; inviting to a game counts as contact.
  fn can_message(
    &self,
    from: UserId,
    to: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

//! [`MemoryStore`]: an in-process implementation of [`GameStore`] and
//! [`Directory`].
//!
//! Everything lives behind one mutex, so each trait method is trivially
//! atomic. Useful for tests and for embedding the lobby without a database.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
  Error,
  ids::{GameId, UserId},
  invitation::{Invitation, InvitationQuery, InvitationStatus},
  moves::MoveRecord,
  session::GameSession,
  store::{Directory, GameStore, PurgeSummary},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("game id already in use: {0}")]
  DuplicateGameId(GameId),
}

impl From<MemoryError> for Error {
  fn from(err: MemoryError) -> Self { Error::storage(err) }
}

#[derive(Default)]
struct Inner {
  /// `user -> can_message`
  users:       HashMap<UserId, bool>,
  /// Insertion order doubles as creation order.
  invitations: Vec<Invitation>,
  sessions:    HashMap<GameId, GameSession>,
  moves:       HashMap<GameId, Vec<MoveRecord>>,
}

/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Register a user in the directory.
  pub fn add_user(&self, user: UserId, can_message: bool) {
    self.lock().users.insert(user, can_message);
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl GameStore for MemoryStore {
  type Error = MemoryError;

  async fn insert_invitation(
    &self,
    invitation: Invitation,
  ) -> Result<Option<Invitation>, MemoryError> {
    let mut inner = self.lock();
    if inner.invitations.iter().any(|i| i.game_id == invitation.game_id) {
      return Err(MemoryError::DuplicateGameId(invitation.game_id));
    }
    let (a, b) = (invitation.sender_id, invitation.recipient_id);
    let pending = inner.invitations.iter().find(|i| {
      i.status == InvitationStatus::Pending
        && i.game_type == invitation.game_type
        && i.involves(a)
        && i.involves(b)
    });
    if let Some(existing) = pending {
      return Ok(Some(existing.clone()));
    }
    inner.invitations.push(invitation);
    Ok(None)
  }

  async fn get_invitation(&self, game_id: GameId) -> Result<Option<Invitation>, MemoryError> {
    Ok(self.lock().invitations.iter().find(|i| i.game_id == game_id).cloned())
  }

  async fn list_invitations(&self, query: InvitationQuery) -> Result<Vec<Invitation>, MemoryError> {
    Ok(
      self
        .lock()
        .invitations
        .iter()
        .rev()
        .filter(|i| i.involves(query.user))
        .filter(|i| query.status.is_none_or(|s| i.status == s))
        .cloned()
        .collect(),
    )
  }

  async fn resolve_invitation(
    &self,
    game_id: GameId,
    status: InvitationStatus,
    responded_at: DateTime<Utc>,
    session: Option<GameSession>,
  ) -> Result<bool, MemoryError> {
    let mut inner = self.lock();
    let Some(invitation) = inner
      .invitations
      .iter_mut()
      .find(|i| i.game_id == game_id && i.status == InvitationStatus::Pending)
    else {
      return Ok(false);
    };
    invitation.status = status;
    invitation.responded_at = Some(responded_at);

    if let Some(session) = session {
      inner.sessions.insert(session.game_id, session);
    }
    Ok(true)
  }

  async fn get_session(&self, game_id: GameId) -> Result<Option<GameSession>, MemoryError> {
    Ok(self.lock().sessions.get(&game_id).cloned())
  }

  async fn list_sessions(
    &self,
    user: UserId,
    active_only: bool,
  ) -> Result<Vec<GameSession>, MemoryError> {
    let mut out: Vec<GameSession> = self
      .lock()
      .sessions
      .values()
      .filter(|s| s.side_of(user).is_some())
      .filter(|s| !active_only || !s.game_over)
      .cloned()
      .collect();
    out.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    Ok(out)
  }

  async fn stale_sessions(&self, cutoff: DateTime<Utc>) -> Result<Vec<GameSession>, MemoryError> {
    Ok(
      self
        .lock()
        .sessions
        .values()
        .filter(|s| !s.game_over && s.last_updated < cutoff)
        .cloned()
        .collect(),
    )
  }

  async fn commit_move(
    &self,
    session: GameSession,
    record: MoveRecord,
  ) -> Result<bool, MemoryError> {
    let mut inner = self.lock();
    let applies = inner.sessions.get(&session.game_id).is_some_and(|stored| {
      !stored.game_over && stored.move_count + 1 == record.move_number
    });
    if !applies {
      return Ok(false);
    }

    inner.moves.entry(session.game_id).or_default().push(record);
    inner.sessions.insert(session.game_id, session);
    Ok(true)
  }

  async fn move_history(&self, game_id: GameId) -> Result<Vec<MoveRecord>, MemoryError> {
    Ok(self.lock().moves.get(&game_id).cloned().unwrap_or_default())
  }

  async fn purge_user(&self, user: UserId) -> Result<PurgeSummary, MemoryError> {
    let mut inner = self.lock();
    let mut summary = PurgeSummary::default();

    let before = inner.invitations.len();
    inner.invitations.retain(|i| !i.involves(user));
    summary.invitations = (before - inner.invitations.len()) as u64;

    let doomed: Vec<GameId> = inner
      .sessions
      .values()
      .filter(|s| s.side_of(user).is_some())
      .map(|s| s.game_id)
      .collect();
    for id in doomed {
      inner.sessions.remove(&id);
      summary.sessions += 1;
      summary.moves += inner.moves.remove(&id).map_or(0, |m| m.len() as u64);
    }

    inner.users.remove(&user);
    Ok(summary)
  }
}

impl Directory for MemoryStore {
  type Error = MemoryError;

  async fn user_exists(&self, user: UserId) -> Result<bool, MemoryError> {
    Ok(self.lock().users.contains_key(&user))
  }

  async fn can_message(&self, from: UserId, to: UserId) -> Result<bool, MemoryError> {
    let inner = self.lock();
    let allowed = |u: UserId| inner.users.get(&u).copied().unwrap_or(false);
    Ok(allowed(from) && allowed(to))
  }
}

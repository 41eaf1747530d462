//! [`Lobby`], the service that runs invitations and games.
//!
//! The lobby owns the lifecycle rules; the store only persists. Every move on
//! a session runs validate-then-commit under that session's lock, and the
//! commit itself is guarded by the move count it was computed against, so a
//! second process sharing the database cannot slip a move in between.
//!
//! Game state is readable by the two players only. Each commit made through
//! the lobby is also pushed to that game's watchers (see [`Lobby::watch`]).

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, broadcast};

use crate::{
  Error, Result,
  engine::{self, Termination},
  game::GameKind,
  ids::{GameId, UserId},
  invitation::{Invitation, InvitationQuery, InvitationStatus},
  moves::{MoveRecord, MoveSpec},
  session::GameSession,
  store::{Directory, GameStore, PurgeSummary},
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Who plays white when an invitation is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorAssignment {
  /// Coin flip.
  #[default]
  Random,
  SenderWhite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LobbyConfig {
  #[serde(default)]
  pub colors: ColorAssignment,
}

/// What answering an invitation produced. `session` is set on acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationResponse {
  pub invitation: Invitation,
  pub session:    Option<GameSession>,
}

// ─── Session locks ───────────────────────────────────────────────────────────

/// One async mutex per session, created on demand and dropped once idle.
#[derive(Default)]
struct SessionLocks {
  locks: Mutex<HashMap<GameId, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
  async fn acquire(&self, game_id: GameId) -> OwnedMutexGuard<()> {
    let lock = {
      let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
      // Only the map holds an idle lock.
      locks.retain(|_, l| Arc::strong_count(l) > 1);
      locks.entry(game_id).or_default().clone()
    };
    lock.lock_owned().await
  }
}

// ─── Live feeds ──────────────────────────────────────────────────────────────

/// Updates buffered per watcher before it starts to lag.
const FEED_CAPACITY: usize = 16;

/// A watcher's view of one game: the state when it subscribed, then every
/// committed change. `updates` closes after the update that ends the game.
pub struct GameFeed {
  pub current: GameSession,
  pub updates: broadcast::Receiver<GameSession>,
}

/// One broadcast channel per watched game, dropped once nobody listens.
#[derive(Default)]
struct GameFeeds {
  senders: Mutex<HashMap<GameId, broadcast::Sender<GameSession>>>,
}

impl GameFeeds {
  fn subscribe(&self, game_id: GameId) -> broadcast::Receiver<GameSession> {
    let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
    senders.retain(|_, tx| tx.receiver_count() > 0);
    senders
      .entry(game_id)
      .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
      .subscribe()
  }

  fn publish(&self, session: &GameSession) {
    let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
    let sender = if session.game_over {
      senders.remove(&session.game_id)
    } else {
      senders.get(&session.game_id).cloned()
    };
    // A send only fails when every watcher has gone.
    if let Some(tx) = sender {
      let _ = tx.send(session.clone());
    }
  }
}

// ─── Lobby ───────────────────────────────────────────────────────────────────

pub struct Lobby<S, D> {
  store:     S,
  directory: D,
  config:    LobbyConfig,
  locks:     SessionLocks,
  feeds:     GameFeeds,
}

impl<S, D> Lobby<S, D>
where
  S: GameStore,
  D: Directory,
{
  pub fn new(store: S, directory: D, config: LobbyConfig) -> Self {
    Self {
      store,
      directory,
      config,
      locks: SessionLocks::default(),
      feeds: GameFeeds::default(),
    }
  }

  pub fn store(&self) -> &S { &self.store }

  // ── Invitations ───────────────────────────────────────────────────────

  /// Propose a game from `sender` to `recipient`, minting its game id.
  pub async fn create_invitation(
    &self,
    sender: UserId,
    recipient: UserId,
    game_type: GameKind,
  ) -> Result<Invitation> {
    if sender == recipient {
      return Err(Error::InvalidParticipant("you cannot invite yourself".into()));
    }
    for user in [sender, recipient] {
      if !self.directory.user_exists(user).await.map_err(Error::storage)? {
        return Err(Error::InvalidParticipant(format!("user {user} does not exist")));
      }
    }
    if !self.directory.can_message(sender, recipient).await.map_err(Error::storage)? {
      return Err(Error::InvalidParticipant(format!(
        "user {sender} may not contact user {recipient}"
      )));
    }

    let invitation = Invitation::new(sender, recipient, game_type);
    if let Some(existing) = self
      .store
      .insert_invitation(invitation.clone())
      .await
      .map_err(Into::<Error>::into)?
    {
      return Err(Error::InvalidState(format!(
        "a pending {game_type} invitation already exists ({})",
        existing.game_id
      )));
    }

    tracing::info!(
      game_id = %invitation.game_id,
      %sender,
      %recipient,
      %game_type,
      "invitation created"
    );
    Ok(invitation)
  }

  /// Accept or decline a pending invitation. Only the recipient may answer,
  /// and only once.
  pub async fn respond_to_invitation(
    &self,
    game_id: GameId,
    responder: UserId,
    accept: bool,
  ) -> Result<InvitationResponse> {
    let mut invitation = self.get_invitation(game_id).await?;
    if invitation.recipient_id != responder {
      return Err(Error::Unauthorized(format!(
        "only the recipient may answer invitation {game_id}"
      )));
    }
    if invitation.status != InvitationStatus::Pending {
      return Err(already_answered(&invitation));
    }

    let now = Utc::now();
    let (status, session) = if accept {
      let (white, black) = self.assign_colors(&invitation);
      (InvitationStatus::Accepted, Some(GameSession::start(&invitation, white, black, now)))
    } else {
      (InvitationStatus::Declined, None)
    };

    let applied = self
      .store
      .resolve_invitation(game_id, status, now, session.clone())
      .await
      .map_err(Into::<Error>::into)?;
    if !applied {
      tracing::warn!(%game_id, "invitation answered concurrently");
      return Err(Error::InvalidState(format!("invitation {game_id} was already answered")));
    }

    invitation.status = status;
    invitation.responded_at = Some(now);
    tracing::info!(%game_id, %responder, %status, "invitation answered");
    Ok(InvitationResponse { invitation, session })
  }

  pub async fn get_invitation(&self, game_id: GameId) -> Result<Invitation> {
    self
      .store
      .get_invitation(game_id)
      .await
      .map_err(Into::<Error>::into)?
      .ok_or_else(|| Error::NotFound(format!("invitation {game_id}")))
  }

  /// Invitations `user` sent or received, newest first.
  pub async fn list_invitations(
    &self,
    user: UserId,
    status: Option<InvitationStatus>,
  ) -> Result<Vec<Invitation>> {
    self
      .store
      .list_invitations(InvitationQuery { user, status })
      .await
      .map_err(Into::into)
  }

  /// Pending invitations waiting on `user`'s answer.
  pub async fn pending_invite_count(&self, user: UserId) -> Result<usize> {
    let pending = self.list_invitations(user, Some(InvitationStatus::Pending)).await?;
    Ok(pending.iter().filter(|i| i.recipient_id == user).count())
  }

  // ── Sessions ──────────────────────────────────────────────────────────

  pub async fn get_session(&self, game_id: GameId) -> Result<GameSession> {
    self
      .store
      .get_session(game_id)
      .await
      .map_err(Into::<Error>::into)?
      .ok_or_else(|| Error::NotFound(format!("game {game_id}")))
  }

  /// A session as seen by `viewer`, who must be one of its players.
  pub async fn get_session_for(&self, game_id: GameId, viewer: UserId) -> Result<GameSession> {
    let session = self.get_session(game_id).await?;
    if session.side_of(viewer).is_none() {
      return Err(Error::Unauthorized(format!(
        "user {viewer} is not playing in game {game_id}"
      )));
    }
    Ok(session)
  }

  pub async fn list_sessions(&self, user: UserId, active_only: bool) -> Result<Vec<GameSession>> {
    self.store.list_sessions(user, active_only).await.map_err(Into::into)
  }

  /// Validate `spec` against the session and, if legal, commit the new state
  /// together with its move log entry.
  ///
  /// Nothing is written when any check fails.
  pub async fn apply_move(
    &self,
    game_id: GameId,
    player: UserId,
    spec: MoveSpec,
  ) -> Result<GameSession> {
    let _guard = self.locks.acquire(game_id).await;
    let session = self.get_session(game_id).await?;

    let side = session.side_of(player).ok_or_else(|| {
      Error::Unauthorized(format!("user {player} is not playing in game {game_id}"))
    })?;
    if session.game_over {
      return Err(Error::GameAlreadyOver(game_id));
    }
    if side != session.state.turn {
      return Err(Error::NotYourTurn);
    }

    let transition = match spec {
      MoveSpec::Play { from, to, promotion } => {
        engine::play(&session.state, from, to, promotion)?
      }
      MoveSpec::Resign => engine::concede(&session.state, Termination::Resignation),
    };

    let (next, record) = session.advance(transition, Utc::now());
    self.commit(next, record).await
  }

  /// The move log of a session, oldest first.
  pub async fn move_history(&self, game_id: GameId, viewer: UserId) -> Result<Vec<MoveRecord>> {
    self.get_session_for(game_id, viewer).await?;
    self.store.move_history(game_id).await.map_err(Into::into)
  }

  /// Legal moves for the side to move; empty once the game is over.
  pub async fn legal_moves(&self, game_id: GameId, viewer: UserId) -> Result<Vec<String>> {
    let session = self.get_session_for(game_id, viewer).await?;
    if session.game_over {
      return Ok(Vec::new());
    }
    engine::legal_moves(&session.state)
  }

  /// Subscribe `viewer` to a game's state changes.
  ///
  /// Only commits made through this lobby are pushed. A finished game yields
  /// its final state and an already closed channel.
  pub async fn watch(&self, game_id: GameId, viewer: UserId) -> Result<GameFeed> {
    // Held so no commit lands between the snapshot and the subscription.
    let _guard = self.locks.acquire(game_id).await;
    let current = self.get_session_for(game_id, viewer).await?;
    let updates = if current.game_over {
      broadcast::channel(1).1
    } else {
      self.feeds.subscribe(game_id)
    };
    tracing::debug!(%game_id, %viewer, "watcher subscribed");
    Ok(GameFeed { current, updates })
  }

  // ── Maintenance ───────────────────────────────────────────────────────

  /// Forfeit every unfinished game idle since before `cutoff` on behalf of
  /// the player to move. Returns the games that were ended.
  pub async fn forfeit_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<GameId>> {
    let candidates = self.store.stale_sessions(cutoff).await.map_err(Into::<Error>::into)?;
    let mut forfeited = Vec::new();

    for candidate in candidates {
      let game_id = candidate.game_id;
      let _guard = self.locks.acquire(game_id).await;

      // Re-read under the lock; a move may have landed since the scan.
      let stored = self.store.get_session(game_id).await.map_err(Into::<Error>::into)?;
      let Some(session) = stored else {
        continue;
      };
      if session.game_over || session.last_updated >= cutoff {
        continue;
      }

      let loser = session.to_move();
      let transition = engine::concede(&session.state, Termination::Forfeit);
      let (next, record) = session.advance(transition, Utc::now());
      match self.commit(next, record).await {
        Ok(_) => {
          tracing::info!(%game_id, %loser, "game forfeited for inactivity");
          forfeited.push(game_id);
        }
        Err(Error::InvalidState(_)) => continue,
        Err(e) => return Err(e),
      }
    }
    Ok(forfeited)
  }

  /// Remove everything involving `user`, for when the user is deleted.
  pub async fn purge_user(&self, user: UserId) -> Result<PurgeSummary> {
    let summary = self.store.purge_user(user).await.map_err(Into::<Error>::into)?;
    tracing::info!(
      %user,
      invitations = summary.invitations,
      sessions = summary.sessions,
      moves = summary.moves,
      "user purged from games"
    );
    Ok(summary)
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn commit(&self, next: GameSession, record: MoveRecord) -> Result<GameSession> {
    let game_id = next.game_id;
    let move_number = record.move_number;
    let player = record.player_id;

    let applied = self
      .store
      .commit_move(next.clone(), record)
      .await
      .map_err(Into::<Error>::into)?;
    if !applied {
      tracing::warn!(%game_id, move_number, "move lost a race with another writer");
      return Err(Error::InvalidState(format!(
        "game {game_id} changed while move {move_number} was being applied"
      )));
    }

    tracing::debug!(%game_id, move_number, %player, "move applied");
    self.feeds.publish(&next);
    if next.game_over {
      tracing::info!(
        %game_id,
        winner = ?next.winner_id,
        termination = ?next.termination,
        "game finished"
      );
    }
    Ok(next)
  }

  fn assign_colors(&self, invitation: &Invitation) -> (UserId, UserId) {
    let (sender, recipient) = (invitation.sender_id, invitation.recipient_id);
    match self.config.colors {
      ColorAssignment::SenderWhite => (sender, recipient),
      ColorAssignment::Random => {
        if OsRng.next_u32() & 1 == 0 { (sender, recipient) } else { (recipient, sender) }
      }
    }
  }
}

fn already_answered(invitation: &Invitation) -> Error {
  Error::InvalidState(format!(
    "invitation {} is already {}",
    invitation.game_id, invitation.status
  ))
}

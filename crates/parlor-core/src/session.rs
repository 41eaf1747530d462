//! Game sessions, the authoritative state of one game.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  engine::{ChessState, Side, Termination, Transition},
  game::GameKind,
  ids::{GameId, UserId},
  invitation::Invitation,
  moves::MoveRecord,
};

/// One game instance. Mutated only by applying validated moves.
///
/// Invariants: `state.turn` alternates with every applied ply, `move_count`
/// equals the length of the move log, and once `game_over` is set it never
/// clears. `winner_id` stays `None` for a drawn game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
  pub game_id:      GameId,
  pub game_type:    GameKind,
  pub white_id:     UserId,
  pub black_id:     UserId,
  pub state:        ChessState,
  pub move_count:   u32,
  pub game_over:    bool,
  pub winner_id:    Option<UserId>,
  pub termination:  Option<Termination>,
  pub created_at:   DateTime<Utc>,
  pub last_updated: DateTime<Utc>,
}

impl GameSession {
  /// Start the game an accepted invitation proposed.
  pub fn start(
    invitation: &Invitation,
    white_id: UserId,
    black_id: UserId,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      game_id: invitation.game_id,
      game_type: invitation.game_type,
      white_id,
      black_id,
      state: ChessState::initial(),
      move_count: 0,
      game_over: false,
      winner_id: None,
      termination: None,
      created_at: now,
      last_updated: now,
    }
  }

  pub fn side_of(&self, user: UserId) -> Option<Side> {
    if user == self.white_id {
      Some(Side::White)
    } else if user == self.black_id {
      Some(Side::Black)
    } else {
      None
    }
  }

  pub fn player(&self, side: Side) -> UserId {
    match side {
      Side::White => self.white_id,
      Side::Black => self.black_id,
    }
  }

  /// The player whose turn it is.
  pub fn to_move(&self) -> UserId { self.player(self.state.turn) }

  /// Fold a transition into a new session value plus the move log entry it
  /// produces. `self` is left untouched so a failed commit changes nothing.
  pub fn advance(&self, transition: Transition, now: DateTime<Utc>) -> (Self, MoveRecord) {
    let mover = self.to_move();
    let mut next = self.clone();
    next.state = transition.state;
    next.move_count += 1;
    next.last_updated = now;

    if let Some(outcome) = transition.outcome {
      next.game_over = true;
      next.winner_id = outcome.winner.map(|side| self.player(side));
      next.termination = Some(outcome.termination);
    }

    let record = MoveRecord {
      game_id:     self.game_id,
      move_number: next.move_count,
      player_id:   mover,
      data:        transition.data,
      recorded_at: now,
    };
    (next, record)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{engine, moves::MoveData};

  fn session() -> GameSession {
    let inv = Invitation::new(UserId(1), UserId(2), GameKind::Chess);
    GameSession::start(&inv, UserId(1), UserId(2), Utc::now())
  }

  #[test]
  fn start_reuses_invitation_id() {
    let inv = Invitation::new(UserId(1), UserId(2), GameKind::Chess);
    let s = GameSession::start(&inv, UserId(2), UserId(1), Utc::now());
    assert_eq!(s.game_id, inv.game_id);
    assert_eq!(s.white_id, UserId(2));
    assert_eq!(s.state.turn, Side::White);
    assert_eq!((s.state.white_captures, s.state.black_captures), (0, 0));
    assert!(!s.game_over);
  }

  #[test]
  fn sides_and_turns() {
    let s = session();
    assert_eq!(s.side_of(UserId(1)), Some(Side::White));
    assert_eq!(s.side_of(UserId(2)), Some(Side::Black));
    assert_eq!(s.side_of(UserId(9)), None);
    assert_eq!(s.to_move(), UserId(1));
  }

  #[test]
  fn advance_numbers_moves_and_leaves_original_alone() {
    let s = session();
    let t = engine::play(&s.state, "e2".parse().unwrap(), "e4".parse().unwrap(), None).unwrap();
    let (next, record) = s.advance(t, Utc::now());

    assert_eq!(s.move_count, 0);
    assert_eq!(next.move_count, 1);
    assert_eq!(record.move_number, 1);
    assert_eq!(record.player_id, UserId(1));
    assert_eq!(next.to_move(), UserId(2));
  }

  #[test]
  fn resignation_sets_winner_to_opponent() {
    let s = session();
    let t = engine::concede(&s.state, Termination::Resignation);
    let (next, record) = s.advance(t, Utc::now());

    assert!(next.game_over);
    assert_eq!(next.winner_id, Some(UserId(2)));
    assert_eq!(next.termination, Some(Termination::Resignation));
    assert_eq!(record.data, MoveData::Resign);
  }
}

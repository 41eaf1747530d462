//! The authoritative chess position of a session and how a game ends.

use std::str::FromStr as _;

use serde::{Deserialize, Serialize};

use super::board::{Board, CastlingRights, Side, Square};
use crate::{Error, Result, moves::MoveData};

// ─── Draw bookkeeping ────────────────────────────────────────────────────────

/// Counters behind the fifty-move and repetition rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawClock {
  /// Plies since the last pawn move or capture.
  pub halfmove:  u32,
  /// Full-move number; starts at 1 and increments after black moves.
  pub fullmove:  u32,
  /// Position keys seen since the last irreversible move, current last.
  pub positions: Vec<String>,
}

impl DrawClock {
  fn starting() -> Self {
    Self {
      halfmove:  0,
      fullmove:  1,
      positions: vec![position_key(&::chess::Board::default())],
    }
  }
}

/// Identifies a position for repetition purposes: placement, side to move,
/// castling and en-passant fields of the board's FEN.
pub fn position_key(board: &::chess::Board) -> String {
  board.to_string().split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

// ─── Termination ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
  Checkmate,
  Resignation,
  Forfeit,
  Stalemate,
  InsufficientMaterial,
  FiftyMoveRule,
  Repetition,
}

impl Termination {
  pub fn as_str(self) -> &'static str {
    match self {
      Termination::Checkmate => "checkmate",
      Termination::Resignation => "resignation",
      Termination::Forfeit => "forfeit",
      Termination::Stalemate => "stalemate",
      Termination::InsufficientMaterial => "insufficient_material",
      Termination::FiftyMoveRule => "fifty_move_rule",
      Termination::Repetition => "repetition",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "checkmate" => Termination::Checkmate,
      "resignation" => Termination::Resignation,
      "forfeit" => Termination::Forfeit,
      "stalemate" => Termination::Stalemate,
      "insufficient_material" => Termination::InsufficientMaterial,
      "fifty_move_rule" => Termination::FiftyMoveRule,
      "repetition" => Termination::Repetition,
      _ => return None,
    })
  }

  pub fn is_draw(self) -> bool {
    matches!(
      self,
      Termination::Stalemate
        | Termination::InsufficientMaterial
        | Termination::FiftyMoveRule
        | Termination::Repetition
    )
  }
}

/// How a finished game ended. `winner` is `None` for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
  pub winner:      Option<Side>,
  pub termination: Termination,
}

impl Outcome {
  pub fn win(side: Side, termination: Termination) -> Self {
    Self { winner: Some(side), termination }
  }

  pub fn draw(termination: Termination) -> Self { Self { winner: None, termination } }
}

// ─── Position ────────────────────────────────────────────────────────────────

/// Everything needed to continue a chess game from where it stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChessState {
  pub board:          Board,
  pub turn:           Side,
  /// Pieces white has taken.
  pub white_captures: u32,
  /// Pieces black has taken.
  pub black_captures: u32,
  pub castling:       CastlingRights,
  /// The square behind a pawn that just advanced two ranks.
  pub en_passant:     Option<Square>,
  pub last_move:      Option<MoveData>,
  pub clock:          DrawClock,
}

impl ChessState {
  /// Standard starting position, white to move, all castling rights.
  pub fn initial() -> Self {
    Self {
      board:          Board::standard(),
      turn:           Side::White,
      white_captures: 0,
      black_captures: 0,
      castling:       CastlingRights::ALL,
      en_passant:     None,
      last_move:      None,
      clock:          DrawClock::starting(),
    }
  }

  pub fn captures(&self, side: Side) -> u32 {
    match side {
      Side::White => self.white_captures,
      Side::Black => self.black_captures,
    }
  }

  pub fn fen(&self) -> String {
    let ep = self.en_passant.map(|sq| sq.to_string());
    format!(
      "{} {} {} {} {} {}",
      self.board.placement(),
      self.turn.marker(),
      self.castling.fen(),
      ep.as_deref().unwrap_or("-"),
      self.clock.halfmove,
      self.clock.fullmove,
    )
  }

  pub(crate) fn to_chess(&self) -> Result<::chess::Board> {
    let fen = self.fen();
    ::chess::Board::from_str(&fen)
      .map_err(|e| Error::CorruptState(format!("unplayable position {fen:?}: {e}")))
  }
}

impl Default for ChessState {
  fn default() -> Self { Self::initial() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn initial_state_renders_standard_fen() {
    assert_eq!(
      ChessState::initial().fen(),
      "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    );
  }

  #[test]
  fn initial_state_seeds_repetition_history() {
    let state = ChessState::initial();
    assert_eq!(state.clock.positions.len(), 1);
    assert_eq!(
      state.clock.positions[0],
      "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"
    );
    assert!(state.to_chess().is_ok());
  }

  #[test]
  fn termination_names_round_trip() {
    for t in [
      Termination::Checkmate,
      Termination::Resignation,
      Termination::Forfeit,
      Termination::Stalemate,
      Termination::InsufficientMaterial,
      Termination::FiftyMoveRule,
      Termination::Repetition,
    ] {
      assert_eq!(Termination::parse(t.as_str()), Some(t));
    }
    assert!(Termination::Stalemate.is_draw());
    assert!(!Termination::Forfeit.is_draw());
  }
}

//! Move requests and the append-only move log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  engine::{Piece, PieceKind, Square},
  ids::{GameId, UserId},
};

// ─── Requests ────────────────────────────────────────────────────────────────

/// What a player asks to do on their turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MoveSpec {
  Play {
    from:      Square,
    to:        Square,
    #[serde(default)]
    promotion: Option<PieceKind>,
  },
  Resign,
}

impl MoveSpec {
  pub fn play(from: Square, to: Square) -> Self {
    Self::Play { from, to, promotion: None }
  }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastleSide {
  Kingside,
  Queenside,
}

/// A board move as it was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedMove {
  pub from:       Square,
  pub to:         Square,
  pub piece:      Piece,
  pub captured:   Option<Piece>,
  /// The piece the pawn became, in the mover's colour.
  pub promotion:  Option<Piece>,
  pub castle:     Option<CastleSide>,
  /// The capture was en passant; `captured` is the pawn taken beside `to`.
  #[serde(default)]
  pub en_passant: bool,
  /// The move gives check.
  #[serde(default)]
  pub check:      bool,
}

/// The serialised payload of one ply (`move_data` / `last_move`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveData {
  Play(PlayedMove),
  Resign,
  /// Conceded on the player's behalf by the inactivity sweep.
  Forfeit,
}

// ─── Log ─────────────────────────────────────────────────────────────────────

/// One immutable entry of a session's move log.
///
/// `move_number` counts plies from 1, gapless per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
  pub game_id:     GameId,
  pub move_number: u32,
  pub player_id:   UserId,
  pub data:        MoveData,
  pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn move_spec_accepts_client_payloads() {
    let spec: MoveSpec =
      serde_json::from_str(r#"{"action":"play","from":"e2","to":"e4"}"#).unwrap();
    assert_eq!(spec, MoveSpec::play("e2".parse().unwrap(), "e4".parse().unwrap()));

    let spec: MoveSpec = serde_json::from_str(
      r#"{"action":"play","from":"a7","to":"a8","promotion":"knight"}"#,
    )
    .unwrap();
    assert!(matches!(spec, MoveSpec::Play { promotion: Some(PieceKind::Knight), .. }));

    let spec: MoveSpec = serde_json::from_str(r#"{"action":"resign"}"#).unwrap();
    assert_eq!(spec, MoveSpec::Resign);
  }

  #[test]
  fn move_data_is_tagged_by_kind() {
    let json = serde_json::to_value(MoveData::Forfeit).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "forfeit"}));

    let played = MoveData::Play(PlayedMove {
      from:       "e2".parse().unwrap(),
      to:         "e4".parse().unwrap(),
      piece:      Piece::try_from('P').unwrap(),
      captured:   None,
      promotion:  None,
      castle:     None,
      en_passant: false,
      check:      false,
    });
    let json = serde_json::to_value(&played).unwrap();
    assert_eq!(json["kind"], "play");
    assert_eq!(json["from"], "e2");
    assert_eq!(json["piece"], "P");
  }
}

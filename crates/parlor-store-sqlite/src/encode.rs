//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed nanosecond width, so
//! lexicographic order in SQL matches chronological order. Board, auxiliary
//! state, draw clock and move payloads are stored as compact JSON. UUIDs are
//! stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use parlor_core::{
  engine::{Board, CastlingRights, ChessState, DrawClock, Side, Square, Termination},
  game::GameKind,
  ids::{GameId, UserId},
  invitation::{Invitation, InvitationStatus},
  moves::{MoveData, MoveRecord},
  session::GameSession,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_game_id(id: GameId) -> String { id.0.hyphenated().to_string() }

pub fn decode_game_id(s: &str) -> Result<GameId> { Ok(GameId(Uuid::parse_str(s)?)) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_game_type(s: &str) -> Result<GameKind> {
  s.parse()
    .map_err(|_| Error::BadColumn { column: "game_type", value: s.to_owned() })
}

fn decode_status(s: &str) -> Result<InvitationStatus> {
  s.parse()
    .map_err(|_| Error::BadColumn { column: "status", value: s.to_owned() })
}

fn decode_turn(s: &str) -> Result<Side> {
  Side::from_marker(s).ok_or_else(|| Error::BadColumn { column: "current_turn", value: s.to_owned() })
}

fn decode_termination(s: &str) -> Result<Termination> {
  Termination::parse(s)
    .ok_or_else(|| Error::BadColumn { column: "termination", value: s.to_owned() })
}

// ─── Auxiliary state ─────────────────────────────────────────────────────────

/// The `aux_state` column: everything about the position that is neither
/// the board nor the turn.
#[derive(Serialize, Deserialize)]
struct AuxState {
  castling:   CastlingRights,
  en_passant: Option<Square>,
  last_move:  Option<MoveData>,
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A `game_invitations` row as stored.
pub struct InvitationRow {
  pub game_uuid:    String,
  pub sender_id:    i64,
  pub recipient_id: i64,
  pub game_type:    String,
  pub status:       String,
  pub created_at:   String,
  pub responded_at: Option<String>,
}

impl InvitationRow {
  pub const COLUMNS: &'static str =
    "game_uuid, sender_id, recipient_id, game_type, status, created_at, responded_at";

  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      game_uuid:    row.get(0)?,
      sender_id:    row.get(1)?,
      recipient_id: row.get(2)?,
      game_type:    row.get(3)?,
      status:       row.get(4)?,
      created_at:   row.get(5)?,
      responded_at: row.get(6)?,
    })
  }

  pub fn from_invitation(inv: &Invitation) -> Self {
    Self {
      game_uuid:    encode_game_id(inv.game_id),
      sender_id:    inv.sender_id.0,
      recipient_id: inv.recipient_id.0,
      game_type:    inv.game_type.as_str().to_owned(),
      status:       inv.status.as_str().to_owned(),
      created_at:   encode_dt(inv.created_at),
      responded_at: inv.responded_at.map(encode_dt),
    }
  }

  pub fn into_invitation(self) -> Result<Invitation> {
    Ok(Invitation {
      game_id:      decode_game_id(&self.game_uuid)?,
      sender_id:    UserId(self.sender_id),
      recipient_id: UserId(self.recipient_id),
      game_type:    decode_game_type(&self.game_type)?,
      status:       decode_status(&self.status)?,
      created_at:   decode_dt(&self.created_at)?,
      responded_at: self.responded_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// A `multiplayer_games` row as stored.
pub struct SessionRow {
  pub game_uuid:      String,
  pub game_type:      String,
  pub white_id:       i64,
  pub black_id:       i64,
  pub board_state:    String,
  pub current_turn:   String,
  pub white_captures: u32,
  pub black_captures: u32,
  pub aux_state:      String,
  pub game_over:      bool,
  pub winner_id:      Option<i64>,
  pub created_at:     String,
  pub last_updated:   String,
  pub move_count:     u32,
  pub termination:    Option<String>,
  pub draw_clock:     String,
}

impl SessionRow {
  pub const COLUMNS: &'static str = "game_uuid, game_type, white_id, black_id, board_state, \
     current_turn, white_captures, black_captures, aux_state, game_over, winner_id, \
     created_at, last_updated, move_count, termination, draw_clock";

  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      game_uuid:      row.get(0)?,
      game_type:      row.get(1)?,
      white_id:       row.get(2)?,
      black_id:       row.get(3)?,
      board_state:    row.get(4)?,
      current_turn:   row.get(5)?,
      white_captures: row.get(6)?,
      black_captures: row.get(7)?,
      aux_state:      row.get(8)?,
      game_over:      row.get(9)?,
      winner_id:      row.get(10)?,
      created_at:     row.get(11)?,
      last_updated:   row.get(12)?,
      move_count:     row.get(13)?,
      termination:    row.get(14)?,
      draw_clock:     row.get(15)?,
    })
  }

  pub fn from_session(s: &GameSession) -> Result<Self> {
    let aux = AuxState {
      castling:   s.state.castling,
      en_passant: s.state.en_passant,
      last_move:  s.state.last_move.clone(),
    };
    Ok(Self {
      game_uuid:      encode_game_id(s.game_id),
      game_type:      s.game_type.as_str().to_owned(),
      white_id:       s.white_id.0,
      black_id:       s.black_id.0,
      board_state:    serde_json::to_string(&s.state.board)?,
      current_turn:   s.state.turn.marker().to_owned(),
      white_captures: s.state.white_captures,
      black_captures: s.state.black_captures,
      aux_state:      serde_json::to_string(&aux)?,
      game_over:      s.game_over,
      winner_id:      s.winner_id.map(|u| u.0),
      created_at:     encode_dt(s.created_at),
      last_updated:   encode_dt(s.last_updated),
      move_count:     s.move_count,
      termination:    s.termination.map(|t| t.as_str().to_owned()),
      draw_clock:     serde_json::to_string(&s.state.clock)?,
    })
  }

  pub fn into_session(self) -> Result<GameSession> {
    let board: Board = serde_json::from_str(&self.board_state)?;
    let aux: AuxState = serde_json::from_str(&self.aux_state)?;
    let clock: DrawClock = serde_json::from_str(&self.draw_clock)?;

    let state = ChessState {
      board,
      turn: decode_turn(&self.current_turn)?,
      white_captures: self.white_captures,
      black_captures: self.black_captures,
      castling: aux.castling,
      en_passant: aux.en_passant,
      last_move: aux.last_move,
      clock,
    };

    Ok(GameSession {
      game_id: decode_game_id(&self.game_uuid)?,
      game_type: decode_game_type(&self.game_type)?,
      white_id: UserId(self.white_id),
      black_id: UserId(self.black_id),
      state,
      move_count: self.move_count,
      game_over: self.game_over,
      winner_id: self.winner_id.map(UserId),
      termination: self.termination.as_deref().map(decode_termination).transpose()?,
      created_at: decode_dt(&self.created_at)?,
      last_updated: decode_dt(&self.last_updated)?,
    })
  }
}

/// A `game_moves` row as stored, minus the surrogate key.
pub struct MoveRow {
  pub game_uuid:   String,
  pub move_number: u32,
  pub player_id:   i64,
  pub move_data:   String,
  pub created_at:  String,
}

impl MoveRow {
  pub const COLUMNS: &'static str = "game_uuid, move_number, player_id, move_data, created_at";

  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      game_uuid:   row.get(0)?,
      move_number: row.get(1)?,
      player_id:   row.get(2)?,
      move_data:   row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn from_record(r: &MoveRecord) -> Result<Self> {
    Ok(Self {
      game_uuid:   encode_game_id(r.game_id),
      move_number: r.move_number,
      player_id:   r.player_id.0,
      move_data:   serde_json::to_string(&r.data)?,
      created_at:  encode_dt(r.recorded_at),
    })
  }

  pub fn into_record(self) -> Result<MoveRecord> {
    Ok(MoveRecord {
      game_id:     decode_game_id(&self.game_uuid)?,
      move_number: self.move_number,
      player_id:   UserId(self.player_id),
      data:        serde_json::from_str(&self.move_data)?,
      recorded_at: decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_lexicographically() {
    let early = decode_dt("2024-01-01T00:00:00Z").unwrap();
    let late = decode_dt("2024-01-01T00:00:00.5Z").unwrap();
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }

  #[test]
  fn session_row_keeps_state() {
    let inv = Invitation::new(UserId(1), UserId(2), GameKind::Chess);
    let session = GameSession::start(&inv, UserId(2), UserId(1), Utc::now());

    let row = SessionRow::from_session(&session).unwrap();
    assert_eq!(row.current_turn, "w");
    assert!(row.aux_state.contains("\"wK\":true"));

    assert_eq!(row.into_session().unwrap(), session);
  }

  #[test]
  fn bad_turn_marker_is_reported() {
    let inv = Invitation::new(UserId(1), UserId(2), GameKind::Chess);
    let session = GameSession::start(&inv, UserId(1), UserId(2), Utc::now());
    let mut row = SessionRow::from_session(&session).unwrap();
    row.current_turn = "x".into();

    assert!(matches!(
      row.into_session(),
      Err(Error::BadColumn { column: "current_turn", .. })
    ));
  }
}

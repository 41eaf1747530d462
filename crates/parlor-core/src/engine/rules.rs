//! Move validation and application.
//!
//! Legality is decided by the `chess` crate: the typed state is rendered as
//! FEN, the requested move must appear among the legal moves of that board,
//! and the successor board is read back into typed state. Bookkeeping the
//! crate does not keep for us (captures, the en-passant target after every
//! double advance, draw counters) is derived from the move itself.

use ::chess::{BoardStatus, ChessMove, MoveGen};

use super::{
  board::{Board, CastlingRights, Piece, PieceKind, Side, Square},
  state::{ChessState, Outcome, Termination, position_key},
};
use crate::{
  Error, Result,
  moves::{CastleSide, MoveData, PlayedMove},
};

/// Plies without a pawn move or capture after which the game is drawn.
pub const FIFTY_MOVE_PLIES: u32 = 100;

/// Occurrences of one position that draw the game.
pub const REPETITION_LIMIT: usize = 3;

/// The result of applying one ply.
#[derive(Debug, Clone)]
pub struct Transition {
  pub state:   ChessState,
  pub data:    MoveData,
  pub outcome: Option<Outcome>,
}

/// Apply a board move for the side to move.
///
/// A pawn reaching the last rank without an explicit `promotion` becomes a
/// queen.
pub fn play(
  state: &ChessState,
  from: Square,
  to: Square,
  promotion: Option<PieceKind>,
) -> Result<Transition> {
  let board = state.to_chess()?;
  let mover = state.turn;

  let piece = state
    .board
    .get(from)
    .filter(|p| p.side == mover)
    .ok_or_else(|| Error::IllegalMove(format!("no piece of the side to move on {from}")))?;

  let promotion = match promotion {
    Some(kind) => Some(kind),
    None if piece.kind == PieceKind::Pawn && to.rank() == last_rank(mover) => {
      Some(PieceKind::Queen)
    }
    None => None,
  };

  let chess_move =
    ChessMove::new(from.to_chess(), to.to_chess(), promotion.map(PieceKind::to_chess));
  if !MoveGen::new_legal(&board).any(|m| m == chess_move) {
    return Err(Error::IllegalMove(format!("{from}{to} is not legal here")));
  }

  let en_passant_capture =
    piece.kind == PieceKind::Pawn && from.file() != to.file() && state.board.get(to).is_none();
  let captured = if en_passant_capture {
    Some(Piece::new(mover.opponent(), PieceKind::Pawn))
  } else {
    state.board.get(to)
  };
  let castle = (piece.kind == PieceKind::King && from.file().abs_diff(to.file()) == 2).then(|| {
    if to.file() > from.file() { CastleSide::Kingside } else { CastleSide::Queenside }
  });

  let next = board.make_move_new(chess_move);
  let key = position_key(&next);

  let mut clock = state.clock.clone();
  if piece.kind == PieceKind::Pawn || captured.is_some() {
    clock.halfmove = 0;
    clock.positions.clear();
  } else {
    clock.halfmove += 1;
  }
  if mover == Side::Black {
    clock.fullmove += 1;
  }
  clock.positions.push(key.clone());

  let en_passant = if piece.kind == PieceKind::Pawn && from.rank().abs_diff(to.rank()) == 2 {
    Square::new(from.file(), (from.rank() + to.rank()) / 2)
  } else {
    None
  };

  let (mut white_captures, mut black_captures) = (state.white_captures, state.black_captures);
  if captured.is_some() {
    match mover {
      Side::White => white_captures += 1,
      Side::Black => black_captures += 1,
    }
  }

  let data = MoveData::Play(PlayedMove {
    from,
    to,
    piece,
    captured,
    promotion: promotion.map(|kind| Piece::new(mover, kind)),
    castle,
    en_passant: en_passant_capture,
    check: next.checkers().popcnt() > 0,
  });

  let state = ChessState {
    board: Board::from_chess(&next),
    turn: mover.opponent(),
    white_captures,
    black_captures,
    castling: CastlingRights::from_chess(&next),
    en_passant,
    last_move: Some(data.clone()),
    clock,
  };

  let outcome = judge(&next, &state, mover, &key);
  Ok(Transition { state, data, outcome })
}

/// The side to move gives up: by resigning, or by forfeiting on inactivity.
pub fn concede(state: &ChessState, termination: Termination) -> Transition {
  let loser = state.turn;
  let data = match termination {
    Termination::Forfeit => MoveData::Forfeit,
    _ => MoveData::Resign,
  };

  let mut next = state.clone();
  next.turn = loser.opponent();
  next.en_passant = None;
  next.last_move = Some(data.clone());

  Transition {
    state: next,
    data,
    outcome: Some(Outcome::win(loser.opponent(), termination)),
  }
}

/// Legal moves of the side to move in coordinate notation (`e2e4`, `e7e8q`),
/// sorted.
pub fn legal_moves(state: &ChessState) -> Result<Vec<String>> {
  let board = state.to_chess()?;
  let mut moves: Vec<String> = MoveGen::new_legal(&board)
    .map(|m| {
      let mut s = format!(
        "{}{}",
        Square::from_chess(m.get_source()),
        Square::from_chess(m.get_dest())
      );
      if let Some(p) = m.get_promotion() {
        s.push(PieceKind::from_chess(p).letter());
      }
      s
    })
    .collect();
  moves.sort();
  Ok(moves)
}

/// Neither side can possibly deliver mate: bare kings, a single minor piece,
/// or only bishops all standing on one square colour.
pub fn insufficient_material(board: &Board) -> bool {
  let mut minors: Vec<(PieceKind, Square)> = Vec::new();
  for (sq, piece) in board.pieces() {
    match piece.kind {
      PieceKind::King => {}
      PieceKind::Knight | PieceKind::Bishop => minors.push((piece.kind, sq)),
      PieceKind::Pawn | PieceKind::Rook | PieceKind::Queen => return false,
    }
  }

  match minors.as_slice() {
    [] | [_] => true,
    all if all.iter().all(|(kind, _)| *kind == PieceKind::Bishop) => {
      let light = all[0].1.is_light();
      all.iter().all(|(_, sq)| sq.is_light() == light)
    }
    _ => false,
  }
}

fn last_rank(side: Side) -> u8 {
  match side {
    Side::White => 7,
    Side::Black => 0,
  }
}

fn judge(next: &::chess::Board, state: &ChessState, mover: Side, key: &str) -> Option<Outcome> {
  match next.status() {
    BoardStatus::Checkmate => Some(Outcome::win(mover, Termination::Checkmate)),
    BoardStatus::Stalemate => Some(Outcome::draw(Termination::Stalemate)),
    BoardStatus::Ongoing => {
      if insufficient_material(&state.board) {
        Some(Outcome::draw(Termination::InsufficientMaterial))
      } else if state.clock.halfmove >= FIFTY_MOVE_PLIES {
        Some(Outcome::draw(Termination::FiftyMoveRule))
      } else if state.clock.positions.iter().filter(|k| k.as_str() == key).count() >= REPETITION_LIMIT {
        Some(Outcome::draw(Termination::Repetition))
      } else {
        None
      }
    }
  }
}

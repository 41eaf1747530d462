//! Board geometry: sides, pieces, squares and the 8×8 grid.
//!
//! The grid serialises to the same JSON layout the game client reads: an array
//! of eight ranks, rank 8 first, each an array of eight FEN piece letters or
//! `null`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

// ─── Side ────────────────────────────────────────────────────────────────────

/// The colour a player plays. Serialised as the turn marker `"w"` / `"b"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
  #[serde(rename = "w")]
  White,
  #[serde(rename = "b")]
  Black,
}

impl Side {
  pub fn opponent(self) -> Self {
    match self {
      Side::White => Side::Black,
      Side::Black => Side::White,
    }
  }

  pub fn marker(self) -> &'static str {
    match self {
      Side::White => "w",
      Side::Black => "b",
    }
  }

  pub fn from_marker(s: &str) -> Option<Self> {
    match s {
      "w" => Some(Side::White),
      "b" => Some(Side::Black),
      _ => None,
    }
  }

  pub(crate) fn from_chess(color: ::chess::Color) -> Self {
    match color {
      ::chess::Color::White => Side::White,
      ::chess::Color::Black => Side::Black,
    }
  }
}

// ─── Pieces ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
  Pawn,
  Knight,
  Bishop,
  Rook,
  Queen,
  King,
}

impl PieceKind {
  /// Lower-case FEN letter.
  pub fn letter(self) -> char {
    match self {
      PieceKind::Pawn => 'p',
      PieceKind::Knight => 'n',
      PieceKind::Bishop => 'b',
      PieceKind::Rook => 'r',
      PieceKind::Queen => 'q',
      PieceKind::King => 'k',
    }
  }

  pub fn from_letter(c: char) -> Option<Self> {
    match c.to_ascii_lowercase() {
      'p' => Some(PieceKind::Pawn),
      'n' => Some(PieceKind::Knight),
      'b' => Some(PieceKind::Bishop),
      'r' => Some(PieceKind::Rook),
      'q' => Some(PieceKind::Queen),
      'k' => Some(PieceKind::King),
      _ => None,
    }
  }

  pub(crate) fn to_chess(self) -> ::chess::Piece {
    match self {
      PieceKind::Pawn => ::chess::Piece::Pawn,
      PieceKind::Knight => ::chess::Piece::Knight,
      PieceKind::Bishop => ::chess::Piece::Bishop,
      PieceKind::Rook => ::chess::Piece::Rook,
      PieceKind::Queen => ::chess::Piece::Queen,
      PieceKind::King => ::chess::Piece::King,
    }
  }

  pub(crate) fn from_chess(piece: ::chess::Piece) -> Self {
    match piece {
      ::chess::Piece::Pawn => PieceKind::Pawn,
      ::chess::Piece::Knight => PieceKind::Knight,
      ::chess::Piece::Bishop => PieceKind::Bishop,
      ::chess::Piece::Rook => PieceKind::Rook,
      ::chess::Piece::Queen => PieceKind::Queen,
      ::chess::Piece::King => PieceKind::King,
    }
  }
}

/// A coloured piece, serialised as its FEN letter (upper case for white).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "char", try_from = "char")]
pub struct Piece {
  pub side: Side,
  pub kind: PieceKind,
}

impl Piece {
  pub const fn new(side: Side, kind: PieceKind) -> Self { Self { side, kind } }

  pub fn letter(self) -> char {
    match self.side {
      Side::White => self.kind.letter().to_ascii_uppercase(),
      Side::Black => self.kind.letter(),
    }
  }
}

impl From<Piece> for char {
  fn from(p: Piece) -> char { p.letter() }
}

impl TryFrom<char> for Piece {
  type Error = String;

  fn try_from(c: char) -> Result<Self, Self::Error> {
    let kind =
      PieceKind::from_letter(c).ok_or_else(|| format!("unknown piece letter: {c:?}"))?;
    let side = if c.is_ascii_uppercase() { Side::White } else { Side::Black };
    Ok(Piece { side, kind })
  }
}

// ─── Squares ─────────────────────────────────────────────────────────────────

/// A board square in algebraic notation; `file` and `rank` are 0-based
/// (`a1` is `(0, 0)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Square {
  file: u8,
  rank: u8,
}

impl Square {
  pub fn new(file: u8, rank: u8) -> Option<Self> {
    (file < 8 && rank < 8).then_some(Self { file, rank })
  }

  pub fn file(self) -> u8 { self.file }

  pub fn rank(self) -> u8 { self.rank }

  /// Squares of one colour share the parity of `file + rank`.
  pub fn is_light(self) -> bool { (self.file + self.rank) % 2 == 1 }

  pub(crate) fn to_chess(self) -> ::chess::Square {
    ::chess::Square::make_square(
      ::chess::Rank::from_index(self.rank as usize),
      ::chess::File::from_index(self.file as usize),
    )
  }

  pub(crate) fn from_chess(sq: ::chess::Square) -> Self {
    Self {
      file: sq.get_file().to_index() as u8,
      rank: sq.get_rank().to_index() as u8,
    }
  }
}

impl fmt::Display for Square {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
  }
}

impl FromStr for Square {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
      return Err(format!("invalid square: {s:?}"));
    }
    let file = bytes[0].to_ascii_lowercase().wrapping_sub(b'a');
    let rank = bytes[1].wrapping_sub(b'1');
    Square::new(file, rank).ok_or_else(|| format!("invalid square: {s:?}"))
  }
}

impl From<Square> for String {
  fn from(sq: Square) -> String { sq.to_string() }
}

impl TryFrom<String> for Square {
  type Error = String;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

// ─── Grid ────────────────────────────────────────────────────────────────────

/// Piece placement. Row 0 is rank 8, column 0 is file a.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
  rows: [[Option<Piece>; 8]; 8],
}

impl Board {
  pub fn empty() -> Self { Self { rows: [[None; 8]; 8] } }

  /// The standard starting position.
  pub fn standard() -> Self {
    use PieceKind::*;
    const BACK: [PieceKind; 8] = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];

    let mut board = Self::empty();
    for (file, kind) in BACK.iter().enumerate() {
      board.rows[0][file] = Some(Piece::new(Side::Black, *kind));
      board.rows[1][file] = Some(Piece::new(Side::Black, Pawn));
      board.rows[6][file] = Some(Piece::new(Side::White, Pawn));
      board.rows[7][file] = Some(Piece::new(Side::White, *kind));
    }
    board
  }

  pub fn get(&self, sq: Square) -> Option<Piece> {
    self.rows[7 - sq.rank as usize][sq.file as usize]
  }

  pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
    self.rows[7 - sq.rank as usize][sq.file as usize] = piece;
  }

  /// Every occupied square with its piece, rank 8 first.
  pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
    self.rows.iter().enumerate().flat_map(|(row, cells)| {
      cells.iter().enumerate().filter_map(move |(file, cell)| {
        cell.map(|p| (Square { file: file as u8, rank: 7 - row as u8 }, p))
      })
    })
  }

  /// The placement field of a FEN string.
  pub fn placement(&self) -> String {
    let mut out = String::with_capacity(72);
    for (row, cells) in self.rows.iter().enumerate() {
      let mut gap = 0;
      for cell in cells {
        match cell {
          Some(p) => {
            if gap > 0 {
              out.push(char::from(b'0' + gap));
              gap = 0;
            }
            out.push(p.letter());
          }
          None => gap += 1,
        }
      }
      if gap > 0 {
        out.push(char::from(b'0' + gap));
      }
      if row < 7 {
        out.push('/');
      }
    }
    out
  }

  /// Read the placement back out of a `chess` crate board.
  pub(crate) fn from_chess(board: &::chess::Board) -> Self {
    let mut out = Self::empty();
    for rank in 0..8u8 {
      for file in 0..8u8 {
        let sq = Square { file, rank };
        let chess_sq = sq.to_chess();
        if let (Some(piece), Some(color)) = (board.piece_on(chess_sq), board.color_on(chess_sq)) {
          out.set(
            sq,
            Some(Piece::new(Side::from_chess(color), PieceKind::from_chess(piece))),
          );
        }
      }
    }
    out
  }
}

impl Default for Board {
  fn default() -> Self { Self::standard() }
}

// ─── Castling ────────────────────────────────────────────────────────────────

/// Remaining castling rights, serialised as `{"wK":..,"wQ":..,"bK":..,"bQ":..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastlingRights {
  #[serde(rename = "wK")]
  pub white_kingside:  bool,
  #[serde(rename = "wQ")]
  pub white_queenside: bool,
  #[serde(rename = "bK")]
  pub black_kingside:  bool,
  #[serde(rename = "bQ")]
  pub black_queenside: bool,
}

impl CastlingRights {
  pub const ALL: Self = Self {
    white_kingside:  true,
    white_queenside: true,
    black_kingside:  true,
    black_queenside: true,
  };

  pub const NONE: Self = Self {
    white_kingside:  false,
    white_queenside: false,
    black_kingside:  false,
    black_queenside: false,
  };

  /// The castling field of a FEN string.
  pub fn fen(&self) -> String {
    let mut out = String::new();
    if self.white_kingside {
      out.push('K');
    }
    if self.white_queenside {
      out.push('Q');
    }
    if self.black_kingside {
      out.push('k');
    }
    if self.black_queenside {
      out.push('q');
    }
    if out.is_empty() {
      out.push('-');
    }
    out
  }

  pub(crate) fn from_chess(board: &::chess::Board) -> Self {
    let white = board.castle_rights(::chess::Color::White);
    let black = board.castle_rights(::chess::Color::Black);
    Self {
      white_kingside:  white.has_kingside(),
      white_queenside: white.has_queenside(),
      black_kingside:  black.has_kingside(),
      black_queenside: black.has_queenside(),
    }
  }
}

impl Default for CastlingRights {
  fn default() -> Self { Self::ALL }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sq(s: &str) -> Square { s.parse().unwrap() }

  #[test]
  fn square_notation() {
    assert_eq!(sq("a1"), Square::new(0, 0).unwrap());
    assert_eq!(sq("h8").to_string(), "h8");
    assert_eq!(sq("E4").to_string(), "e4");
    assert!("i1".parse::<Square>().is_err());
    assert!("a9".parse::<Square>().is_err());
    assert!("a".parse::<Square>().is_err());
  }

  #[test]
  fn square_colours() {
    assert!(!sq("a1").is_light());
    assert!(sq("h1").is_light());
    assert!(!sq("h8").is_light());
  }

  #[test]
  fn standard_board_placement() {
    assert_eq!(
      Board::standard().placement(),
      "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"
    );
  }

  #[test]
  fn board_json_layout_matches_client_grid() {
    let json = serde_json::to_value(Board::standard()).unwrap();
    assert_eq!(json[0][0], "r");
    assert_eq!(json[0][4], "k");
    assert_eq!(json[7][3], "Q");
    assert!(json[4][4].is_null());

    let back: Board = serde_json::from_value(json).unwrap();
    assert_eq!(back, Board::standard());
  }

  #[test]
  fn get_and_set_use_algebraic_coordinates() {
    let mut board = Board::standard();
    assert_eq!(board.get(sq("e1")), Some(Piece::new(Side::White, PieceKind::King)));
    assert_eq!(board.get(sq("d8")), Some(Piece::new(Side::Black, PieceKind::Queen)));

    board.set(sq("e4"), board.get(sq("e2")));
    board.set(sq("e2"), None);
    assert_eq!(board.placement(), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR");
  }

  #[test]
  fn castling_rights_json_and_fen() {
    let json = serde_json::to_string(&CastlingRights::ALL).unwrap();
    assert_eq!(json, r#"{"wK":true,"wQ":true,"bK":true,"bQ":true}"#);
    assert_eq!(CastlingRights::ALL.fen(), "KQkq");
    assert_eq!(CastlingRights::NONE.fen(), "-");
  }

  #[test]
  fn bad_piece_letter_is_rejected() {
    assert!(serde_json::from_str::<Piece>("\"x\"").is_err());
    assert_eq!(
      serde_json::from_str::<Piece>("\"N\"").unwrap(),
      Piece::new(Side::White, PieceKind::Knight)
    );
  }
}

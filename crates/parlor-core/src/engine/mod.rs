//! Chess rules engine.
//!
//! Pure functions over [`ChessState`]; nothing here touches storage.

pub mod board;
pub mod rules;
pub mod state;

pub use board::{Board, CastlingRights, Piece, PieceKind, Side, Square};
pub use rules::{Transition, concede, legal_moves, play};
pub use state::{ChessState, DrawClock, Outcome, Termination};

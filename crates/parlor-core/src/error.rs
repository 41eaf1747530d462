//! Error types for `parlor-core`.

use thiserror::Error;

use crate::ids::GameId;

#[derive(Debug, Error)]
pub enum Error {
  /// Sender equals recipient, a participant does not exist, or the
  /// messaging gate refused the pair.
  #[error("invalid participant: {0}")]
  InvalidParticipant(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  /// A lifecycle transition was attempted from the wrong state.
  #[error("invalid state: {0}")]
  InvalidState(String),

  #[error("it is not your turn")]
  NotYourTurn,

  #[error("illegal move: {0}")]
  IllegalMove(String),

  #[error("game {0} is already over")]
  GameAlreadyOver(GameId),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("unsupported game type: {0:?}")]
  UnsupportedGame(String),

  /// Persisted state that does not decode into a valid position.
  #[error("corrupt game state: {0}")]
  CorruptState(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error as [`Error::Storage`].
  pub fn storage<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

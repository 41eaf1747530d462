//! Error type for `parlor-store-sqlite`.

use parlor_core::ids::GameId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value outside its domain.
  #[error("bad value in column {column}: {value:?}")]
  BadColumn { column: &'static str, value: String },

  #[error("game id already in use: {0}")]
  DuplicateGameId(GameId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Values the store wrote but can no longer read back are corrupt state;
/// everything else is a storage failure.
impl From<Error> for parlor_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Json(_)
      | Error::Uuid(_)
      | Error::DateParse(_)
      | Error::BadColumn { .. } => parlor_core::Error::CorruptState(err.to_string()),
      Error::Database(_) | Error::DuplicateGameId(_) => parlor_core::Error::storage(err),
    }
  }
}

//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use parlor_core::Error as LobbyError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or malformed X-User-Id header")]
  MissingIdentity,

  #[error(transparent)]
  Lobby(#[from] LobbyError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::MissingIdentity => StatusCode::UNAUTHORIZED,
      ApiError::Lobby(e) => match e {
        LobbyError::NotFound(_) => StatusCode::NOT_FOUND,
        LobbyError::Unauthorized(_) => StatusCode::FORBIDDEN,
        LobbyError::InvalidState(_)
        | LobbyError::NotYourTurn
        | LobbyError::GameAlreadyOver(_) => StatusCode::CONFLICT,
        LobbyError::IllegalMove(_) | LobbyError::InvalidParticipant(_) => {
          StatusCode::UNPROCESSABLE_ENTITY
        }
        LobbyError::UnsupportedGame(_) => StatusCode::BAD_REQUEST,
        LobbyError::CorruptState(_) | LobbyError::Serialization(_) | LobbyError::Storage(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

//! The acting-user extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use parlor_core::ids::UserId;

use crate::error::ApiError;

/// Header carrying the numeric id of the user making the request.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user on whose behalf a handler acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

impl<S> FromRequestParts<S> for Actor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let id = parts
      .headers
      .get(USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.trim().parse::<i64>().ok())
      .ok_or(ApiError::MissingIdentity)?;
    Ok(Actor(UserId(id)))
  }
}

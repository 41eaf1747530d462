//! JSON REST API for Parlor.
//!
//! Exposes an axum [`Router`] backed by a [`Lobby`] over any
//! [`GameStore`] and [`Directory`]. Authentication, TLS and transport concerns
//! are the caller's responsibility: the acting user arrives in the
//! `X-User-Id` header, set by whatever sits in front of this router.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", parlor_api::api_router(lobby.clone()))
//! ```

pub mod actor;
pub mod error;
pub mod games;
pub mod invitations;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use parlor_core::{
  lobby::Lobby,
  store::{Directory, GameStore},
};

pub use actor::{Actor, USER_ID_HEADER};
pub use error::ApiError;

/// Build the API router for `lobby`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, D>(lobby: Arc<Lobby<S, D>>) -> Router<()>
where
  S: GameStore + 'static,
  D: Directory + 'static,
{
  Router::new()
    // Invitations
    .route("/invitations", get(invitations::list::<S, D>).post(invitations::create::<S, D>))
    .route("/invitations/pending-count", get(invitations::pending_count::<S, D>))
    .route("/invitations/{id}", get(invitations::get_one::<S, D>))
    .route("/invitations/{id}/accept", post(invitations::accept::<S, D>))
    .route("/invitations/{id}/decline", post(invitations::decline::<S, D>))
    // Games
    .route("/games", get(games::list::<S, D>))
    .route("/games/{id}", get(games::get_one::<S, D>))
    .route("/games/{id}/moves", get(games::history::<S, D>).post(games::play::<S, D>))
    .route("/games/{id}/legal-moves", get(games::legal_moves::<S, D>))
    .route("/games/{id}/resign", post(games::resign::<S, D>))
    .route("/games/{id}/events", get(games::events::<S, D>))
    .with_state(lobby)
}

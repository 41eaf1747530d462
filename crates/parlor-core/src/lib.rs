//! Core types, chess rules and the lobby service for Parlor games.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::GameStore`] and [`store::Directory`];
//! everything above them talks to a [`lobby::Lobby`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod engine;
pub mod error;
pub mod game;
pub mod ids;
pub mod invitation;
pub mod lobby;
pub mod memory;
pub mod moves;
pub mod session;
pub mod store;

pub use error::{Error, Result};

//! Identifier newtypes.
//!
//! Users are owned by an external directory and keyed by integer. Games are
//! keyed by an opaque token minted when the invitation is created, long before
//! any session row exists.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a user in the external user directory.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<i64> for UserId {
  fn from(id: i64) -> Self { Self(id) }
}

/// Session token shared by an invitation and the game it starts.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameId(pub Uuid);

impl GameId {
  /// Mint a fresh, globally unique token.
  pub fn mint() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for GameId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.hyphenated())
  }
}

impl FromStr for GameId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s).map(Self) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn minted_ids_are_distinct() {
    assert_ne!(GameId::mint(), GameId::mint());
  }

  #[test]
  fn game_id_display_parses_back() {
    let id = GameId::mint();
    let parsed: GameId = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
    assert!("not-a-uuid".parse::<GameId>().is_err());
  }
}

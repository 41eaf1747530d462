//! The kinds of game Parlor has an engine for.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A game type with a rules engine behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
  Chess,
}

impl GameKind {
  pub fn as_str(self) -> &'static str {
    match self {
      GameKind::Chess => "chess",
    }
  }
}

impl fmt::Display for GameKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for GameKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "chess" => Ok(GameKind::Chess),
      _ => Err(Error::UnsupportedGame(s.to_owned())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_case_insensitively() {
    assert_eq!("Chess".parse::<GameKind>().unwrap(), GameKind::Chess);
    assert_eq!(GameKind::Chess.to_string(), "chess");
  }

  #[test]
  fn unknown_game_is_unsupported() {
    let err = "racing".parse::<GameKind>().unwrap_err();
    assert!(matches!(err, Error::UnsupportedGame(name) if name == "racing"));
  }
}

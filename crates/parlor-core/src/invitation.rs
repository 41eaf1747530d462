//! Invitations: the proposal phase of a game.
//!
//! An invitation is created `pending` and leaves that state exactly once,
//! to `accepted` (which starts a session under the same [`GameId`]) or to
//! `declined`. Both are terminal.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  game::GameKind,
  ids::{GameId, UserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
  Pending,
  Accepted,
  Declined,
}

impl InvitationStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      InvitationStatus::Pending => "pending",
      InvitationStatus::Accepted => "accepted",
      InvitationStatus::Declined => "declined",
    }
  }

  pub fn is_terminal(self) -> bool { !matches!(self, InvitationStatus::Pending) }
}

impl fmt::Display for InvitationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for InvitationStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(InvitationStatus::Pending),
      "accepted" => Ok(InvitationStatus::Accepted),
      "declined" => Ok(InvitationStatus::Declined),
      other => Err(format!("unknown invitation status: {other:?}")),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
  pub game_id:      GameId,
  pub sender_id:    UserId,
  pub recipient_id: UserId,
  pub game_type:    GameKind,
  pub status:       InvitationStatus,
  pub created_at:   DateTime<Utc>,
  /// When the recipient answered; `None` while pending.
  pub responded_at: Option<DateTime<Utc>>,
}

impl Invitation {
  /// A fresh pending invitation with a newly minted game id.
  pub fn new(sender_id: UserId, recipient_id: UserId, game_type: GameKind) -> Self {
    Self {
      game_id: GameId::mint(),
      sender_id,
      recipient_id,
      game_type,
      status: InvitationStatus::Pending,
      created_at: Utc::now(),
      responded_at: None,
    }
  }

  pub fn involves(&self, user: UserId) -> bool {
    self.sender_id == user || self.recipient_id == user
  }
}

/// Parameters for [`GameStore::list_invitations`](crate::store::GameStore::list_invitations).
#[derive(Debug, Clone, Copy)]
pub struct InvitationQuery {
  /// Invitations this user sent or received.
  pub user:   UserId,
  pub status: Option<InvitationStatus>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_invitation_is_pending() {
    let inv = Invitation::new(UserId(1), UserId(2), GameKind::Chess);
    assert_eq!(inv.status, InvitationStatus::Pending);
    assert!(inv.responded_at.is_none());
    assert!(inv.involves(UserId(1)) && inv.involves(UserId(2)));
    assert!(!inv.involves(UserId(3)));
  }

  #[test]
  fn only_pending_is_open() {
    assert!(!InvitationStatus::Pending.is_terminal());
    assert!(InvitationStatus::Accepted.is_terminal());
    assert!(InvitationStatus::Declined.is_terminal());
    assert_eq!("declined".parse::<InvitationStatus>().unwrap(), InvitationStatus::Declined);
    assert!("maybe".parse::<InvitationStatus>().is_err());
  }
}

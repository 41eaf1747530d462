//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::{Duration, Utc};
use parlor_core::{
  Error as CoreError,
  engine::{self, Side, Termination},
  game::GameKind,
  ids::{GameId, UserId},
  invitation::{Invitation, InvitationQuery, InvitationStatus},
  lobby::{ColorAssignment, Lobby, LobbyConfig},
  moves::{MoveData, MoveSpec},
  session::GameSession,
  store::{Directory, GameStore, PurgeSummary},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn with_users() -> (SqliteStore, UserId, UserId) {
  let s = store().await;
  let alice = s.add_user("alice", true).await.unwrap();
  let bob = s.add_user("bob", true).await.unwrap();
  (s, alice, bob)
}

fn lobby(s: &SqliteStore) -> Lobby<SqliteStore, SqliteStore> {
  Lobby::new(s.clone(), s.clone(), LobbyConfig { colors: ColorAssignment::SenderWhite })
}

fn play(from: &str, to: &str) -> MoveSpec {
  MoveSpec::play(from.parse().unwrap(), to.parse().unwrap())
}

/// An accepted invitation and its fresh session, written straight to the store.
async fn started(s: &SqliteStore, white: UserId, black: UserId) -> GameSession {
  let inv = Invitation::new(white, black, GameKind::Chess);
  assert!(s.insert_invitation(inv.clone()).await.unwrap().is_none());
  let session = GameSession::start(&inv, white, black, Utc::now());
  assert!(
    s.resolve_invitation(inv.game_id, InvitationStatus::Accepted, Utc::now(), Some(session.clone()))
      .await
      .unwrap()
  );
  session
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn directory_tracks_users_and_messaging() {
  let (s, alice, bob) = with_users().await;

  assert!(s.user_exists(alice).await.unwrap());
  assert!(!s.user_exists(UserId(999)).await.unwrap());
  assert!(s.can_message(alice, bob).await.unwrap());

  assert!(s.set_can_message(bob, false).await.unwrap());
  assert!(!s.can_message(alice, bob).await.unwrap());
  assert!(!s.set_can_message(UserId(999), false).await.unwrap());
}

// ─── Invitations ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_invitation() {
  let (s, alice, bob) = with_users().await;
  let inv = Invitation::new(alice, bob, GameKind::Chess);
  s.insert_invitation(inv.clone()).await.unwrap();

  let fetched = s.get_invitation(inv.game_id).await.unwrap();
  assert_eq!(fetched, Some(inv));
  assert!(s.get_invitation(GameId::mint()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_game_id_is_rejected() {
  let (s, alice, bob) = with_users().await;
  let inv = Invitation::new(alice, bob, GameKind::Chess);
  s.insert_invitation(inv.clone()).await.unwrap();

  let err = s.insert_invitation(inv.clone()).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateGameId(id) if id == inv.game_id));
}

#[tokio::test]
async fn second_pending_invitation_is_blocked_in_both_directions() {
  let (s, alice, bob) = with_users().await;
  let inv = Invitation::new(alice, bob, GameKind::Chess);
  assert!(s.insert_invitation(inv.clone()).await.unwrap().is_none());

  let reverse = Invitation::new(bob, alice, GameKind::Chess);
  let blocked = s.insert_invitation(reverse.clone()).await.unwrap();
  assert_eq!(blocked.map(|i| i.game_id), Some(inv.game_id));
  assert!(s.get_invitation(reverse.game_id).await.unwrap().is_none());

  s.resolve_invitation(inv.game_id, InvitationStatus::Declined, Utc::now(), None)
    .await
    .unwrap();
  assert!(s.insert_invitation(reverse.clone()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_invitations_newest_first_with_status_filter() {
  let (s, alice, bob) = with_users().await;
  let carol = s.add_user("carol", true).await.unwrap();

  let first = Invitation::new(alice, bob, GameKind::Chess);
  let mut second = Invitation::new(carol, alice, GameKind::Chess);
  second.created_at = first.created_at + Duration::seconds(1);
  assert!(s.insert_invitation(first.clone()).await.unwrap().is_none());
  assert!(s.insert_invitation(second.clone()).await.unwrap().is_none());
  s.resolve_invitation(first.game_id, InvitationStatus::Declined, Utc::now(), None)
    .await
    .unwrap();

  let all = s.list_invitations(InvitationQuery { user: alice, status: None }).await.unwrap();
  let ids: Vec<GameId> = all.iter().map(|i| i.game_id).collect();
  assert_eq!(ids, vec![second.game_id, first.game_id]);

  let pending = s
    .list_invitations(InvitationQuery { user: alice, status: Some(InvitationStatus::Pending) })
    .await
    .unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].game_id, second.game_id);

  let bobs = s.list_invitations(InvitationQuery { user: bob, status: None }).await.unwrap();
  assert_eq!(bobs.len(), 1);
}

#[tokio::test]
async fn resolve_is_compare_and_swap() {
  let (s, alice, bob) = with_users().await;
  let inv = Invitation::new(alice, bob, GameKind::Chess);
  s.insert_invitation(inv.clone()).await.unwrap();
  let session = GameSession::start(&inv, alice, bob, Utc::now());

  let first = s
    .resolve_invitation(inv.game_id, InvitationStatus::Accepted, Utc::now(), Some(session.clone()))
    .await
    .unwrap();
  let second = s
    .resolve_invitation(inv.game_id, InvitationStatus::Declined, Utc::now(), None)
    .await
    .unwrap();
  assert!(first);
  assert!(!second);

  let stored = s.get_invitation(inv.game_id).await.unwrap().unwrap();
  assert_eq!(stored.status, InvitationStatus::Accepted);
  assert!(stored.responded_at.is_some());
  assert_eq!(s.get_session(inv.game_id).await.unwrap(), Some(session));
}

// ─── Sessions and moves ──────────────────────────────────────────────────────

#[tokio::test]
async fn commit_move_persists_state_and_log_together() {
  let (s, alice, bob) = with_users().await;
  let session = started(&s, alice, bob).await;

  let t = engine::play(&session.state, "e2".parse().unwrap(), "e4".parse().unwrap(), None).unwrap();
  let (next, record) = session.advance(t, Utc::now());
  assert!(s.commit_move(next.clone(), record.clone()).await.unwrap());

  let stored = s.get_session(session.game_id).await.unwrap().unwrap();
  assert_eq!(stored, next);
  assert_eq!(stored.state.turn, Side::Black);
  assert_eq!(stored.state.en_passant, Some("e3".parse().unwrap()));
  assert_eq!(s.move_history(session.game_id).await.unwrap(), vec![record]);
}

#[tokio::test]
async fn stale_commit_writes_nothing() {
  let (s, alice, bob) = with_users().await;
  let session = started(&s, alice, bob).await;

  let e4 = engine::play(&session.state, "e2".parse().unwrap(), "e4".parse().unwrap(), None).unwrap();
  let d4 = engine::play(&session.state, "d2".parse().unwrap(), "d4".parse().unwrap(), None).unwrap();
  let (a, ra) = session.advance(e4, Utc::now());
  let (b, rb) = session.advance(d4, Utc::now());

  assert!(s.commit_move(a.clone(), ra).await.unwrap());
  assert!(!s.commit_move(b, rb).await.unwrap());

  assert_eq!(s.get_session(session.game_id).await.unwrap(), Some(a));
  assert_eq!(s.move_history(session.game_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn finished_games_accept_no_commits() {
  let (s, alice, bob) = with_users().await;
  let session = started(&s, alice, bob).await;

  let (over, record) = session.advance(engine::concede(&session.state, Termination::Resignation), Utc::now());
  assert!(s.commit_move(over.clone(), record).await.unwrap());

  let t = engine::concede(&over.state, Termination::Resignation);
  let (again, record) = over.advance(t, Utc::now());
  assert!(!s.commit_move(again, record).await.unwrap());

  let stored = s.get_session(session.game_id).await.unwrap().unwrap();
  assert!(stored.game_over);
  assert_eq!(stored.winner_id, Some(bob));
  assert_eq!(stored.termination, Some(Termination::Resignation));
}

#[tokio::test]
async fn list_and_stale_sessions() {
  let (s, alice, bob) = with_users().await;
  let carol = s.add_user("carol", true).await.unwrap();
  let ab = started(&s, alice, bob).await;
  let bc = started(&s, bob, carol).await;

  assert_eq!(s.list_sessions(bob, false).await.unwrap().len(), 2);
  assert_eq!(s.list_sessions(carol, false).await.unwrap().len(), 1);

  let (over, record) = ab.advance(engine::concede(&ab.state, Termination::Resignation), Utc::now());
  s.commit_move(over, record).await.unwrap();

  let active = s.list_sessions(bob, true).await.unwrap();
  assert_eq!(active.iter().map(|g| g.game_id).collect::<Vec<_>>(), vec![bc.game_id]);

  let stale = s.stale_sessions(Utc::now() + Duration::seconds(1)).await.unwrap();
  assert_eq!(stale.iter().map(|g| g.game_id).collect::<Vec<_>>(), vec![bc.game_id]);
  assert!(s.stale_sessions(Utc::now() - Duration::hours(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn purge_removes_rows_and_user() {
  let (s, alice, bob) = with_users().await;
  let session = started(&s, alice, bob).await;
  let t = engine::play(&session.state, "e2".parse().unwrap(), "e4".parse().unwrap(), None).unwrap();
  let (next, record) = session.advance(t, Utc::now());
  s.commit_move(next, record).await.unwrap();
  assert!(s.insert_invitation(Invitation::new(bob, alice, GameKind::Chess)).await.unwrap().is_none());

  let summary = s.purge_user(alice).await.unwrap();
  assert_eq!(summary, PurgeSummary { invitations: 2, sessions: 1, moves: 1 });

  assert!(!s.user_exists(alice).await.unwrap());
  assert!(s.get_session(session.game_id).await.unwrap().is_none());
  assert!(s.move_history(session.game_id).await.unwrap().is_empty());
  assert!(s.user_exists(bob).await.unwrap());
}

// ─── Lobby over SQLite ───────────────────────────────────────────────────────

#[tokio::test]
async fn lobby_plays_fools_mate() {
  let (s, alice, bob) = with_users().await;
  let lobby = lobby(&s);

  let inv = lobby.create_invitation(alice, bob, GameKind::Chess).await.unwrap();
  assert_eq!(lobby.pending_invite_count(bob).await.unwrap(), 1);
  let resp = lobby.respond_to_invitation(inv.game_id, bob, true).await.unwrap();
  let id = resp.session.unwrap().game_id;

  for (player, from, to) in [(alice, "f2", "f3"), (bob, "e7", "e5"), (alice, "g2", "g4")] {
    lobby.apply_move(id, player, play(from, to)).await.unwrap();
  }
  let end = lobby.apply_move(id, bob, play("d8", "h4")).await.unwrap();
  assert!(end.game_over);
  assert_eq!(end.winner_id, Some(bob));
  assert_eq!(end.termination, Some(Termination::Checkmate));

  let history = lobby.move_history(id, bob).await.unwrap();
  assert_eq!(history.iter().map(|m| m.move_number).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
  assert!(matches!(&history[3].data, MoveData::Play(m) if m.check));

  let err = lobby.apply_move(id, alice, play("e2", "e4")).await.unwrap_err();
  assert!(matches!(err, CoreError::GameAlreadyOver(_)));
}

#[tokio::test]
async fn lobby_rejects_invites_when_messaging_is_off() {
  let (s, alice, bob) = with_users().await;
  s.set_can_message(bob, false).await.unwrap();

  let err = lobby(&s).create_invitation(alice, bob, GameKind::Chess).await.unwrap_err();
  assert!(matches!(err, CoreError::InvalidParticipant(_)));
}

#[tokio::test]
async fn lobby_admits_one_of_two_crossing_invitations() {
  let (s, alice, bob) = with_users().await;
  let lobby = lobby(&s);

  let (a, b) = tokio::join!(
    lobby.create_invitation(alice, bob, GameKind::Chess),
    lobby.create_invitation(bob, alice, GameKind::Chess),
  );
  let results = [a, b];
  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
  assert!(results.iter().any(|r| matches!(r, Err(CoreError::InvalidState(_)))));

  let pending = lobby.list_invitations(alice, Some(InvitationStatus::Pending)).await.unwrap();
  assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn lobby_reports_undecodable_rows_as_corrupt() {
  let (s, alice, bob) = with_users().await;
  let lobby = lobby(&s);
  let board = started(&s, alice, bob).await.game_id;
  let kind = started(&s, bob, alice).await.game_id;

  let (board_id, kind_id) = (board.to_string(), kind.to_string());
  s.connection()
    .call(move |conn| {
      conn.execute(
        "UPDATE multiplayer_games SET board_state = 'not a board' WHERE game_uuid = ?1",
        [board_id],
      )?;
      conn.execute("UPDATE multiplayer_games SET game_type = 'go' WHERE game_uuid = ?1", [kind_id])?;
      Ok(())
    })
    .await
    .unwrap();

  for id in [board, kind] {
    let err = lobby.get_session(id).await.unwrap_err();
    assert!(matches!(err, CoreError::CorruptState(_)), "{err:?}");
  }
}

#[tokio::test]
async fn lobby_serialises_racing_moves() {
  let (s, alice, bob) = with_users().await;
  let lobby = Arc::new(lobby(&s));
  let inv = lobby.create_invitation(alice, bob, GameKind::Chess).await.unwrap();
  lobby.respond_to_invitation(inv.game_id, bob, true).await.unwrap();
  let id = inv.game_id;

  let tasks: Vec<_> = ["e2e4", "d2d4", "c2c4", "g1f3"]
    .into_iter()
    .map(|uci| {
      let lobby = lobby.clone();
      tokio::spawn(async move { lobby.apply_move(id, alice, play(&uci[..2], &uci[2..])).await })
    })
    .collect();

  let mut applied = 0;
  for task in tasks {
    if task.await.unwrap().is_ok() {
      applied += 1;
    }
  }
  assert_eq!(applied, 1);
  assert_eq!(lobby.move_history(id, alice).await.unwrap().len(), 1);
  assert_eq!(lobby.get_session(id).await.unwrap().move_count, 1);
}

#[tokio::test]
async fn lobby_sweeps_stale_games() {
  let (s, alice, bob) = with_users().await;
  let lobby = lobby(&s);
  let inv = lobby.create_invitation(alice, bob, GameKind::Chess).await.unwrap();
  lobby.respond_to_invitation(inv.game_id, bob, true).await.unwrap();

  let ended = lobby.forfeit_stale(Utc::now() + Duration::seconds(1)).await.unwrap();
  assert_eq!(ended, vec![inv.game_id]);

  let session = lobby.get_session(inv.game_id).await.unwrap();
  assert_eq!(session.winner_id, Some(bob));
  assert_eq!(session.termination, Some(Termination::Forfeit));
  assert!(lobby.forfeit_stale(Utc::now() + Duration::seconds(1)).await.unwrap().is_empty());
}

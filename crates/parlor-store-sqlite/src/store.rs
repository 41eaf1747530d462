//! [`SqliteStore`]: the SQLite implementation of [`GameStore`] and
//! [`Directory`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use parlor_core::{
  ids::{GameId, UserId},
  invitation::{Invitation, InvitationQuery, InvitationStatus},
  moves::MoveRecord,
  session::GameSession,
  store::{Directory, GameStore, PurgeSummary},
};

use crate::{
  Error, Result,
  encode::{InvitationRow, MoveRow, SessionRow, encode_dt, encode_game_id},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Game state and user directory backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Directory maintenance ─────────────────────────────────────────────

  /// Register a user and return the id the directory assigned.
  pub async fn add_user(&self, username: &str, can_message: bool) -> Result<UserId> {
    let username = username.to_owned();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (username, can_message) VALUES (?1, ?2)",
          rusqlite::params![username, can_message],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(UserId(id))
  }

  /// Toggle a user's messaging gate. Returns `false` if the user is unknown.
  pub async fn set_can_message(&self, user: UserId, can_message: bool) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET can_message = ?2 WHERE id = ?1",
          rusqlite::params![user.0, can_message],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn query_invitations(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<Invitation>> {
    let rows: Vec<InvitationRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), InvitationRow::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(InvitationRow::into_invitation).collect()
  }

  async fn query_sessions(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<GameSession>> {
    let rows: Vec<SessionRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), SessionRow::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(SessionRow::into_session).collect()
  }
}

/// What [`GameStore::insert_invitation`] found inside its transaction.
enum Insert {
  Inserted,
  Blocked(InvitationRow),
  DuplicateId,
}

fn insert_session(conn: &rusqlite::Connection, row: &SessionRow) -> rusqlite::Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO multiplayer_games ({}) VALUES \
       (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
      SessionRow::COLUMNS
    ),
    rusqlite::params![
      row.game_uuid,
      row.game_type,
      row.white_id,
      row.black_id,
      row.board_state,
      row.current_turn,
      row.white_captures,
      row.black_captures,
      row.aux_state,
      row.game_over,
      row.winner_id,
      row.created_at,
      row.last_updated,
      row.move_count,
      row.termination,
      row.draw_clock,
    ],
  )?;
  Ok(())
}

// ─── GameStore impl ──────────────────────────────────────────────────────────

impl GameStore for SqliteStore {
  type Error = Error;

  // ── Invitations ───────────────────────────────────────────────────────

  async fn insert_invitation(&self, invitation: Invitation) -> Result<Option<Invitation>> {
    let row = InvitationRow::from_invitation(&invitation);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let pending = tx
          .query_row(
            &format!(
              "SELECT {} FROM game_invitations
               WHERE status = 'pending' AND game_type = ?3
                 AND ((sender_id = ?1 AND recipient_id = ?2)
                   OR (sender_id = ?2 AND recipient_id = ?1))
               LIMIT 1",
              InvitationRow::COLUMNS
            ),
            rusqlite::params![row.sender_id, row.recipient_id, row.game_type],
            InvitationRow::read,
          )
          .optional()?;
        if let Some(existing) = pending {
          return Ok(Insert::Blocked(existing));
        }

        let inserted = tx.execute(
          &format!(
            "INSERT OR IGNORE INTO game_invitations ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            InvitationRow::COLUMNS
          ),
          rusqlite::params![
            row.game_uuid,
            row.sender_id,
            row.recipient_id,
            row.game_type,
            row.status,
            row.created_at,
            row.responded_at,
          ],
        )?;
        if inserted == 0 {
          return Ok(Insert::DuplicateId);
        }
        tx.commit()?;
        Ok(Insert::Inserted)
      })
      .await?;

    match outcome {
      Insert::Inserted => Ok(None),
      Insert::Blocked(existing) => existing.into_invitation().map(Some),
      Insert::DuplicateId => Err(Error::DuplicateGameId(invitation.game_id)),
    }
  }

  async fn get_invitation(&self, game_id: GameId) -> Result<Option<Invitation>> {
    let id_str = encode_game_id(game_id);

    let raw: Option<InvitationRow> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM game_invitations WHERE game_uuid = ?1",
                InvitationRow::COLUMNS
              ),
              rusqlite::params![id_str],
              InvitationRow::read,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(InvitationRow::into_invitation).transpose()
  }

  async fn list_invitations(&self, query: InvitationQuery) -> Result<Vec<Invitation>> {
    let mut params: Vec<rusqlite::types::Value> = vec![query.user.0.into()];
    let status_clause = match query.status {
      Some(status) => {
        params.push(status.as_str().to_owned().into());
        "AND status = ?2"
      }
      None => "",
    };
    let sql = format!(
      "SELECT {} FROM game_invitations
       WHERE (sender_id = ?1 OR recipient_id = ?1) {status_clause}
       ORDER BY created_at DESC, rowid DESC",
      InvitationRow::COLUMNS
    );

    self.query_invitations(sql, params).await
  }

  async fn resolve_invitation(
    &self,
    game_id: GameId,
    status: InvitationStatus,
    responded_at: DateTime<Utc>,
    session: Option<GameSession>,
  ) -> Result<bool> {
    let id_str = encode_game_id(game_id);
    let status_str = status.as_str();
    let at_str = encode_dt(responded_at);
    let session_row = session.as_ref().map(SessionRow::from_session).transpose()?;

    let applied = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let updated = tx.execute(
          "UPDATE game_invitations SET status = ?2, responded_at = ?3
           WHERE game_uuid = ?1 AND status = 'pending'",
          rusqlite::params![id_str, status_str, at_str],
        )?;
        if updated == 0 {
          return Ok(false);
        }
        if let Some(row) = &session_row {
          insert_session(&tx, row)?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;
    Ok(applied)
  }

  // ── Sessions ──────────────────────────────────────────────────────────

  async fn get_session(&self, game_id: GameId) -> Result<Option<GameSession>> {
    let sql = format!("SELECT {} FROM multiplayer_games WHERE game_uuid = ?1", SessionRow::COLUMNS);
    let params = vec![encode_game_id(game_id).into()];

    Ok(self.query_sessions(sql, params).await?.into_iter().next())
  }

  async fn list_sessions(&self, user: UserId, active_only: bool) -> Result<Vec<GameSession>> {
    let active_clause = if active_only { "AND game_over = 0" } else { "" };
    let sql = format!(
      "SELECT {} FROM multiplayer_games
       WHERE (white_id = ?1 OR black_id = ?1) {active_clause}
       ORDER BY last_updated DESC",
      SessionRow::COLUMNS
    );

    self.query_sessions(sql, vec![user.0.into()]).await
  }

  async fn stale_sessions(&self, cutoff: DateTime<Utc>) -> Result<Vec<GameSession>> {
    let sql = format!(
      "SELECT {} FROM multiplayer_games
       WHERE game_over = 0 AND last_updated < ?1
       ORDER BY last_updated",
      SessionRow::COLUMNS
    );

    self.query_sessions(sql, vec![encode_dt(cutoff).into()]).await
  }

  async fn commit_move(&self, session: GameSession, record: MoveRecord) -> Result<bool> {
    let row = SessionRow::from_session(&session)?;
    let mv = MoveRow::from_record(&record)?;
    let expected = record.move_number.saturating_sub(1);

    let applied = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let updated = tx.execute(
          "UPDATE multiplayer_games SET
             board_state = ?2, current_turn = ?3, white_captures = ?4, black_captures = ?5,
             aux_state = ?6, game_over = ?7, winner_id = ?8, last_updated = ?9,
             move_count = ?10, termination = ?11, draw_clock = ?12
           WHERE game_uuid = ?1 AND move_count = ?13 AND game_over = 0",
          rusqlite::params![
            row.game_uuid,
            row.board_state,
            row.current_turn,
            row.white_captures,
            row.black_captures,
            row.aux_state,
            row.game_over,
            row.winner_id,
            row.last_updated,
            row.move_count,
            row.termination,
            row.draw_clock,
            expected,
          ],
        )?;
        if updated == 0 {
          return Ok(false);
        }

        tx.execute(
          &format!("INSERT INTO game_moves ({}) VALUES (?1, ?2, ?3, ?4, ?5)", MoveRow::COLUMNS),
          rusqlite::params![mv.game_uuid, mv.move_number, mv.player_id, mv.move_data, mv.created_at],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;
    Ok(applied)
  }

  // ── Move log ──────────────────────────────────────────────────────────

  async fn move_history(&self, game_id: GameId) -> Result<Vec<MoveRecord>> {
    let id_str = encode_game_id(game_id);

    let rows: Vec<MoveRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM game_moves WHERE game_uuid = ?1 ORDER BY move_number",
          MoveRow::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], MoveRow::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(MoveRow::into_record).collect()
  }

  // ── Users ─────────────────────────────────────────────────────────────

  async fn purge_user(&self, user: UserId) -> Result<PurgeSummary> {
    let summary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let moves = tx.execute(
          "DELETE FROM game_moves WHERE game_uuid IN
             (SELECT game_uuid FROM multiplayer_games WHERE white_id = ?1 OR black_id = ?1)",
          rusqlite::params![user.0],
        )?;
        let sessions = tx.execute(
          "DELETE FROM multiplayer_games WHERE white_id = ?1 OR black_id = ?1",
          rusqlite::params![user.0],
        )?;
        let invitations = tx.execute(
          "DELETE FROM game_invitations WHERE sender_id = ?1 OR recipient_id = ?1",
          rusqlite::params![user.0],
        )?;
        tx.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![user.0])?;
        tx.commit()?;

        Ok(PurgeSummary {
          invitations: invitations as u64,
          sessions:    sessions as u64,
          moves:       moves as u64,
        })
      })
      .await?;
    Ok(summary)
  }
}

// ─── Directory impl ──────────────────────────────────────────────────────────

impl Directory for SqliteStore {
  type Error = Error;

  async fn user_exists(&self, user: UserId) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row("SELECT 1 FROM users WHERE id = ?1", rusqlite::params![user.0], |_| Ok(()))
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn can_message(&self, from: UserId, to: UserId) -> Result<bool> {
    let allowed: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM users WHERE id IN (?1, ?2) AND can_message = 1",
          rusqlite::params![from.0, to.0],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(from != to && allowed == 2)
  }
}

//! SQL schema for the Parlor SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- The user directory. Owned by the host application; purging a user deletes its row.
CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    can_message INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS game_invitations (
    game_uuid    TEXT PRIMARY KEY,
    sender_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    recipient_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    game_type    TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'pending',  -- 'pending' | 'accepted' | 'declined'
    created_at   TEXT NOT NULL,
    responded_at TEXT,
    CHECK (sender_id != recipient_id)
);

CREATE TABLE IF NOT EXISTS multiplayer_games (
    game_uuid      TEXT PRIMARY KEY,
    game_type      TEXT NOT NULL,
    white_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    black_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    board_state    TEXT NOT NULL,              -- JSON, row 0 is rank 8
    current_turn   TEXT NOT NULL,              -- 'w' | 'b'
    white_captures INTEGER NOT NULL DEFAULT 0,
    black_captures INTEGER NOT NULL DEFAULT 0,
    aux_state      TEXT NOT NULL,              -- JSON: castling, en passant, last move
    game_over      INTEGER NOT NULL DEFAULT 0,
    winner_id      INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_at     TEXT NOT NULL,
    last_updated   TEXT NOT NULL,
    move_count     INTEGER NOT NULL DEFAULT 0,
    termination    TEXT,
    draw_clock     TEXT NOT NULL               -- JSON: halfmove, fullmove, positions
);

-- Append-only. Rows go away only with their game.
CREATE TABLE IF NOT EXISTS game_moves (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    game_uuid   TEXT NOT NULL REFERENCES multiplayer_games(game_uuid) ON DELETE CASCADE,
    move_number INTEGER NOT NULL,
    player_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    move_data   TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (game_uuid, move_number)
);

CREATE INDEX IF NOT EXISTS invitations_sender_idx    ON game_invitations(sender_id);
CREATE INDEX IF NOT EXISTS invitations_recipient_idx ON game_invitations(recipient_id, status);

-- At most one pending invitation per unordered pair and game type.
CREATE UNIQUE INDEX IF NOT EXISTS invitations_pending_pair_idx ON game_invitations(
    min(sender_id, recipient_id), max(sender_id, recipient_id), game_type
) WHERE status = 'pending';

CREATE INDEX IF NOT EXISTS games_white_idx           ON multiplayer_games(white_id);
CREATE INDEX IF NOT EXISTS games_black_idx           ON multiplayer_games(black_id);
CREATE INDEX IF NOT EXISTS games_active_idx          ON multiplayer_games(game_over, last_updated);

PRAGMA user_version = 1;
";

//! v001 -- Initial schema creation.
//!
//! Creates the seven core tables: `users`, `credentials`, `link_requests`,
//! `connections`, `messages`, `posts`, and `reports`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (profiles)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY NOT NULL,  -- opaque id, issued at sign-up
    full_name       TEXT NOT NULL DEFAULT '',
    email           TEXT NOT NULL UNIQUE,       -- institutional address, lowercase
    photo_url       TEXT,
    department      TEXT,
    college_name    TEXT,
    graduation_year INTEGER,
    bio             TEXT,
    achievements    TEXT,
    created_at      TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Credentials (auth boundary: digest, verification state)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS credentials (
    user_id            TEXT PRIMARY KEY NOT NULL,  -- FK -> users(id)
    email              TEXT NOT NULL UNIQUE,
    password_digest    TEXT NOT NULL,              -- keyed BLAKE3, hex
    verified           INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    verification_token TEXT,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Link requests (directed; primary key preserves direction)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS link_requests (
    id          TEXT PRIMARY KEY NOT NULL,  -- "{from}_{to}", unsorted
    from_id     TEXT NOT NULL,
    to_id       TEXT NOT NULL,
    from_name   TEXT NOT NULL,              -- denormalized snapshot
    to_name     TEXT NOT NULL,
    from_avatar TEXT,
    to_avatar   TEXT,
    status      TEXT NOT NULL,              -- pending | accepted | rejected
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_link_requests_to_status
    ON link_requests(to_id, status);
CREATE INDEX IF NOT EXISTS idx_link_requests_from ON link_requests(from_id);

-- ----------------------------------------------------------------
-- Connections (symmetric membership; two rows per accepted link)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS connections (
    user_id    TEXT NOT NULL,
    peer_id    TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (user_id, peer_id)
);

-- ----------------------------------------------------------------
-- Messages (append-only, immutable)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id             TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    conversation   TEXT NOT NULL,              -- "{lo}_{hi}", sorted pair
    participant_lo TEXT NOT NULL,              -- structured key components,
    participant_hi TEXT NOT NULL,              -- so the inbox never substring-matches
    sender_id      TEXT NOT NULL,
    text           TEXT,
    image_url      TEXT,
    created_at     INTEGER NOT NULL            -- epoch milliseconds, client clock
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation
    ON messages(conversation, created_at);
CREATE INDEX IF NOT EXISTS idx_messages_lo ON messages(participant_lo);
CREATE INDEX IF NOT EXISTS idx_messages_hi ON messages(participant_hi);

-- ----------------------------------------------------------------
-- Posts (shared feed)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS posts (
    id         TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    author_id  TEXT NOT NULL,
    caption    TEXT,
    image_url  TEXT,
    likes      INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at DESC);

-- ----------------------------------------------------------------
-- Reports (issue reports)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS reports (
    id          TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    reporter_id TEXT NOT NULL,
    description TEXT NOT NULL,
    image_url   TEXT,
    created_at  TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

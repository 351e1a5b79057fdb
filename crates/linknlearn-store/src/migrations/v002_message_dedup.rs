use rusqlite::Connection;

const UP_SQL: &str = r#"
-- Client-generated deduplication token per send attempt, so a retried send
-- after a transient failure cannot duplicate a message.
ALTER TABLE messages ADD COLUMN dedup_token TEXT;

CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_dedup
    ON messages(conversation, sender_id, dedup_token)
    WHERE dedup_token IS NOT NULL;
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

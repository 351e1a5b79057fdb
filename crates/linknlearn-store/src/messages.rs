//! Append and query operations for conversation [`Message`] streams.

use linknlearn_shared::{ConversationId, UserId};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::{ChatPreview, Message};
use crate::users::{conversion_err, parse_user_id};

impl Database {
    /// Append a message to its conversation's stream.
    ///
    /// Messages are immutable once written. An optional `dedup_token`
    /// makes a retried send idempotent: if a message with the same token
    /// already exists in this conversation from this sender, the stored
    /// message is returned instead of a duplicate being appended.
    pub fn append_message(&self, message: &Message, dedup_token: Option<&str>) -> Result<Message> {
        let (lo, hi) = message.conversation.participants();

        let affected = self.conn().execute(
            "INSERT INTO messages
                 (id, conversation, participant_lo, participant_hi,
                  sender_id, text, image_url, created_at, dedup_token)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (conversation, sender_id, dedup_token)
                 WHERE dedup_token IS NOT NULL
                 DO NOTHING",
            params![
                message.id.to_string(),
                message.conversation.as_str(),
                lo.as_str(),
                hi.as_str(),
                message.sender_id.as_str(),
                message.text,
                message.image_url,
                message.created_at,
                dedup_token,
            ],
        )?;

        if affected == 0 {
            // Retry hit: hand back the original append.
            let token = dedup_token.unwrap_or_default();
            tracing::debug!(conversation = %message.conversation, token, "duplicate send suppressed");
            return self
                .conn()
                .query_row(
                    &format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE conversation = ?1 AND sender_id = ?2 AND dedup_token = ?3"
                    ),
                    params![message.conversation.as_str(), message.sender_id.as_str(), token],
                    row_to_message,
                )
                .map_err(crate::users::not_found);
        }

        Ok(message.clone())
    }

    /// Full message history for one conversation, ascending by the
    /// sender-supplied timestamp with insertion order as tiebreak.
    pub fn messages_in(&self, conversation: &ConversationId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;

        let rows = stmt.query_map(params![conversation.as_str()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// The user's inbox: every conversation they participate in, each
    /// represented by its chronologically-last message, newest
    /// conversation first.
    ///
    /// Participation is an exact match on the structured participant
    /// columns; the composite key is never substring-matched.
    pub fn inbox_of(&self, user: &UserId) -> Result<Vec<ChatPreview>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}, participant_lo, participant_hi
             FROM messages m
             WHERE (m.participant_lo = ?1 OR m.participant_hi = ?1)
               AND m.rowid = (
                   SELECT m2.rowid FROM messages m2
                   WHERE m2.conversation = m.conversation
                   ORDER BY m2.created_at DESC, m2.rowid DESC
                   LIMIT 1
               )
             ORDER BY m.created_at DESC, m.rowid DESC"
        ))?;

        let rows = stmt.query_map(params![user.as_str()], |row| {
            let last = row_to_message(row)?;
            let lo = parse_user_id(6, row.get(6)?)?;
            let hi = parse_user_id(7, row.get(7)?)?;
            Ok((last, lo, hi))
        })?;

        let mut previews = Vec::new();
        for row in rows {
            let (last_message, lo, hi) = row?;
            let peer = if lo == *user { hi } else { lo };
            previews.push(ChatPreview {
                conversation: last_message.conversation.clone(),
                peer,
                last_message,
            });
        }
        Ok(previews)
    }
}

const MESSAGE_COLUMNS: &str = "id, conversation, sender_id, text, image_url, created_at";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let id = Uuid::parse_str(&id_str).map_err(|e| conversion_err(0, e))?;

    let conversation_str: String = row.get(1)?;
    let conversation =
        ConversationId::parse(&conversation_str).map_err(|e| conversion_err(1, e))?;

    Ok(Message {
        id,
        conversation,
        sender_id: parse_user_id(2, row.get(2)?)?,
        text: row.get(3)?,
        image_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}

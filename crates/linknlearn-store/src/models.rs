//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the API layer.

use chrono::{DateTime, Utc};
use linknlearn_shared::{ConversationId, LinkStatus, RequestId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A user's profile. The id is opaque and immutable once issued; every
/// other field is freely editable by its owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub full_name: String,
    /// Institutional email address, stored lowercase.
    pub email: String,
    pub photo_url: Option<String>,
    pub department: Option<String>,
    pub college_name: Option<String>,
    pub graduation_year: Option<i32>,
    pub bio: Option<String>,
    pub achievements: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Partial profile update. Only fields that are `Some` are written; the
/// rest keep their stored value (merge semantics).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub photo_url: Option<String>,
    pub department: Option<String>,
    pub college_name: Option<String>,
    pub graduation_year: Option<i32>,
    pub bio: Option<String>,
    pub achievements: Option<String>,
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Authentication state for one account. Kept separate from [`Profile`]
/// so profile reads never carry the digest around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: UserId,
    pub email: String,
    /// Keyed BLAKE3 digest of the password, hex-encoded.
    pub password_digest: String,
    pub verified: bool,
    /// One-shot token the account holder presents to prove the address.
    /// Cleared once verified.
    pub verification_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Link request
// ---------------------------------------------------------------------------

/// A directed proposal to connect. The primary key preserves direction, so
/// a reversed request is a distinct record.
///
/// Names and avatars are a denormalized snapshot taken at send time and are
/// not kept in sync with later profile edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkRequest {
    pub id: RequestId,
    pub from: UserId,
    pub to: UserId,
    pub from_name: String,
    pub to_name: String,
    pub from_avatar: Option<String>,
    pub to_avatar: Option<String>,
    pub status: LinkStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message. Append-only and immutable; no edit or delete
/// path exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub conversation: ConversationId,
    pub sender_id: UserId,
    pub text: Option<String>,
    pub image_url: Option<String>,
    /// Sender-supplied epoch milliseconds (client clock, not ours).
    pub created_at: i64,
}

/// One inbox row: a conversation the user participates in, with its
/// chronologically-last message as preview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatPreview {
    pub conversation: ConversationId,
    /// The other participant.
    pub peer: UserId,
    pub last_message: Message,
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A feed post. `likes` is the only mutable field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: Uuid,
    pub author_id: UserId,
    pub caption: Option<String>,
    pub image_url: Option<String>,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// An issue report filed by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: UserId,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use linknlearn_shared::ConversationId;

    #[test]
    fn message_serializes_with_string_ids() {
        let a = UserId::parse("u1").unwrap();
        let b = UserId::parse("u2").unwrap();
        let message = Message {
            id: Uuid::nil(),
            conversation: ConversationId::between(&a, &b),
            sender_id: a,
            text: Some("hello".to_string()),
            image_url: None,
            created_at: 100,
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["conversation"], "u1_u2");

        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn post_round_trips_through_json() {
        let post = Post {
            id: Uuid::new_v4(),
            author_id: UserId::parse("u1").unwrap(),
            caption: Some("fest photos".to_string()),
            image_url: None,
            likes: 3,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&post).unwrap();
        let back: Post = serde_json::from_str(&json).unwrap();
        assert_eq!(back, post);
    }
}

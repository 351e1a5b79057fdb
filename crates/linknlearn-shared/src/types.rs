use serde::{Deserialize, Serialize};

use crate::constants::ID_SEPARATOR;
use crate::error::SharedError;

/// Opaque user identifier issued at sign-up, stable for the account's
/// lifetime.
///
/// User ids are embedded in composite request and conversation keys joined
/// with [`ID_SEPARATOR`], so the separator character is rejected at parse
/// time. This is what lets the inbox query split a composite key back into
/// exact components instead of substring-matching it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a raw id string.
    ///
    /// Accepts ASCII alphanumerics and `-`; rejects the empty string and
    /// anything containing the composite-key separator.
    pub fn parse(raw: &str) -> Result<Self, SharedError> {
        if raw.is_empty() {
            return Err(SharedError::InvalidUserId("empty id".into()));
        }
        for c in raw.chars() {
            if !(c.is_ascii_alphanumeric() || c == '-') {
                return Err(SharedError::InvalidUserId(format!(
                    "invalid character {c:?} in id"
                )));
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a directed link request: `from` and `to` joined in
/// sender-then-recipient order.
///
/// Deliberately NOT sorted: a request A -> B and a request B -> A are
/// distinct records. Only a duplicate in the same direction collides, which
/// is exactly how duplicate sends are deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Derive the directed id for a request from `from` to `to`.
    pub fn directed(from: &UserId, to: &UserId) -> Self {
        Self(format!("{}{}{}", from.as_str(), ID_SEPARATOR, to.as_str()))
    }

    /// Parse a stored composite key back into its wrapper.
    pub fn parse(raw: &str) -> Result<Self, SharedError> {
        let (from, to) = split_pair(raw)
            .ok_or_else(|| SharedError::InvalidRequestId(raw.to_string()))?;
        Ok(Self::directed(&from, &to))
    }

    /// The `(from, to)` components of the key.
    pub fn participants(&self) -> (UserId, UserId) {
        // Construction guarantees the key splits cleanly.
        split_pair(&self.0).unwrap_or_else(|| unreachable!("malformed request id"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical identifier of a 1:1 conversation: the two participant ids in
/// lexicographic order, joined with the separator.
///
/// Symmetric by construction: `between(a, b) == between(b, a)`. Contrast
/// with [`RequestId`], which preserves direction on purpose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Derive the conversation id for an unordered pair of participants.
    pub fn between(a: &UserId, b: &UserId) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{}{}{}", lo.as_str(), ID_SEPARATOR, hi.as_str()))
    }

    /// Parse a stored composite key, verifying its components are ordered.
    pub fn parse(raw: &str) -> Result<Self, SharedError> {
        let (lo, hi) = split_pair(raw)
            .ok_or_else(|| SharedError::InvalidConversationId(raw.to_string()))?;
        if lo > hi {
            return Err(SharedError::InvalidConversationId(raw.to_string()));
        }
        Ok(Self::between(&lo, &hi))
    }

    /// The participants as `(low, high)` in key order.
    pub fn participants(&self) -> (UserId, UserId) {
        split_pair(&self.0).unwrap_or_else(|| unreachable!("malformed conversation id"))
    }

    /// Whether `user` is one of the two participants (exact component
    /// comparison, never a substring test).
    pub fn involves(&self, user: &UserId) -> bool {
        let (lo, hi) = self.participants();
        lo == *user || hi == *user
    }

    /// The participant that is not `user`, if `user` participates at all.
    pub fn peer_of(&self, user: &UserId) -> Option<UserId> {
        let (lo, hi) = self.participants();
        if lo == *user {
            Some(hi)
        } else if hi == *user {
            Some(lo)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn split_pair(raw: &str) -> Option<(UserId, UserId)> {
    let (a, b) = raw.split_once(ID_SEPARATOR)?;
    let a = UserId::parse(a).ok()?;
    let b = UserId::parse(b).ok()?;
    Some((a, b))
}

/// Lifecycle state of a link request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Pending,
    Accepted,
    Rejected,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, SharedError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(SharedError::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    #[test]
    fn user_id_rejects_separator_and_empty() {
        assert!(UserId::parse("").is_err());
        assert!(UserId::parse("a_b").is_err());
        assert!(UserId::parse("has space").is_err());
        assert!(UserId::parse("abc-123").is_ok());
    }

    #[test]
    fn conversation_id_is_order_independent() {
        let a = uid("u1");
        let b = uid("u2");
        assert_eq!(ConversationId::between(&a, &b), ConversationId::between(&b, &a));
        assert_eq!(ConversationId::between(&a, &b).as_str(), "u1_u2");
    }

    #[test]
    fn conversation_id_never_collides_with_a_bare_id() {
        let a = uid("alice");
        let b = uid("bob");
        let id = ConversationId::between(&a, &b);
        assert_ne!(id.as_str(), a.as_str());
        assert_ne!(id.as_str(), b.as_str());
    }

    #[test]
    fn request_id_preserves_direction() {
        let a = uid("u1");
        let b = uid("u2");
        let forward = RequestId::directed(&a, &b);
        let reverse = RequestId::directed(&b, &a);
        assert_ne!(forward, reverse);
        assert_eq!(forward.as_str(), "u1_u2");
        assert_eq!(reverse.as_str(), "u2_u1");
    }

    #[test]
    fn request_id_round_trips_participants() {
        let id = RequestId::directed(&uid("sender"), &uid("recipient"));
        let (from, to) = id.participants();
        assert_eq!(from.as_str(), "sender");
        assert_eq!(to.as_str(), "recipient");
    }

    #[test]
    fn conversation_membership_is_structural() {
        // "u1" must not match inside "u11_u2" the way a substring test would.
        let id = ConversationId::between(&uid("u11"), &uid("u2"));
        assert!(!id.involves(&uid("u1")));
        assert!(id.involves(&uid("u11")));
        assert_eq!(id.peer_of(&uid("u2")), Some(uid("u11")));
        assert_eq!(id.peer_of(&uid("u1")), None);
    }

    #[test]
    fn conversation_parse_rejects_unordered_keys() {
        assert!(ConversationId::parse("u1_u2").is_ok());
        assert!(ConversationId::parse("u2_u1").is_err());
        assert!(ConversationId::parse("solo").is_err());
    }

    #[test]
    fn status_round_trip() {
        for s in [LinkStatus::Pending, LinkStatus::Accepted, LinkStatus::Rejected] {
            assert_eq!(LinkStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(LinkStatus::parse("cancelled").is_err());
    }
}

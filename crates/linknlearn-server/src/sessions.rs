//! Bearer-token sessions.
//!
//! The session store is the explicit replacement for the original
//! application's ambient mutable "current user": a [`Session`] is created
//! once at sign-in, is immutable while held, and disappears at sign-out.
//! Authenticated endpoints resolve the bearer token from the
//! `Authorization` header to the caller's id; nothing else carries
//! identity.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use linknlearn_shared::UserId;
use uuid::Uuid;

use crate::error::ApiError;

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
}

/// In-memory token -> session map, shared across handlers.
#[derive(Debug, Clone, Default)]
pub struct Sessions {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh opaque token for `user`.
    pub fn issue(&self, user_id: UserId) -> String {
        let token = Uuid::new_v4().to_string();
        let session = Session {
            user_id,
            issued_at: Utc::now(),
        };
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.clone(), session);
        token
    }

    /// Resolve a token to its session, if still signed in.
    pub fn resolve(&self, token: &str) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(token)
            .cloned()
    }

    /// Drop a token at sign-out. Unknown tokens are ignored.
    pub fn revoke(&self, token: &str) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(token);
    }

    /// Authenticate a request from its `Authorization: Bearer` header.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Session, ApiError> {
        let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
        self.resolve(token).ok_or(ApiError::Unauthorized)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    auth.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    #[test]
    fn issue_resolve_revoke() {
        let sessions = Sessions::new();
        let token = sessions.issue(uid("u1"));

        let session = sessions.resolve(&token).unwrap();
        assert_eq!(session.user_id, uid("u1"));
        assert!(session.issued_at <= Utc::now());

        sessions.revoke(&token);
        assert!(sessions.resolve(&token).is_none());
    }

    #[test]
    fn authenticate_reads_bearer_header() {
        let sessions = Sessions::new();
        let token = sessions.issue(uid("u1"));

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(sessions.authenticate(&headers).unwrap().user_id, uid("u1"));

        // Missing or malformed headers are unauthorized.
        assert!(sessions.authenticate(&HeaderMap::new()).is_err());
        let mut bad = HeaderMap::new();
        bad.insert("authorization", HeaderValue::from_static("Basic xyz"));
        assert!(sessions.authenticate(&bad).is_err());
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let sessions = Sessions::new();
        let t1 = sessions.issue(uid("u1"));
        let t2 = sessions.issue(uid("u1"));
        assert_ne!(t1, t2);
    }
}

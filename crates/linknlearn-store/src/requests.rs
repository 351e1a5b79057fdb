//! The connection graph: directed link requests and the symmetric
//! connection relation they produce once accepted.

use chrono::Utc;
use linknlearn_shared::{LinkStatus, RequestId, UserId};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{LinkRequest, Profile};
use crate::users::{not_found, parse_timestamp, parse_user_id};

impl Database {
    // ------------------------------------------------------------------
    // Send
    // ------------------------------------------------------------------

    /// Propose a link from `from` to `to`.
    ///
    /// The record id is the directed composite key, so a duplicate send in
    /// the same direction finds the existing row and becomes a no-op
    /// (returns `false`); a reversed request is a distinct record. The
    /// sender's and recipient's display name and avatar are snapshotted
    /// into the request and never updated afterwards.
    pub fn send_link_request(&self, from: &Profile, to: &Profile) -> Result<bool> {
        let id = RequestId::directed(&from.id, &to.id);

        // "Already exists" covers any status: a settled request blocks
        // re-sends until the record is removed.
        let affected = self.conn().execute(
            "INSERT INTO link_requests
                 (id, from_id, to_id, from_name, to_name, from_avatar, to_avatar, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (id) DO NOTHING",
            params![
                id.as_str(),
                from.id.as_str(),
                to.id.as_str(),
                from.full_name,
                to.full_name,
                from.photo_url,
                to.photo_url,
                LinkStatus::Pending.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        if affected > 0 {
            tracing::debug!(request = %id, "link request created");
        }
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Accept / reject / cancel
    // ------------------------------------------------------------------

    /// Accept a pending request and establish the symmetric connection.
    ///
    /// The status flip and both reciprocal membership writes run in one
    /// transaction, so `B ∈ connections(A) ⇔ A ∈ connections(B)` cannot be
    /// broken by a partial failure.
    pub fn accept_link_request(&mut self, id: &RequestId) -> Result<LinkRequest> {
        let tx = self.conn_mut().transaction()?;

        let affected = tx.execute(
            "UPDATE link_requests SET status = 'accepted'
             WHERE id = ?1 AND status = 'pending'",
            params![id.as_str()],
        )?;
        if affected == 0 {
            // Either unknown or already settled; distinguish for the caller.
            drop(tx);
            return match self.get_link_request(id) {
                Ok(existing) => Err(StoreError::Conflict(format!(
                    "request already {}",
                    existing.status
                ))),
                Err(e) => Err(e),
            };
        }

        let (from, to) = id.participants();
        let now = Utc::now().to_rfc3339();
        for (user, peer) in [(&from, &to), (&to, &from)] {
            tx.execute(
                "INSERT INTO connections (user_id, peer_id, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, peer_id) DO NOTHING",
                params![user.as_str(), peer.as_str(), now],
            )?;
        }

        tx.commit()?;
        tracing::info!(request = %id, "link request accepted");
        self.get_link_request(id)
    }

    /// Reject a pending request. No membership change.
    pub fn reject_link_request(&self, id: &RequestId) -> Result<LinkRequest> {
        let affected = self.conn().execute(
            "UPDATE link_requests SET status = 'rejected'
             WHERE id = ?1 AND status = 'pending'",
            params![id.as_str()],
        )?;
        if affected == 0 {
            return match self.get_link_request(id) {
                Ok(existing) => Err(StoreError::Conflict(format!(
                    "request already {}",
                    existing.status
                ))),
                Err(e) => Err(e),
            };
        }
        self.get_link_request(id)
    }

    /// Cancel (delete) a pending request. A settled request cannot be
    /// cancelled; the caller gets a conflict instead of a silent no-op.
    pub fn cancel_link_request(&self, id: &RequestId) -> Result<()> {
        let affected = self.conn().execute(
            "DELETE FROM link_requests WHERE id = ?1 AND status = 'pending'",
            params![id.as_str()],
        )?;
        if affected == 0 {
            let existing = self.get_link_request(id)?;
            return Err(StoreError::Conflict(format!(
                "request already {}",
                existing.status
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single request by its directed id.
    pub fn get_link_request(&self, id: &RequestId) -> Result<LinkRequest> {
        self.conn()
            .query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM link_requests WHERE id = ?1"),
                params![id.as_str()],
                row_to_request,
            )
            .map_err(not_found)
    }

    /// Pending requests addressed to `user`, in arrival order.
    pub fn pending_requests_for(&self, user: &UserId) -> Result<Vec<LinkRequest>> {
        self.query_requests(
            &format!(
                "SELECT {REQUEST_COLUMNS} FROM link_requests
                 WHERE to_id = ?1 AND status = 'pending'
                 ORDER BY created_at ASC, rowid ASC"
            ),
            user,
        )
    }

    /// All requests sent by `user`, any status.
    pub fn sent_requests_of(&self, user: &UserId) -> Result<Vec<LinkRequest>> {
        self.query_requests(
            &format!(
                "SELECT {REQUEST_COLUMNS} FROM link_requests
                 WHERE from_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ),
            user,
        )
    }

    /// Ids of everyone `user` is connected to, derived from accepted
    /// requests in either direction, deduplicated.
    pub fn connection_ids_of(&self, user: &UserId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT to_id FROM link_requests WHERE status = 'accepted' AND from_id = ?1
             UNION
             SELECT from_id FROM link_requests WHERE status = 'accepted' AND to_id = ?1",
        )?;

        let rows = stmt.query_map(params![user.as_str()], |row| parse_user_id(0, row.get(0)?))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// Whether the symmetric connection `a <-> b` is established.
    pub fn is_connected(&self, a: &UserId, b: &UserId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM connections WHERE user_id = ?1 AND peer_id = ?2",
            params![a.as_str(), b.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn query_requests(&self, sql: &str, user: &UserId) -> Result<Vec<LinkRequest>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(params![user.as_str()], row_to_request)?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    }
}

const REQUEST_COLUMNS: &str =
    "id, from_id, to_id, from_name, to_name, from_avatar, to_avatar, status, created_at";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`LinkRequest`].
fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<LinkRequest> {
    let id_str: String = row.get(0)?;
    let id = RequestId::parse(&id_str)
        .map_err(|e| crate::users::conversion_err(0, e))?;
    let status_str: String = row.get(7)?;
    let status = LinkStatus::parse(&status_str)
        .map_err(|e| crate::users::conversion_err(7, e))?;

    Ok(LinkRequest {
        id,
        from: parse_user_id(1, row.get(1)?)?,
        to: parse_user_id(2, row.get(2)?)?,
        from_name: row.get(3)?,
        to_name: row.get(4)?,
        from_avatar: row.get(5)?,
        to_avatar: row.get(6)?,
        status,
        created_at: parse_timestamp(8, row.get(8)?)?,
    })
}

//! The connection graph: directed link requests and the symmetric
//! connections they become.
//!
//! Request ids preserve direction (`from_to`), so who asked whom is never
//! lost. Accepting is the only way a connection comes into existence, and
//! the store does that atomically.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use linknlearn_shared::{LinkStatus, RequestId, UserId};
use linknlearn_store::{LinkRequest, StoreError};

use crate::api::profiles::ProfileDto;
use crate::api::AppState;
use crate::error::ApiError;
use crate::watch::{sse_stream, StreamHub, EVENT_REQUESTS_CHANGED};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequestDto {
    pub id: RequestId,
    pub from: UserId,
    pub to: UserId,
    pub from_name: String,
    pub to_name: String,
    pub from_avatar: Option<String>,
    pub to_avatar: Option<String>,
    pub status: LinkStatus,
    pub created_at: String,
}

impl From<LinkRequest> for LinkRequestDto {
    fn from(r: LinkRequest) -> Self {
        Self {
            id: r.id,
            from: r.from,
            to: r.to,
            from_name: r.from_name,
            to_name: r.to_name,
            from_avatar: r.from_avatar,
            to_avatar: r.to_avatar,
            status: r.status,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendLinkRequest {
    pub to_user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendLinkResponse {
    /// False when a request for this directed pair already existed; the
    /// existing record is left untouched.
    pub created: bool,
    pub request_id: RequestId,
}

/// Send a link request to another user. Sending to a pair that already
/// has a record (any status) is a no-op.
pub async fn send(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SendLinkRequest>,
) -> Result<Json<SendLinkResponse>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let to = UserId::parse(&req.to_user_id).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if to == session.user_id {
        return Err(ApiError::BadRequest(
            "Cannot send a link request to yourself".to_string(),
        ));
    }

    let (created, request_id) = {
        let db = state.db();
        let from_profile = db.get_profile(&session.user_id)?;
        let to_profile = db.get_profile(&to)?;
        let created = db.send_link_request(&from_profile, &to_profile)?;
        (created, RequestId::directed(&session.user_id, &to))
    };

    if created {
        tracing::info!(from = %session.user_id, to = %to, "link request sent");
        notify_requests_changed(&state, &to);
    }

    Ok(Json(SendLinkResponse {
        created,
        request_id,
    }))
}

/// Requests waiting on the caller's decision, oldest first.
pub async fn pending(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<LinkRequestDto>>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let rows = state.db().pending_requests_for(&session.user_id)?;
    Ok(Json(rows.into_iter().map(LinkRequestDto::from).collect()))
}

/// Live stream of changes to the caller's pending-request list.
pub async fn pending_events(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let receiver = state
        .hub
        .subscribe(&StreamHub::requests_topic(&session.user_id));
    Ok(sse_stream(receiver))
}

/// Requests the caller has sent, regardless of status.
pub async fn sent(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<LinkRequestDto>>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let rows = state.db().sent_requests_of(&session.user_id)?;
    Ok(Json(rows.into_iter().map(LinkRequestDto::from).collect()))
}

/// The caller's connections, resolved to profiles. Accounts that have
/// since disappeared are skipped rather than failing the whole list.
pub async fn connections(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProfileDto>>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let db = state.db();
    let ids = db.connection_ids_of(&session.user_id)?;
    let mut profiles = Vec::with_capacity(ids.len());
    for id in ids {
        match db.get_profile(&id) {
            Ok(p) => profiles.push(ProfileDto::from(p)),
            Err(StoreError::NotFound) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Json(profiles))
}

/// Accept a pending request addressed to the caller. Both sides become
/// connected in the same transaction that flips the status.
pub async fn accept(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<LinkRequestDto>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let id = RequestId::parse(&id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let updated = {
        let mut db = state.db();
        let existing = db.get_link_request(&id)?;
        if existing.to != session.user_id {
            return Err(ApiError::Forbidden(
                "Only the recipient can accept a link request".to_string(),
            ));
        }
        db.accept_link_request(&id)?
    };

    tracing::info!(request = %updated.id, "link request accepted");
    notify_requests_changed(&state, &updated.from);
    notify_requests_changed(&state, &updated.to);
    Ok(Json(updated.into()))
}

/// Decline a pending request addressed to the caller. The record stays
/// around with `rejected` status, so the sender cannot immediately re-send.
pub async fn reject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<LinkRequestDto>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let id = RequestId::parse(&id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let updated = {
        let db = state.db();
        let existing = db.get_link_request(&id)?;
        if existing.to != session.user_id {
            return Err(ApiError::Forbidden(
                "Only the recipient can reject a link request".to_string(),
            ));
        }
        db.reject_link_request(&id)?
    };

    notify_requests_changed(&state, &updated.from);
    notify_requests_changed(&state, &updated.to);
    Ok(Json(updated.into()))
}

/// Withdraw a pending request the caller sent. Deletes the record, so a
/// fresh request to the same person becomes possible again.
pub async fn cancel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let id = RequestId::parse(&id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let to = {
        let db = state.db();
        let existing = db.get_link_request(&id)?;
        if existing.from != session.user_id {
            return Err(ApiError::Forbidden(
                "Only the sender can cancel a link request".to_string(),
            ));
        }
        db.cancel_link_request(&id)?;
        existing.to
    };

    tracing::info!(request = %id, "link request cancelled");
    notify_requests_changed(&state, &to);
    Ok(Json(serde_json::json!({ "cancelled": true })))
}

fn notify_requests_changed(state: &AppState, user: &UserId) {
    state.hub.publish(
        &StreamHub::requests_topic(user),
        EVENT_REQUESTS_CHANGED,
        &serde_json::json!({ "userId": user }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{seed_user, test_state};

    fn send_req(to: &UserId) -> Json<SendLinkRequest> {
        Json(SendLinkRequest {
            to_user_id: to.to_string(),
        })
    }

    #[tokio::test]
    async fn send_accept_creates_symmetric_connection() {
        let (state, _dir) = test_state().await;
        let (asha, asha_h) = seed_user(&state, "asha", "Asha Rao");
        let (ravi, ravi_h) = seed_user(&state, "ravi", "Ravi Kumar");

        let Json(sent_res) = send(State(state.clone()), asha_h.clone(), send_req(&ravi))
            .await
            .unwrap();
        assert!(sent_res.created);
        assert_eq!(sent_res.request_id, RequestId::directed(&asha, &ravi));

        let Json(pending_list) = pending(State(state.clone()), ravi_h.clone()).await.unwrap();
        assert_eq!(pending_list.len(), 1);
        assert_eq!(pending_list[0].from, asha);

        // Only the recipient may accept.
        let wrong = accept(
            State(state.clone()),
            asha_h.clone(),
            Path(sent_res.request_id.to_string()),
        )
        .await;
        assert!(matches!(wrong, Err(ApiError::Forbidden(_))));

        let Json(accepted) = accept(
            State(state.clone()),
            ravi_h.clone(),
            Path(sent_res.request_id.to_string()),
        )
        .await
        .unwrap();
        assert_eq!(accepted.status, LinkStatus::Accepted);

        let Json(asha_conns) = connections(State(state.clone()), asha_h).await.unwrap();
        let Json(ravi_conns) = connections(State(state), ravi_h).await.unwrap();
        assert_eq!(asha_conns[0].id, ravi);
        assert_eq!(ravi_conns[0].id, asha);
    }

    #[tokio::test]
    async fn duplicate_send_is_a_noop() {
        let (state, _dir) = test_state().await;
        let (_asha, asha_h) = seed_user(&state, "asha", "Asha Rao");
        let (ravi, _ravi_h) = seed_user(&state, "ravi", "Ravi Kumar");

        let Json(first) = send(State(state.clone()), asha_h.clone(), send_req(&ravi))
            .await
            .unwrap();
        let Json(second) = send(State(state), asha_h, send_req(&ravi)).await.unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.request_id, second.request_id);
    }

    #[tokio::test]
    async fn self_request_and_unknown_target_are_rejected() {
        let (state, _dir) = test_state().await;
        let (asha, asha_h) = seed_user(&state, "asha", "Asha Rao");

        let to_self = send(State(state.clone()), asha_h.clone(), send_req(&asha)).await;
        assert!(matches!(to_self, Err(ApiError::BadRequest(_))));

        let to_ghost = send(
            State(state),
            asha_h,
            Json(SendLinkRequest {
                to_user_id: "ghost".to_string(),
            }),
        )
        .await;
        assert!(matches!(
            to_ghost,
            Err(ApiError::Store(StoreError::NotFound))
        ));
    }

    #[tokio::test]
    async fn cancel_frees_the_pair_for_a_new_request() {
        let (state, _dir) = test_state().await;
        let (_asha, asha_h) = seed_user(&state, "asha", "Asha Rao");
        let (ravi, ravi_h) = seed_user(&state, "ravi", "Ravi Kumar");

        let Json(first) = send(State(state.clone()), asha_h.clone(), send_req(&ravi))
            .await
            .unwrap();

        // The recipient cannot cancel.
        let wrong = cancel(
            State(state.clone()),
            ravi_h,
            Path(first.request_id.to_string()),
        )
        .await;
        assert!(matches!(wrong, Err(ApiError::Forbidden(_))));

        cancel(
            State(state.clone()),
            asha_h.clone(),
            Path(first.request_id.to_string()),
        )
        .await
        .unwrap();

        let Json(again) = send(State(state), asha_h, send_req(&ravi)).await.unwrap();
        assert!(again.created);
    }

    #[tokio::test]
    async fn rejection_keeps_the_record_and_blocks_resend() {
        let (state, _dir) = test_state().await;
        let (_asha, asha_h) = seed_user(&state, "asha", "Asha Rao");
        let (ravi, ravi_h) = seed_user(&state, "ravi", "Ravi Kumar");

        let Json(sent_res) = send(State(state.clone()), asha_h.clone(), send_req(&ravi))
            .await
            .unwrap();
        let Json(rejected) = reject(
            State(state.clone()),
            ravi_h,
            Path(sent_res.request_id.to_string()),
        )
        .await
        .unwrap();
        assert_eq!(rejected.status, LinkStatus::Rejected);

        let Json(again) = send(State(state.clone()), asha_h.clone(), send_req(&ravi))
            .await
            .unwrap();
        assert!(!again.created);

        let Json(sent_list) = sent(State(state), asha_h).await.unwrap();
        assert_eq!(sent_list[0].status, LinkStatus::Rejected);
    }

    #[tokio::test]
    async fn send_publishes_to_the_recipients_topic() {
        let (state, _dir) = test_state().await;
        let (_asha, asha_h) = seed_user(&state, "asha", "Asha Rao");
        let (ravi, _ravi_h) = seed_user(&state, "ravi", "Ravi Kumar");

        let mut rx = state.hub.subscribe(&StreamHub::requests_topic(&ravi));
        send(State(state), asha_h, send_req(&ravi)).await.unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event, EVENT_REQUESTS_CHANGED);
        assert_eq!(event.data["userId"], serde_json::json!(ravi.to_string()));
    }
}

//! Profile reads, merge-style updates, and people search.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use linknlearn_shared::UserId;
use linknlearn_store::{Profile, ProfilePatch};

use crate::api::AppState;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub department: Option<String>,
    pub college_name: Option<String>,
    pub graduation_year: Option<i32>,
    pub bio: Option<String>,
    pub achievements: Option<String>,
    pub created_at: String,
}

impl From<Profile> for ProfileDto {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            full_name: p.full_name,
            email: p.email,
            photo_url: p.photo_url,
            department: p.department,
            college_name: p.college_name,
            graduation_year: p.graduation_year,
            bio: p.bio,
            achievements: p.achievements,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

/// Merge-patch body: absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub photo_url: Option<String>,
    pub department: Option<String>,
    pub college_name: Option<String>,
    pub graduation_year: Option<i32>,
    pub bio: Option<String>,
    pub achievements: Option<String>,
}

impl From<UpdateProfileRequest> for ProfilePatch {
    fn from(r: UpdateProfileRequest) -> Self {
        Self {
            full_name: r.full_name,
            photo_url: r.photo_url,
            department: r.department,
            college_name: r.college_name,
            graduation_year: r.graduation_year,
            bio: r.bio,
            achievements: r.achievements,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn get_own(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileDto>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let profile = state.db().get_profile(&session.user_id)?;
    Ok(Json(profile.into()))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ProfileDto>, ApiError> {
    state.sessions.authenticate(&headers)?;
    let id = UserId::parse(&id).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let profile = state.db().get_profile(&id)?;
    Ok(Json(profile.into()))
}

pub async fn update_own(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileDto>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let updated = state.db().update_profile(&session.user_id, &req.into())?;
    tracing::debug!(user = %session.user_id, "profile updated");
    Ok(Json(updated.into()))
}

/// Case-insensitive substring search over name, email, department, and
/// graduation year. The caller is excluded from results.
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ProfileDto>>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let term = query.q.trim();
    if term.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let hits = state.db().search_profiles(term, &session.user_id)?;
    Ok(Json(hits.into_iter().map(ProfileDto::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{authed_headers, seed_user, test_state};

    #[tokio::test]
    async fn update_merges_and_preserves_unset_fields() {
        let (state, _dir) = test_state().await;
        let (user, headers) = seed_user(&state, "asha", "Asha Rao");

        let req = UpdateProfileRequest {
            bio: Some("final year, CSE".to_string()),
            ..Default::default()
        };
        let Json(updated) = update_own(State(state.clone()), headers.clone(), Json(req))
            .await
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("final year, CSE"));
        assert_eq!(updated.full_name, "Asha Rao");

        let Json(fetched) = get_by_id(State(state), headers, Path(user.to_string()))
            .await
            .unwrap();
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn search_excludes_caller_and_blank_query_is_empty() {
        let (state, _dir) = test_state().await;
        let (_asha, headers) = seed_user(&state, "asha", "Asha Rao");
        seed_user(&state, "ravi", "Ravi Kumar");

        let Json(hits) = search(
            State(state.clone()),
            headers.clone(),
            Query(SearchQuery { q: "ra".to_string() }),
        )
        .await
        .unwrap();
        // "ra" matches both names, but the caller never sees themselves.
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].full_name, "Ravi Kumar");

        let Json(none) = search(
            State(state),
            headers,
            Query(SearchQuery { q: "   ".to_string() }),
        )
        .await
        .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn requests_without_session_are_unauthorized() {
        let (state, _dir) = test_state().await;
        let result = get_own(State(state), HeaderMap::new()).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn unknown_profile_is_not_found() {
        let (state, _dir) = test_state().await;
        let (_user, headers) = seed_user(&state, "asha", "Asha Rao");
        let result = get_by_id(State(state), headers, Path("ghost".to_string())).await;
        assert!(matches!(
            result,
            Err(ApiError::Store(linknlearn_store::StoreError::NotFound))
        ));
    }

    #[tokio::test]
    async fn authed_headers_round_trip() {
        let (state, _dir) = test_state().await;
        let (user, headers) = seed_user(&state, "asha", "Asha Rao");
        let extra = authed_headers(&state, &user);
        let Json(a) = get_own(State(state.clone()), headers).await.unwrap();
        let Json(b) = get_own(State(state), extra).await.unwrap();
        assert_eq!(a, b);
    }
}

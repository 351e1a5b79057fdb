//! The campus feed and issue reports.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linknlearn_shared::UserId;
use linknlearn_store::{Post, Report};

use crate::api::AppState;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub id: Uuid,
    pub author_id: UserId,
    pub caption: Option<String>,
    pub image_url: Option<String>,
    pub likes: i64,
    pub created_at: String,
}

impl From<Post> for PostDto {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            author_id: p.author_id,
            caption: p.caption,
            image_url: p.image_url,
            likes: p.likes,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportDto {
    pub id: Uuid,
    pub reporter_id: UserId,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: String,
}

impl From<Report> for ReportDto {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            reporter_id: r.reporter_id,
            description: r.description,
            image_url: r.image_url,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub description: String,
    /// Raw base64 screenshot. Forwarded to the external image host when
    /// one is configured; rejected otherwise.
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// All posts, newest first.
pub async fn list_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PostDto>>, ApiError> {
    state.sessions.authenticate(&headers)?;
    let posts = state.db().list_posts()?;
    Ok(Json(posts.into_iter().map(PostDto::from).collect()))
}

pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<PostDto>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;

    let caption = req.caption.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    let image_url = req.image_url.filter(|u| !u.trim().is_empty());
    if caption.is_none() && image_url.is_none() {
        return Err(ApiError::BadRequest(
            "A post needs a caption or an image".to_string(),
        ));
    }

    let post = Post {
        id: Uuid::new_v4(),
        author_id: session.user_id.clone(),
        caption,
        image_url,
        likes: 0,
        created_at: Utc::now(),
    };
    state.db().create_post(&post)?;
    tracing::debug!(post = %post.id, author = %session.user_id, "post created");
    Ok(Json(post.into()))
}

/// Bump a post's like counter. No per-user tracking, so repeated likes
/// keep counting.
pub async fn like_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PostDto>, ApiError> {
    state.sessions.authenticate(&headers)?;
    let post = state.db().like_post(id)?;
    Ok(Json(post.into()))
}

pub async fn create_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateReportRequest>,
) -> Result<Json<ReportDto>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;

    let description = req.description.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::BadRequest(
            "A report needs a description".to_string(),
        ));
    }

    let image_url = match req.image_base64 {
        Some(image) if !image.trim().is_empty() => Some(state.images.upload_base64(&image).await?),
        _ => None,
    };

    let report = Report {
        id: Uuid::new_v4(),
        reporter_id: session.user_id.clone(),
        description,
        image_url,
        created_at: Utc::now(),
    };
    state.db().create_report(&report)?;
    tracing::info!(report = %report.id, reporter = %session.user_id, "report filed");
    Ok(Json(report.into()))
}

/// The caller's own reports, newest first.
pub async fn list_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ReportDto>>, ApiError> {
    let session = state.sessions.authenticate(&headers)?;
    let reports = state.db().reports_of(&session.user_id)?;
    Ok(Json(reports.into_iter().map(ReportDto::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{seed_user, test_state};

    #[tokio::test]
    async fn posts_list_newest_first_and_likes_accumulate() {
        let (state, _dir) = test_state().await;
        let (_asha, headers) = seed_user(&state, "asha", "Asha Rao");

        let Json(first) = create_post(
            State(state.clone()),
            headers.clone(),
            Json(CreatePostRequest {
                caption: Some("placement drive today".to_string()),
                image_url: None,
            }),
        )
        .await
        .unwrap();
        let Json(second) = create_post(
            State(state.clone()),
            headers.clone(),
            Json(CreatePostRequest {
                caption: None,
                image_url: Some("https://example.com/fest.jpg".to_string()),
            }),
        )
        .await
        .unwrap();

        like_post(State(state.clone()), headers.clone(), Path(first.id))
            .await
            .unwrap();
        let Json(liked) = like_post(State(state.clone()), headers.clone(), Path(first.id))
            .await
            .unwrap();
        assert_eq!(liked.likes, 2);

        let Json(feed) = list_posts(State(state), headers).await.unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].id, second.id);
        assert_eq!(feed[1].likes, 2);
    }

    #[tokio::test]
    async fn empty_post_is_rejected() {
        let (state, _dir) = test_state().await;
        let (_asha, headers) = seed_user(&state, "asha", "Asha Rao");
        let result = create_post(
            State(state),
            headers,
            Json(CreatePostRequest {
                caption: Some("   ".to_string()),
                image_url: None,
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn liking_a_missing_post_is_not_found() {
        let (state, _dir) = test_state().await;
        let (_asha, headers) = seed_user(&state, "asha", "Asha Rao");
        let result = like_post(State(state), headers, Path(Uuid::new_v4())).await;
        assert!(matches!(
            result,
            Err(ApiError::Store(linknlearn_store::StoreError::NotFound))
        ));
    }

    #[tokio::test]
    async fn reports_are_private_to_the_reporter() {
        let (state, _dir) = test_state().await;
        let (_asha, asha_h) = seed_user(&state, "asha", "Asha Rao");
        let (_ravi, ravi_h) = seed_user(&state, "ravi", "Ravi Kumar");

        create_report(
            State(state.clone()),
            asha_h.clone(),
            Json(CreateReportRequest {
                description: "Chat screen crashes on open".to_string(),
                image_base64: None,
            }),
        )
        .await
        .unwrap();

        let Json(asha_reports) = list_reports(State(state.clone()), asha_h).await.unwrap();
        let Json(ravi_reports) = list_reports(State(state), ravi_h).await.unwrap();
        assert_eq!(asha_reports.len(), 1);
        assert!(ravi_reports.is_empty());
    }

    #[tokio::test]
    async fn blank_report_description_is_rejected() {
        let (state, _dir) = test_state().await;
        let (_asha, headers) = seed_user(&state, "asha", "Asha Rao");
        let result = create_report(
            State(state),
            headers,
            Json(CreateReportRequest {
                description: "  ".to_string(),
                image_base64: None,
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use pulse_db::{FeedCursor, PostFilter};
use pulse_types::api::{CreatePostRequest, PostCreatedResponse, PostResponse};

use crate::error::{ApiError, ApiJson, FieldErrors};
use crate::media::MediaKind;
use crate::middleware::{AuthUser, Viewer};
use crate::rows::{normalize_id, post_response};
use crate::state::{AppState, with_db};
use crate::validation;

const MAX_FEED_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor, given together with `before_id`: the `created_at` and `id` of
    /// the last post on the previous page.
    pub before: Option<String>,
    pub before_id: Option<String>,
}

fn default_limit() -> u32 {
    20
}

/// GET /posts: the caller's own posts, newest first.
pub async fn list_posts(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let id = user.id.to_string();
    let entries =
        with_db(&state, move |db| db.load_feed(Some(&id), PostFilter::Author(&id))).await?;

    let posts: Vec<PostResponse> = entries
        .into_iter()
        .map(|entry| post_response(&state.media, entry))
        .collect();
    Ok(Json(posts))
}

/// GET /feed: everyone's posts, newest first, keyset-paginated.
pub async fn feed(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.clamp(1, MAX_FEED_LIMIT);
    let cursor = feed_cursor(query.before.as_deref(), query.before_id.as_deref())?;

    let viewer_id = viewer.user_id();
    let entries = with_db(&state, move |db| {
        db.load_feed(
            viewer_id.as_deref(),
            PostFilter::Recent {
                before: cursor.as_ref().map(|(created_at, id)| FeedCursor {
                    created_at: created_at.as_str(),
                    id: id.as_str(),
                }),
                limit,
            },
        )
    })
    .await?;

    let posts: Vec<PostResponse> = entries
        .into_iter()
        .map(|entry| post_response(&state.media, entry))
        .collect();
    Ok(Json(posts))
}

/// Both halves of the keyset cursor, canonicalized to their stored forms.
/// Either both are given or neither.
fn feed_cursor(
    before: Option<&str>,
    before_id: Option<&str>,
) -> Result<Option<(String, String)>, ApiError> {
    let mut errors = FieldErrors::new();

    let created_at = before.map(|raw| {
        let parsed = raw
            .parse::<DateTime<Utc>>()
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            .map_err(|_| vec!["Enter a valid date/time.".to_string()]);
        errors.check("before", parsed)
    });
    let id = before_id.map(|raw| {
        let parsed = normalize_id(raw).ok_or_else(|| vec!["Must be a valid UUID.".to_string()]);
        errors.check("before_id", parsed)
    });

    match (&created_at, &id) {
        (Some(_), None) => errors.add("before_id", validation::REQUIRED),
        (None, Some(_)) => errors.add("before", validation::REQUIRED),
        _ => {}
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok(created_at.flatten().zip(id.flatten()))
}

pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = validation::validate_post(&req).map_err(ApiError::Validation)?;

    let image = match &input.image {
        Some(image) => Some(state.media.save(MediaKind::PostImage, image).await?),
        None => None,
    };

    let post_id = Uuid::new_v4().to_string();
    let author = user.id.to_string();
    let pid = post_id.clone();
    let stored = image.clone();
    let created = with_db(&state, move |db| {
        db.create_post(&pid, &author, &input.description, stored.as_deref())?;
        db.get_post(Some(&author), &pid)
    })
    .await;

    let entry = match created {
        Ok(Some(entry)) => entry,
        failed => {
            if let Some(path) = &image {
                state.media.remove(path).await;
            }
            return Err(failed.err().unwrap_or_else(|| {
                ApiError::Internal(anyhow::anyhow!("post {} vanished after insert", post_id))
            }));
        }
    };

    info!("User {} created post {}", user.id, post_id);

    Ok((
        StatusCode::CREATED,
        Json(PostCreatedResponse {
            message: "Post created successfully".into(),
            post: post_response(&state.media, entry),
        }),
    ))
}

/// GET /posts/{id}: public; the viewer's reaction is filled in when signed in.
pub async fn get_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = normalize_id(&post_id).ok_or(ApiError::NotFound)?;
    let viewer_id = viewer.user_id();

    let entry = with_db(&state, move |db| db.get_post(viewer_id.as_deref(), &post_id))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(post_response(&state.media, entry)))
}

/// DELETE /posts/{id}: owner only. Reactions and comments cascade.
pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = normalize_id(&post_id).ok_or(ApiError::NotFound)?;

    let pid = post_id.clone();
    let (owner, image) = with_db(&state, move |db| db.get_post_owner(&pid))
        .await?
        .ok_or(ApiError::NotFound)?;

    if owner != user.id.to_string() {
        return Err(ApiError::Forbidden);
    }

    let pid = post_id.clone();
    if !with_db(&state, move |db| db.delete_post(&pid)).await? {
        return Err(ApiError::NotFound);
    }

    if let Some(path) = image {
        state.media.remove(&path).await;
    }

    info!("User {} deleted post {}", user.id, post_id);
    Ok(StatusCode::NO_CONTENT)
}

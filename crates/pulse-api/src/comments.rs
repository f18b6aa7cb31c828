use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use pulse_types::api::{CommentResponse, CreateCommentRequest};

use crate::error::{ApiError, ApiJson};
use crate::middleware::AuthUser;
use crate::rows::{comment_response, normalize_id};
use crate::state::{AppState, with_db};
use crate::validation;

/// GET /posts/{id}/comments: oldest first, readable without signing in.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = normalize_id(&post_id).ok_or(ApiError::NotFound)?;

    let rows = with_db(&state, move |db| db.list_comments(&post_id))
        .await?
        .ok_or(ApiError::NotFound)?;

    let comments: Vec<CommentResponse> = rows.into_iter().map(comment_response).collect();
    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let body = validation::comment_body(req.body.as_deref())
        .map_err(|messages| ApiError::invalid("body", messages))?;
    let post_id = normalize_id(&post_id).ok_or(ApiError::NotFound)?;

    let id = Uuid::new_v4().to_string();
    let author = user.id.to_string();
    let row = with_db(&state, move |db| db.create_comment(&id, &post_id, &author, &body))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok((StatusCode::CREATED, Json(comment_response(row))))
}

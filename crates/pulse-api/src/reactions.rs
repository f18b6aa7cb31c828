use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;

use pulse_types::api::{ToggleReactionRequest, ToggleReactionResponse};

use crate::error::{ApiError, ApiJson};
use crate::middleware::AuthUser;
use crate::rows::normalize_id;
use crate::state::{AppState, with_db};
use crate::validation;

/// POST /posts/{id}/react with `{"action": "like" | "dislike"}`.
/// Answers with the reaction now stored, which may be `none`.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
    ApiJson(req): ApiJson<ToggleReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let action = validation::action(req.action.as_deref())
        .map_err(|messages| ApiError::invalid("action", messages))?;
    let post_id = normalize_id(&post_id).ok_or(ApiError::NotFound)?;

    let uid = user.id.to_string();
    let pid = post_id.clone();
    let reaction = with_db(&state, move |db| db.toggle_reaction(&uid, &pid, action))
        .await?
        .ok_or(ApiError::NotFound)?;

    debug!("User {} reaction on post {} is now {}", user.id, post_id, reaction);

    Ok(Json(ToggleReactionResponse { reaction }))
}

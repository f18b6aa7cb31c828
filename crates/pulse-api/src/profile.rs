use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::Value;
use tracing::info;

use pulse_db::models::ProfileUpdate;
use pulse_types::api::{UpdateProfileRequest, UserResponse};

use crate::error::{ApiError, ApiJson};
use crate::media::MediaKind;
use crate::middleware::AuthUser;
use crate::rows::user_profile;
use crate::state::{AppState, with_db};
use crate::validation;

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let id = user.id.to_string();
    let (row, posts_count) = with_db(&state, move |db| {
        let row = db.get_user_by_id(&id)?;
        let posts_count = db.count_posts_by_user(&id)?;
        Ok((row, posts_count))
    })
    .await?;

    let row = row.ok_or_else(|| ApiError::Authentication("User not found".into()))?;

    Ok(Json(UserResponse {
        message: None,
        user: user_profile(&state.media, &row, posts_count),
    }))
}

/// Partial update for both PATCH and PUT. The email is fixed at signup, so
/// any body that mentions it is refused before anything else is looked at.
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<Value>,
) -> Result<impl IntoResponse, ApiError> {
    if body.get("email").is_some() {
        return Err(ApiError::BadRequest("Email cannot be updated".into()));
    }

    let req: UpdateProfileRequest =
        serde_json::from_value(body).map_err(|e| ApiError::field("body", e.to_string()))?;
    let changes = validation::validate_profile_update(&req, Utc::now().date_naive())
        .map_err(ApiError::Validation)?;

    let new_picture = match &changes.profile_picture {
        Some(image) => Some(state.media.save(MediaKind::ProfilePicture, image).await?),
        None => None,
    };

    let id = user.id.to_string();
    let update = ProfileUpdate {
        full_name: changes.full_name,
        date_of_birth: changes.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
        profile_picture: new_picture.clone(),
    };

    let saved = with_db(&state, move |db| {
        let previous = db.get_user_by_id(&id)?.and_then(|u| u.profile_picture);
        db.update_profile(&id, &update)?;
        let row = db.get_user_by_id(&id)?;
        let posts_count = db.count_posts_by_user(&id)?;
        Ok((previous, row, posts_count))
    })
    .await;

    let (previous, row, posts_count) = match saved {
        Ok((previous, Some(row), posts_count)) => (previous, row, posts_count),
        failed => {
            if let Some(path) = &new_picture {
                state.media.remove(path).await;
            }
            return Err(failed
                .err()
                .unwrap_or_else(|| ApiError::Authentication("User not found".into())));
        }
    };

    if let (Some(old), Some(_)) = (previous, &new_picture) {
        state.media.remove(&old).await;
    }

    info!("User {} updated their profile", user.id);

    Ok(Json(UserResponse {
        message: Some("Profile updated successfully".into()),
        user: user_profile(&state.media, &row, posts_count),
    }))
}

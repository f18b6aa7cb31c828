use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Reaction;

// -- JWT Claims --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims for both token kinds. Refresh tokens are persisted by `jti`
/// so they can be revoked; access tokens are only checked for signature,
/// expiry and type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub token_type: TokenType,
    pub jti: Uuid,
    pub iat: usize,
    pub exp: usize,
}

// -- Media --

/// An inline image upload: original file name plus base64 content.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageUpload {
    pub filename: String,
    pub data: String,
}

// -- Auth --

/// Every field is optional at the wire level so missing ones are reported
/// per field instead of as a single decode failure.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub profile_picture: Option<ImageUpload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserProfile,
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogoutRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// -- Profile --

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub profile_picture: Option<String>,
    pub profile_picture_url: Option<String>,
    pub posts_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: UserProfile,
}

/// Partial update. `email` is rejected before this is decoded.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub profile_picture: Option<ImageUpload>,
}

// -- Posts --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub description: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub description: String,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub user_profile_picture: Option<String>,
    pub likes_count: i64,
    pub dislikes_count: i64,
    /// The viewer's own reaction; `null` for anonymous viewers and for `none`.
    pub user_reaction: Option<Reaction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PostCreatedResponse {
    pub message: String,
    pub post: PostResponse,
}

// -- Reactions --

/// `action` is kept as a string so an invalid choice becomes a field error.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    pub action: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToggleReactionResponse {
    pub reaction: Reaction,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post: Uuid,
    pub user: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

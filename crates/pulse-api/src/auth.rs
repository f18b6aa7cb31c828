use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use pulse_db::models::NewUser;
use pulse_types::api::{
    LoginRequest, LoginResponse, LogoutRequest, MessageResponse, RefreshRequest, RefreshResponse,
    SignupRequest, TokenPair, TokenType, UserResponse,
};

use crate::error::{ApiError, ApiJson, FieldErrors};
use crate::media::MediaKind;
use crate::middleware::AuthUser;
use crate::rows::{parse_uuid, user_profile};
use crate::state::{AppState, blocking, with_db};
use crate::validation::{self, EMAIL_TAKEN};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut taken = FieldErrors::new();
    if let Ok(email) = validation::email(req.email.as_deref()) {
        if with_db(&state, move |db| Ok(db.count_users_with_email(&email)? > 0)).await? {
            taken.add("email", EMAIL_TAKEN);
        }
    }

    let input = match validation::validate_signup(&req, Utc::now().date_naive()) {
        Ok(input) if taken.is_empty() => input,
        Ok(_) => return Err(ApiError::Validation(taken)),
        Err(mut errors) => {
            errors.merge(taken);
            return Err(ApiError::Validation(errors));
        }
    };

    let password = input.password;
    let password_hash = blocking(move || hash_password(&password)).await?;

    let profile_picture = match &input.profile_picture {
        Some(image) => Some(state.media.save(MediaKind::ProfilePicture, image).await?),
        None => None,
    };

    let user_id = Uuid::new_v4().to_string();
    let new_user = NewUser {
        id: user_id.clone(),
        email: input.email.clone(),
        password_hash,
        full_name: input.full_name,
        date_of_birth: input.date_of_birth.format("%Y-%m-%d").to_string(),
        profile_picture: profile_picture.clone(),
    };

    let created = with_db(&state, move |db| {
        if !db.create_user(&new_user)? {
            return Ok(None);
        }
        db.get_user_by_id(&new_user.id)
    })
    .await?;

    let Some(row) = created else {
        // Lost a race against a concurrent signup with the same email.
        if let Some(path) = profile_picture {
            state.media.remove(&path).await;
        }
        return Err(ApiError::Conflict(FieldErrors::single("email", EMAIL_TAKEN)));
    };

    info!("User {} signed up", user_id);

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: Some("User registered successfully".into()),
            user: user_profile(&state.media, &row, 0),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::new();
    let email = errors.check("email", validation::required(req.email.as_deref()));
    let password = errors.check("password", validation::required(req.password.as_deref()));
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::Validation(errors));
    };

    let email = email.trim().to_lowercase();
    let password = password.to_string();

    let (user, posts_count) = with_db(&state, move |db| {
        let Some(user) = db.get_user_by_email(&email)? else {
            return Ok((None, 0));
        };
        let posts_count = db.count_posts_by_user(&user.id)?;
        Ok((Some(user), posts_count))
    })
    .await?;

    let user = user.ok_or_else(|| ApiError::Authentication(INVALID_CREDENTIALS.into()))?;

    let stored_hash = user.password.clone();
    let verified = blocking(move || verify_password(&password, &stored_hash)).await?;
    if !verified {
        warn!("Failed login for {}", user.email);
        return Err(ApiError::Authentication(INVALID_CREDENTIALS.into()));
    }

    let user_id = parse_uuid(&user.id, "user id");
    let access = state.tokens.issue(TokenType::Access, user_id, &user.email)?;
    let refresh = state.tokens.issue(TokenType::Refresh, user_id, &user.email)?;

    let jti = refresh.jti.to_string();
    let owner = user.id.clone();
    let expires_at = refresh.expires_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    with_db(&state, move |db| db.insert_refresh_token(&jti, &owner, &expires_at)).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        user: user_profile(&state.media, &user, posts_count),
        tokens: TokenPair {
            refresh: refresh.token,
            access: access.token,
        },
    }))
}

/// Exchange a live refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::Authentication("Token is invalid or expired".into());

    let claims = state.tokens.decode(&req.refresh, TokenType::Refresh).ok_or_else(invalid)?;

    let jti = claims.jti.to_string();
    let owner = with_db(&state, move |db| db.active_refresh_token_owner(&jti)).await?;
    if owner.as_deref() != Some(claims.sub.to_string().as_str()) {
        return Err(invalid());
    }

    let access = state.tokens.issue(TokenType::Access, claims.sub, &claims.email)?;
    Ok(Json(RefreshResponse {
        access: access.token,
    }))
}

/// Revoke the caller's refresh token. Omitting it is allowed.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<LogoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = req.refresh {
        let invalid = || ApiError::BadRequest("Invalid token".into());

        let claims = state.tokens.decode(&token, TokenType::Refresh).ok_or_else(invalid)?;
        if claims.sub != user.id {
            return Err(invalid());
        }

        let jti = claims.jti.to_string();
        let owner = user.id.to_string();
        let revoked = with_db(&state, move |db| db.revoke_refresh_token(&jti, &owner)).await?;
        if !revoked {
            return Err(invalid());
        }
        info!("User {} logged out", user.id);
    }

    Ok(Json(MessageResponse {
        message: "Logout successful".into(),
    }))
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    // Argon2id with a fresh random salt
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("hashing password: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("stored password hash unreadable: {}", e))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

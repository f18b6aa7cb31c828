use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use pulse_types::api::TokenType;

use crate::error::ApiError;
use crate::state::AppState;

/// The signed-in caller, taken from a valid access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Who is making the request. Anonymous unless a valid bearer token was sent.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<AuthUser>);

impl Viewer {
    pub fn user_id(&self) -> Option<String> {
        self.0.as_ref().map(|user| user.id.to_string())
    }
}

/// Resolve the `Viewer` for every request.
///
/// No `Authorization` header means anonymous. A header that is present but
/// malformed, expired, or carries a refresh token is rejected outright, even
/// on routes that allow anonymous access.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let viewer = match req.headers().get(header::AUTHORIZATION) {
        None => Viewer::default(),
        Some(value) => {
            let token = value
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix("Bearer "))
                .ok_or_else(|| ApiError::Authentication("Invalid authorization header.".into()))?;

            let claims = state
                .tokens
                .decode(token, TokenType::Access)
                .ok_or_else(|| ApiError::Authentication("Token is invalid or expired.".into()))?;

            Viewer(Some(AuthUser {
                id: claims.sub,
                email: claims.email,
            }))
        }
    };

    req.extensions_mut().insert(viewer);
    Ok(next.run(req).await)
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Viewer>()
            .and_then(|viewer| viewer.0.clone())
            .ok_or(ApiError::AuthRequired)
    }
}

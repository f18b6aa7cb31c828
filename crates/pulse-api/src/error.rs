use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Field name → messages, serialized as a plain JSON object.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn extend(&mut self, field: &str, messages: Vec<String>) {
        self.0.entry(field.to_string()).or_default().extend(messages);
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.extend(&field, messages);
        }
    }

    /// Keep the value of a field check, or record its messages.
    pub fn check<T>(&mut self, field: &str, result: Result<T, Vec<String>>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(messages) => {
                self.extend(field, messages);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    /// A uniqueness rule lost a race at insert time.
    #[error("conflicting record")]
    Conflict(FieldErrors),

    #[error("{0}")]
    Authentication(String),

    #[error("Authentication credentials were not provided.")]
    AuthRequired,

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("Not found.")]
    NotFound,

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(FieldErrors::single(field, message))
    }

    /// All messages of one failed field check.
    pub fn invalid(field: &str, messages: Vec<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.extend(field, messages);
        ApiError::Validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            ApiError::Validation(errors) | ApiError::Conflict(errors) => {
                (StatusCode::BAD_REQUEST, json!({ "errors": errors }))
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::Authentication(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": message }))
            }
            ApiError::AuthRequired => (StatusCode::UNAUTHORIZED, json!({ "error": message })),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, json!({ "error": message })),
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::Internal(err) => {
                error!("internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::field("body", rejection.body_text())
    }
}

/// `Json` whose decode failures come back as field errors instead of axum's
/// plain-text rejections.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_group_by_field() {
        let mut errors = FieldErrors::new();
        errors.add("password", "too short");
        errors.add("password", "too common");
        errors.merge(FieldErrors::single("email", "taken"));

        assert_eq!(errors.get("password").unwrap(), ["too short", "too common"]);
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({ "email": ["taken"], "password": ["too short", "too common"] })
        );
    }

    #[test]
    fn internal_errors_do_not_leak() {
        let response = ApiError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn status_codes() {
        let cases = [
            (ApiError::field("x", "bad"), StatusCode::BAD_REQUEST),
            (ApiError::Conflict(FieldErrors::single("email", "taken")), StatusCode::BAD_REQUEST),
            (ApiError::Authentication("nope".into()), StatusCode::UNAUTHORIZED),
            (ApiError::AuthRequired, StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden, StatusCode::FORBIDDEN),
            (ApiError::NotFound, StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}

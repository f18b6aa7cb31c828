use std::sync::Arc;

use tracing::error;

use pulse_db::Database;

use crate::error::ApiError;
use crate::media::MediaStore;
use crate::tokens::TokenSettings;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler may touch. Built once at startup and shared.
pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenSettings,
    pub media: MediaStore,
}

/// Run blocking work (SQLite, password hashing) off the async runtime.
pub async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::Internal)
}

/// `blocking` with a handle on the store.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    blocking(move || f(&state.db)).await
}

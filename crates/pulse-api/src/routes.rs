use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::middleware::authenticate;
use crate::state::AppState;
use crate::{auth, comments, posts, profile, reactions};

/// Base64 images inflate by a third; this leaves room for a 10 MB upload.
const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Every API route. Auth is resolved once per request by `authenticate`;
/// handlers that need a signed-in caller take `AuthUser`.
pub fn router(state: AppState) -> Router {
    let media = ServeDir::new(state.media.root());

    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/token/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route(
            "/profile",
            get(profile::get_profile)
                .patch(profile::update_profile)
                .put(profile::update_profile),
        )
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/{post_id}", get(posts::get_post).delete(posts::delete_post))
        .route("/posts/{post_id}/react", post(reactions::toggle_reaction))
        .route(
            "/posts/{post_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/feed", get(posts::feed))
        .nest_service("/media", media)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

pub mod auth;
pub mod comments;
pub mod error;
pub mod media;
pub mod middleware;
pub mod posts;
pub mod profile;
pub mod reactions;
pub mod routes;
pub mod rows;
pub mod state;
pub mod tokens;
pub mod validation;

pub use routes::router;
pub use state::{AppState, AppStateInner};

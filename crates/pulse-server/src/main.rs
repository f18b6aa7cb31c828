mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use pulse_api::media::MediaStore;
use pulse_api::tokens::TokenSettings;
use pulse_api::{AppState, AppStateInner};

use crate::config::Config;

const DEFAULT_LOG_FILTER: &str = "pulse=debug,pulse_api=debug,pulse_db=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = pulse_db::Database::open(&PathBuf::from(&config.db_path))?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        tokens: TokenSettings {
            secret: config.jwt_secret.clone(),
            access_ttl: chrono::Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: chrono::Duration::days(config.refresh_ttl_days),
        },
        media: MediaStore::new(&config.media_root, &config.public_url),
    });

    let app = pulse_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Pulse server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub media_root: String,
    pub public_url: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl Config {
    /// Read `PULSE_*` variables, falling back to development defaults.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = var("PULSE_JWT_SECRET").unwrap_or_else(|| {
            warn!("PULSE_JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let port = parse_or("PULSE_PORT", 8000)?;

        Ok(Self {
            host: var("PULSE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("PULSE_DB_PATH").unwrap_or_else(|| "pulse.db".into()),
            jwt_secret,
            media_root: var("PULSE_MEDIA_ROOT").unwrap_or_else(|| "media".into()),
            public_url: var("PULSE_PUBLIC_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            access_ttl_minutes: parse_or("PULSE_ACCESS_TTL_MINUTES", 15)?,
            refresh_ttl_days: parse_or("PULSE_REFRESH_TTL_DAYS", 7)?,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid {key} value '{raw}'")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

//! Application configuration, loaded once at startup from the environment
//! and injected everywhere as a value. No process-wide mutable state.

use std::env;

use crate::error::AppError;

pub const DEFAULT_LISTEN_PORT: u16 = 3001;
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_port: u16,
    pub public_base_url: String,
    pub jwt_secret: String,
    pub session_ttl_days: i64,
    pub smtp: SmtpConfig,
    pub media: MediaConfig,
}

fn required(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::config(format!("{name} must be set")))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("{name} is not a valid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Read the full configuration from the environment. `.env` files are
    /// the caller's concern (main loads dotenv before this).
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            listen_port: parsed("LISTEN_PORT", DEFAULT_LISTEN_PORT)?,
            public_base_url: optional("PUBLIC_BASE_URL", "http://localhost:3001"),
            jwt_secret: required("APP_JWT_SECRET")?,
            session_ttl_days: parsed("SESSION_TTL_DAYS", DEFAULT_SESSION_TTL_DAYS)?,
            smtp: SmtpConfig {
                host: optional("SMTP_HOST", "localhost"),
                port: parsed("SMTP_PORT", 25)?,
                from_address: optional("SMTP_FROM", "no-reply@fivecrowns.app"),
            },
            media: MediaConfig {
                url: optional("MEDIA_URL", ""),
                api_key: optional("MEDIA_API_KEY", ""),
                api_secret: required("MEDIA_API_SECRET")?,
            },
        })
    }
}

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u32,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 15 * 60 * 1000,
            max_requests: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub schema_path: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "medstudy".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "medstudy-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60 * 24),
        };
        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            window_ms: env_parse("RATE_LIMIT_WINDOW_MS").unwrap_or(defaults.window_ms),
            max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS").unwrap_or(defaults.max_requests),
        };
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/med-study.db?mode=rwc".into()),
            schema_path: std::env::var("SCHEMA_PATH").unwrap_or_else(|_| "data/schema.sql".into()),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(5),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT").unwrap_or(5000),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|v| !v.trim().is_empty()),
            jwt,
            rate_limit,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

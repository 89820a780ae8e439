use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;

use crate::{
    activity::ActivityLog, auth::jwt::JwtKeys, config::AppConfig, db, rate_limit::RateLimiter,
};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub activity: ActivityLog,
    pub limiter: RateLimiter,
}

impl FromRef<AppState> for ActivityLog {
    fn from_ref(state: &AppState) -> Self {
        state.activity.clone()
    }
}

impl AppState {
    /// Opens the pool, ensures the schema and starts the activity writer.
    /// The returned handle finishes once every clone of the state is dropped.
    pub async fn init(config: AppConfig) -> anyhow::Result<(Self, JoinHandle<()>)> {
        let db = db::connect(&config).await?;
        db::load_schema(&db, &config.schema_path).await?;
        let (activity, writer) = ActivityLog::spawn(db.clone());
        Ok((Self::from_parts(db, Arc::new(config), activity), writer))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>, activity: ActivityLog) -> Self {
        Self {
            jwt: JwtKeys::new(&config.jwt),
            limiter: RateLimiter::new(config.rate_limit.clone()),
            db,
            config,
            activity,
        }
    }

    /// In-memory database, fixed test secret, generous rate limit.
    #[cfg(test)]
    pub async fn fake() -> Self {
        Self::fake_with(|_| {}).await
    }

    #[cfg(test)]
    pub async fn fake_with(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        use crate::config::{JwtConfig, RateLimitConfig};

        let mut config = AppConfig {
            database_url: "sqlite::memory:".into(),
            schema_path: "data/schema.sql".into(),
            db_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            cors_origin: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60 * 24,
            },
            rate_limit: RateLimitConfig {
                window_ms: 60_000,
                max_requests: 10_000,
            },
        };
        tweak(&mut config);

        let db = db::memory_pool().await;
        let (activity, _writer) = ActivityLog::spawn(db.clone());
        Self::from_parts(db, Arc::new(config), activity)
    }
}

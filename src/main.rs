mod activity;
mod admin;
mod app;
mod auth;
mod cards;
mod config;
mod db;
mod error;
mod extract;
mod feedback;
mod questions;
mod rate_limit;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Context;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "medstudy=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env().context("load configuration")?;
    let (state, activity_writer) = AppState::init(config).await?;
    let db = state.db.clone();
    let config = state.config.clone();
    let _sweeper = state.limiter.spawn_sweeper();

    app::serve(app::build_app(state), &config).await?;

    // The router is gone, so the writer sees the queue close once drained.
    if let Err(e) = activity_writer.await {
        tracing::error!(error = %e, "activity writer task failed");
    }
    db.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

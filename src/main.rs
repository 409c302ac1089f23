use std::sync::Arc;
use std::time::Duration;

mod app;
mod auth;
mod cache;
mod config;
mod error;
mod state;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "civitas=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    let _sweeper = cache::spawn_sweeper(
        Arc::clone(&app_state.cache),
        Duration::from_secs(app_state.config.cache.sweep_interval_secs),
    );

    let host = app_state.config.host.clone();
    let port = app_state.config.port;
    let db = app_state.db.clone();

    let app = app::build_app(app_state);
    app::serve(app, &host, port).await?;

    db.close().await;
    tracing::info!("database connection closed, exiting");
    Ok(())
}

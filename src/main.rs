mod admin;
mod ai;
mod app;
mod auth;
mod config;
mod error;
mod state;
mod timefmt;
mod todos;
mod users;

#[cfg(test)]
mod test_support;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "todolist=debug,axum=info,tower_http=info".to_string());
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

    let state = AppState::init().await?;
    state.migrate().await?;
    users::services::seed_admin(&state.db, state.config.admin.as_ref()).await?;

    if state.ai.is_none() {
        tracing::warn!("AI_BASE_URL not set; /ai/process will answer 503");
    }

    app::serve(app::build_app(state)).await
}

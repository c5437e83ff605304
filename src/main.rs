mod admin;
mod app;
mod auth;
mod clock;
mod config;
mod db;
mod error;
mod rate_limit;
mod reports;
mod state;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "miastoalert=debug,axum=info,tower_http=info".to_string());
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

    auth::services::bootstrap_owner(
        app_state.store.as_ref(),
        app_state.clock.as_ref(),
        app_state.config.owner.as_ref(),
    )
    .await?;

    let sweeper = reports::sweeper::spawn(app_state.store.clone(), app_state.clock.clone());

    let result = app::serve(app::build_app(app_state)).await;
    sweeper.abort();
    result
}

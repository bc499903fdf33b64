use anyhow::Context;
use newsroom::{AppState, config::AppConfig, db, routes, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = AppConfig::load().context("failed to load configuration")?;
    telemetry::init_tracing(settings.log_json);

    let store = db::build_store(&settings).await?;
    let state = AppState {
        store,
        config: settings.clone(),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.server_addr))?;
    info!(addr = %settings.server_addr, "newsroom listening");
    axum::serve(listener, app).await?;

    Ok(())
}

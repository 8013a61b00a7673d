use anyhow::Context;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::info;

use video_pipeline::common::{shutdown, telemetry};
use video_pipeline::config::settings::ApiConfig;
use video_pipeline::infrastructure::storage::s3::StorageService;
use video_pipeline::{app, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    telemetry::init_tracing("info,tower_http=debug");

    info!("Starting upload API...");

    let config = ApiConfig::from_env().context("Invalid API configuration")?;
    let storage = StorageService::new(&config.aws);
    let port = config.server_port;

    let app = app::create_app(AppState::new(config, storage));

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    let cancel = CancellationToken::new();
    shutdown::cancel_on_signal(cancel.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

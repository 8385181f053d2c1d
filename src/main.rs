use anyhow::Context;
use tokio::net::TcpListener;

use sage_backend::config::Settings;
use sage_backend::state::AppState;
use sage_backend::{logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;
    logging::init(&settings.server.log_dir);

    let state = AppState::initialize(settings).await?;

    let bind_addr = format!("127.0.0.1:{}", state.settings.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

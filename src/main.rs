use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playscribe::api::{routes::create_router, state::AppState};
use playscribe::browser::ChromiumLauncher;
use playscribe::config::Config;
use playscribe::recording::Recorder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment first so RUST_LOG from .env reaches the filter
    let config = Config::load();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let addr = format!("{}:{}", config.host, config.port);

    let recorder = Arc::new(Recorder::new(Arc::new(ChromiumLauncher::new()), config));
    let state = Arc::new(AppState::new(recorder));
    let app = create_router(state);

    tracing::info!("Playscribe starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

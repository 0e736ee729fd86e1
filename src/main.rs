use collab_hub::routes::create_routes;
use collab_hub::{AppConfig, AppState};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 STARTUP: Starting collaboration platform server...");

    let config = AppConfig::from_env();
    info!("⚙️ STARTUP: Configuration loaded");

    let app_state = AppState::new(config.clone()).await?;
    info!("✅ STARTUP: Application state initialized ({} storage)", app_state.db.storage_name());

    let app = create_routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = TcpListener::bind(config.server_address()).await?;
    info!("🌐 STARTUP: Server running on http://{}", config.server_address());

    axum::serve(listener, app).await?;

    Ok(())
}

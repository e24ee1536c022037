//! Storefront backend server.

use anyhow::Result;
use storefront::{api, application::AppState, config::Config, infrastructure};
use storefront::infrastructure::events::EventPublisher;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "storefront=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let pool = infrastructure::create_pool(&config).await?;
    infrastructure::run_migrations(&pool).await?;
    tracing::info!(max_connections = config.db_max_connections, "Database ready");

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    tracing::info!(nats = events.is_connected(), "Event publishing configured");
    let addr = config.socket_addr();
    let state = AppState::new(config, pool, events);
    let app = api::router(state);

    tracing::info!("🚀 Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

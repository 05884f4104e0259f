//! Toolgate server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use toolgate::api::{routes, AppState};
use toolgate::{db, telemetry, Config, Result};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    telemetry::init_tracing(&config.log_level);

    tracing::info!(database_url = %config.database_url, "Starting toolgate");

    let pool = db::create_pool(&config.database_url).await?;
    db::init(&pool).await?;

    let addr: SocketAddr = config.bind_address.parse()?;
    let state = Arc::new(AppState::new(config, pool));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}

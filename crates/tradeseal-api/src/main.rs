//! # tradeseal-api — Binary Entry Point
//!
//! Starts the proof service. Binds to `PORT` (default 5010). `RUST_LOG`
//! controls the filter; `LOG_FORMAT=json` switches to JSON log lines.

use tracing_subscriber::EnvFilter;
use tradeseal_api::state::{ApiConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = ApiConfig::from_env();
    let port = config.port;
    let app = tradeseal_api::app(AppState::with_config(config));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("proof service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

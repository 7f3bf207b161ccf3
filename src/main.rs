use std::sync::Arc;

use actix_web::web;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sneaker_cart::api::{self, AppState};
use sneaker_cart::config::Config;
use sneaker_cart::engine::CartEngine;
use sneaker_cart::gateways::{InMemoryCatalog, MockAuthProvider, MockPaymentGateway};
use sneaker_cart::metrics::Metrics;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=sneaker_cart=trace cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sneaker_cart=debug"))
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        checkout_timeout_ms = config.engine.checkout_timeout.as_millis() as u64,
        pricing_policy = ?config.engine.pricing_policy,
        "Starting sneaker cart service"
    );

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 2. Gateways ===
    let catalog = Arc::new(InMemoryCatalog::sneakers()?);
    let payments = Arc::new(MockPaymentGateway::default());

    // === 3. Engine ===
    let engine = Arc::new(CartEngine::new(
        catalog,
        payments,
        metrics.clone(),
        config.engine.clone(),
    ));

    let state = web::Data::new(AppState {
        engine,
        auth: Arc::new(MockAuthProvider),
        metrics,
    });

    // === 4. HTTP ===
    tracing::info!("🚀 Listening on http://{}:{}", config.host, config.port);
    api::build_server(state, &config.host, config.port)?.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

mod errors;
mod middleware;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vantage_config::{AppConfig, LogFormat};
use vantage_engine::Engine;
use vantage_results::build_results_manager;
use vantage_scrape::DefaultScraper;
use vantage_state::build_state_store;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "vantage-api")]
#[command(about = "Vantage crawl engine control-plane API")]
struct Args {
    #[arg(long, env = "VANTAGE_BIND_ADDR")]
    bind: Option<String>,
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.api.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);
    match config.api.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_tracing(&config);

    let args = Args::parse();
    let bind_addr = args.bind.unwrap_or_else(|| config.api.bind_addr.clone());

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_addr = %bind_addr,
        "starting vantage-api"
    );

    let state_store = build_state_store(&config.state_store).await?;
    let results_manager = build_results_manager(&config.results).await?;
    let scraper = Arc::new(DefaultScraper::new(&config.scraper)?);

    let engine = Engine::new(
        state_store,
        results_manager,
        scraper,
        config.engine.clone(),
        config.llm_analyzer.clone(),
    );

    let app_state = AppState::new(engine.clone(), &config.seed_fetcher)?;

    let app = routes::router(app_state)
        .layer(axum::middleware::from_fn(
            crate::middleware::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.api.request_timeout_s,
        )))
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(bind_addr = %addr, "vantage-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(engine))
        .await?;

    tracing::info!("vantage-api shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then stops every running crawl and gives
/// in-flight workers `shutdown_grace_s` to drain before returning.
async fn shutdown_signal(engine: Arc<Engine>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }

    engine.shutdown().await;
}

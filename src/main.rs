// src/main.rs
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use traffinity::config;
use traffinity::engine::Engine;
use traffinity::guard::WindowSweeper;
use traffinity::metrics::{serve_metrics, MetricsRegistry};
use traffinity::server::{RequestHandler, ServerBuilder};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("traffinity=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    // Metrics server, if enabled
    let metrics = if config.metrics.enabled {
        let registry = MetricsRegistry::new()?;
        let collector = registry.collector();
        let metrics_addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
        serve_metrics(metrics_addr, Arc::new(registry), config.metrics.path.clone()).await?;
        Some(collector)
    } else {
        None
    };

    // The engine owns all routing state; the serving layer only holds a handle.
    let engine = Arc::new(Engine::new(&config, metrics));

    // Background eviction of idle rate windows
    let sweeper = Arc::new(WindowSweeper::new(
        engine.overload_guard(),
        Duration::from_secs(config.overload.sweep_interval_secs),
    ));
    tokio::spawn(sweeper.clone().start());

    let handler = RequestHandler::new(engine);
    info!("starting traffinity router on {}", config.listen);

    let server = ServerBuilder::new(config.listen).with_handler(handler);

    tokio::select! {
        result = server.serve() => result?,
        _ = shutdown_signal() => {
            sweeper.shutdown();
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

use lanecontrol::api::{self, AppState};
use lanecontrol::catalog::InMemoryCatalog;
use lanecontrol::config::Config;
use lanecontrol::engine::Engine;
use lanecontrol::service::ReservationService;
use lanecontrol::slot::SystemClock;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    lanecontrol::observability::init(config.metrics_port)?;

    // Ensure data directory exists
    std::fs::create_dir_all(&config.data_dir)?;

    let engine = Arc::new(Engine::new(config.wal_path())?);
    let catalog = match &config.catalog_path {
        Some(path) => InMemoryCatalog::from_json_file(path)?,
        None => {
            tracing::warn!("LANECONTROL_CATALOG not set, serving an empty catalog");
            InMemoryCatalog::new()
        }
    };

    let compactor_engine = engine.clone();
    let threshold = config.compact_threshold;
    tokio::spawn(async move {
        lanecontrol::compactor::run_compactor(compactor_engine, threshold).await;
    });

    let service = ReservationService::new(engine, Arc::new(catalog), Arc::new(SystemClock));
    let app = api::router(AppState::new(service));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("lanecontrol listening on {addr}");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  compact_threshold: {}", config.compact_threshold);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    // Graceful shutdown: stop accepting on SIGTERM/ctrl-c, drain in-flight requests
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
            info!("lanecontrol stopped");
            return Ok(());
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received, stopping listener");
        }
    }

    info!("draining requests...");
    let _ = stop_tx.send(());
    match tokio::time::timeout(config.drain_timeout, server).await {
        Ok(result) => {
            result??;
            info!("all requests drained");
        }
        Err(_) => tracing::warn!(
            "drain timeout after {}s, abandoning open requests",
            config.drain_timeout.as_secs()
        ),
    }

    info!("lanecontrol stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}

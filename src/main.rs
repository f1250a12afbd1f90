use std::net::SocketAddr;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info};
use trainhub::logging::{init_tracing, shutdown_tracer};
use trainhub::modules::documents::jobs::DocumentJobService;
use trainhub::metrics::{init_metrics, metrics_app};
use trainhub::router::init_router;
use trainhub::state::init_app_state;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_METRICS_PORT: u16 = 9090;

fn port_from_env(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let state = init_app_state()
        .await
        .context("failed to initialize application state")?;

    sqlx::migrate!("./migrations")
        .run(&state.db)
        .await
        .context("failed to run database migrations")?;
    info!("Database migrations applied");

    DocumentJobService::fail_interrupted_jobs(&state.db)
        .await
        .map_err(|e| e.error)
        .context("failed to recover interrupted document jobs")?;

    if let Some(handle) = init_metrics() {
        let metrics_port = port_from_env("METRICS_PORT", DEFAULT_METRICS_PORT);
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], metrics_port));
        tokio::spawn(async move {
            match TcpListener::bind(metrics_addr).await {
                Ok(listener) => {
                    info!(addr = %metrics_addr, "Metrics server listening");
                    if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                        error!(error = %e, "Metrics server stopped");
                    }
                }
                Err(e) => error!(addr = %metrics_addr, error = %e, "Failed to bind metrics server"),
            }
        });
    }

    let app = init_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port_from_env("PORT", DEFAULT_PORT)));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, "Server running");
    info!("Swagger UI available at http://{addr}/swagger-ui");
    info!("Scalar UI available at http://{addr}/scalar");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    shutdown_tracer().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

//! Admin HTTP surface: health probes, region circuit state, and
//! out-of-band transaction lookup.

pub mod handlers;
pub mod middleware;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::network::{AdminConfig, ConnectionRegistry, ShutdownController};
use crate::routing::HealthRegistry;
use crate::storage::AuthStore;
use handlers::{
    health_handler, liveness_handler, readiness_handler, regions_handler, transaction_handler,
};
use middleware::build_http_layers;

/// Shared state for the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub shutdown: Arc<ShutdownController>,
    pub registry: Arc<ConnectionRegistry>,
    pub health: Arc<HealthRegistry>,
    pub store: Arc<dyn AuthStore>,
    pub start_time: Instant,
}

/// Assembles the admin router.
///
/// Routes:
/// - `GET /health` -- lifecycle state, connections, in-flight, uptime
/// - `GET /health/live` -- liveness probe
/// - `GET /health/ready` -- readiness probe
/// - `GET /regions` -- per-region circuit state and health gauge
/// - `GET /transactions/{stan}` -- audit record lookup
#[must_use]
pub fn build_admin_router(state: AdminState, config: &AdminConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/regions", get(regions_handler))
        .route("/transactions/{stan}", get(transaction_handler))
        .layer(build_http_layers(config))
        .with_state(state)
}

/// Binds the admin listener and serves until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error when the address cannot be bound or the server hits a
/// fatal fault.
pub async fn serve_admin(
    config: AdminConfig,
    state: AdminState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "admin surface listening");

    let router = build_admin_router(state, &config);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

//! Crossbar router daemon: legacy TCP ingress, regional dispatch with
//! circuit-broken failover, workflow orchestration, audit trail, and the
//! admin surface, wired from one configuration file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crossbar_server::admin::{serve_admin, AdminState};
use crossbar_server::audit::JsonFileLog;
use crossbar_server::chaos::ChaosEngine;
use crossbar_server::config::{AppConfig, RegionSettings};
use crossbar_server::dispatch::Dispatcher;
use crossbar_server::network::IsoServer;
use crossbar_server::processor::{
    AuthProcessor, EuWestProcessor, ProcessorMap, StoreBacked, UsEastProcessor,
};
use crossbar_server::router::AuthRouter;
use crossbar_server::routing::{HealthProbe, HealthRegistry, RouteTable};
use crossbar_server::screen::SimpleFraudScreen;
use crossbar_server::storage::{AuthStore, MemoryStore};
use crossbar_server::workflow::{
    Activities, MemoryStateStore, PaymentWorkflow, WorkflowStateStore,
};

#[derive(Debug, Parser)]
#[command(
    name = "crossbar",
    about = "Multi-region payment authorization router",
    version
)]
struct Args {
    /// Path to the configuration file.
    #[arg(long, default_value = "config/routes.yaml")]
    config: PathBuf,

    /// Override the legacy-link listen address.
    #[arg(long)]
    listen: Option<String>,

    /// Override the admin listen address.
    #[arg(long)]
    admin: Option<String>,

    /// Enable chaos fault injection regardless of the config file.
    #[arg(long)]
    chaos: bool,

    /// Directory for the JSON-lines audit log.
    #[arg(long, default_value = "audit")]
    audit_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = if args.config.exists() {
        AppConfig::load(&args.config)?
    } else {
        warn!(path = %args.config.display(), "config file not found, using built-in defaults");
        AppConfig::default()
    };

    if let Some(listen) = args.listen {
        config.network.listen_addr = listen;
    }
    if let Some(admin) = args.admin {
        config.admin.listen_addr = admin;
    }
    if args.chaos {
        config.chaos.enabled = true;
    }
    if config.router.regions.is_empty() {
        apply_demo_topology(&mut config);
    }

    let store: Arc<dyn AuthStore> = Arc::new(MemoryStore::new());
    let audit_log = Arc::new(JsonFileLog::new(&args.audit_dir).await?);

    let table = RouteTable::build(&config.router.bin_routes, &config.router.default_region)?;
    let health = Arc::new(HealthRegistry::new(
        config.router.regions.keys().cloned(),
        config.health.breaker(),
    ));

    let mut processors = ProcessorMap::new();
    let mut timeouts = HashMap::new();
    for (region, settings) in &config.router.regions {
        info!(
            region = %region,
            host = %settings.host,
            port = settings.port,
            timeout_ms = settings.timeout_ms,
            "configured region"
        );
        // Single-binary deployment: each configured region is served by an
        // in-process demo processor behind the same contract a remote
        // client would implement.
        let inner: Arc<dyn AuthProcessor> = if region.contains("eu") {
            Arc::new(EuWestProcessor::new())
        } else {
            Arc::new(UsEastProcessor::new())
        };
        processors.insert(
            region.clone(),
            Arc::new(StoreBacked::new(inner, Arc::clone(&store))) as Arc<dyn AuthProcessor>,
        );
        timeouts.insert(region.clone(), settings.timeout());
    }

    let chaos = if config.chaos.enabled {
        info!(
            probability = config.chaos.fault_probability,
            max_delay_ms = config.chaos.max_delay_ms,
            "chaos fault injection enabled"
        );
        Some(Arc::new(ChaosEngine::new(config.chaos.clone())))
    } else {
        None
    };

    let dispatcher = Arc::new(Dispatcher::new(
        table,
        Arc::clone(&health),
        processors.clone(),
        timeouts,
        config
            .router
            .failover_map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        Arc::clone(&store),
        chaos,
    ));

    let activities = Arc::new(Activities::new(
        Arc::new(SimpleFraudScreen::new()),
        dispatcher,
        audit_log,
        Arc::clone(&store),
    ));
    let workflow = Arc::new(PaymentWorkflow::new(
        activities,
        Arc::new(MemoryStateStore::new()) as Arc<dyn WorkflowStateStore>,
        config.workflow.workflow_config(),
    ));

    let mut server = IsoServer::new(
        config.network.network_config(),
        Arc::new(AuthRouter::new(workflow)),
    );
    let registry = server.registry();
    let shutdown_ctrl = server.shutdown_controller();
    server.start().await?;

    // One shutdown broadcast drives the server, the admin surface, and the
    // probe.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let probe = Arc::new(HealthProbe::new(
        processors,
        Arc::clone(&health),
        config.health.interval(),
    ));
    let probe_handle = probe.spawn(shutdown_rx.clone());

    let admin_state = AdminState {
        shutdown: shutdown_ctrl,
        registry,
        health,
        store: Arc::clone(&store),
        start_time: Instant::now(),
    };
    let admin_handle = {
        let mut rx = shutdown_rx.clone();
        tokio::spawn(serve_admin(config.admin.admin_config(), admin_state, async move {
            let _ = rx.changed().await;
        }))
    };

    let mut rx = shutdown_rx;
    server
        .serve(async move {
            let _ = rx.changed().await;
        })
        .await?;

    if let Err(e) = probe_handle.await {
        warn!(error = %e, "probe task ended abnormally");
    }
    match admin_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "admin surface ended with error"),
        Err(e) => warn!(error = %e, "admin task ended abnormally"),
    }
    store.close().await?;
    info!("shutdown complete");
    Ok(())
}

/// Demo topology used when the config names no regions: two in-process
/// regions with mutual failover.
fn apply_demo_topology(config: &mut AppConfig) {
    info!("no regions configured, applying demo topology");
    config.router.default_region = "us_east".to_string();
    config.router.bin_routes.insert("4".to_string(), "us_east".to_string());
    config.router.bin_routes.insert("5".to_string(), "eu_west".to_string());
    config.router.regions.insert(
        "us_east".to_string(),
        RegionSettings {
            host: "localhost".to_string(),
            port: 50051,
            timeout_ms: 500,
        },
    );
    config.router.regions.insert(
        "eu_west".to_string(),
        RegionSettings {
            host: "localhost".to_string(),
            port: 50052,
            timeout_ms: 800,
        },
    );
    config
        .router
        .failover_map
        .insert("us_east".to_string(), "eu_west".to_string());
    config
        .router
        .failover_map
        .insert("eu_west".to_string(), "us_east".to_string());
}

//! ShopForge Control Plane Entry Point
//!
//! Initializes the registry, cluster tooling, and workflow engine, binds
//! the REST API, and then reconciles any store a previous process left
//! mid-flight.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopforge_cluster::{ChartDeployer, ClusterInspector, HelmClient, KubectlClient};
use shopforge_core::config::AppConfig;
use shopforge_engines::EngineRegistry;
use shopforge_provisioner::{Provisioner, Reconciler};
use shopforge_registry::{Database, StoreRegistry};
use shopforge_server::{create_router, shutdown, AppState};

/// ShopForge - provisions isolated e-commerce stores on Kubernetes
#[derive(Parser, Debug)]
#[command(name = "shopforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to run the server on (overrides config and environment)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind the server to
    #[arg(long)]
    host: Option<String>,
}

/// Initialize the tracing/logging subsystem
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopforge=info,tower_http=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    let config = Arc::new(config);

    info!(
        environment = %config.server.environment,
        max_stores = config.stores.max_stores,
        base_domain = %config.stores.base_domain,
        "Starting ShopForge control plane"
    );

    let db = Database::open(&config.database.path).await?;
    db.health_check().await?;
    info!(path = %config.database.path.display(), "Database ready");
    let registry = StoreRegistry::new(db.pool().clone());

    let engines = Arc::new(EngineRegistry::new(
        &config.stores,
        &config.cluster.helm_chart_path,
    ));
    let deployer: Arc<dyn ChartDeployer> = Arc::new(HelmClient::new(&config.cluster));
    let inspector: Arc<dyn ClusterInspector> = Arc::new(KubectlClient::new(&config.cluster));

    let provisioner = Arc::new(Provisioner::new(
        registry.clone(),
        engines.clone(),
        deployer,
        inspector.clone(),
        config.provisioner.clone(),
    ));

    let state = AppState::new(
        config.clone(),
        registry.clone(),
        engines.clone(),
        provisioner,
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.address()).await?;
    info!(address = %config.server.address(), "API listening");

    // Reconcile after the API is bound so the health endpoint answers
    // while recovery runs
    let reconciler = Reconciler::new(registry, engines, inspector);
    tokio::spawn(async move {
        if let Err(e) = reconciler.run().await {
            error!(error = %e, "Startup reconciliation failed");
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await?;

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

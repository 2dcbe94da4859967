/// Server setup and initialization
///
/// Wires together all components: record store, deployer, registry, sandbox,
/// execution engine and HTTP routes.

use crate::{
    api::{create_invoke_routes, create_registration_routes, AppState},
    config::Config,
    deploy::{LocalDeployer, ResourceNaming},
    runtime::{ExecutionEngine, SandboxLimits, ScriptSandbox},
    workflow::{registry::RegistrySettings, storage::SqliteRecordStore, ScriptRegistry},
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Workflow flavour requested when deploying
const WORKFLOW_TYPE: &str = "EXPRESS";

/// Build shared state from configuration
///
/// The sandbox is created here once and lives for the whole process.
pub async fn create_state(config: &Config) -> Result<AppState> {
    tracing::info!("📁 Ensuring data directory exists: {}", config.database.data_dir);
    std::fs::create_dir_all(&config.database.data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory: {}", e))?;

    let store = SqliteRecordStore::open(&config.database.db_path())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open record store: {}", e))?;

    let naming = ResourceNaming {
        region: config.deployment.region.clone(),
        account_id: config.deployment.account_id.clone(),
    };
    tracing::info!("🏗️ Using in-process deployer for {}/{}", naming.region, naming.account_id);
    let deployer = LocalDeployer::new(naming.clone());

    let registry = Arc::new(ScriptRegistry::new(
        Arc::new(store),
        Arc::new(deployer),
        RegistrySettings {
            engine_address: config.engine.address.clone(),
            role_arn: config.deployment.role_arn.clone(),
            workflow_type: WORKFLOW_TYPE.to_string(),
            naming,
        },
    ));

    tracing::info!(
        "⚙️ Initializing script sandbox (timeout {:?}, memory {} MiB)",
        config.engine.script_timeout(),
        config.engine.script_memory_mb
    );
    let sandbox = Arc::new(ScriptSandbox::new(SandboxLimits {
        timeout: config.engine.script_timeout(),
        memory_limit: config.engine.script_memory_bytes(),
        ..SandboxLimits::default()
    }));
    let engine = Arc::new(ExecutionEngine::new(Arc::clone(&registry), sandbox));

    Ok(AppState { registry, engine })
}

/// Assemble the router around existing state
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .merge(create_registration_routes())
        .merge(create_invoke_routes())
        .with_state(state)
}

/// Create the main Axum application with all routes
pub async fn create_app(config: Config) -> Result<Router> {
    let state = create_state(&config).await?;
    tracing::info!("✅ Application initialized successfully");
    Ok(build_router(state))
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting stepfn server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);
    tracing::info!("Shared engine address: {}", config.engine.address);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}

/// stepfn server entry point
///
/// Loads configuration from the environment (and an optional `.env`) and starts
/// the HTTP server.

use stepfn::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Registration API at /api/registrations
/// - Shared engine invocation at /invoke
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::default();

    start_server(config).await?;

    Ok(())
}

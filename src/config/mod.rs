/// Configuration management for the stepfn service
///
/// Handles server binding, record storage, the shared engine address, deployment
/// naming and script limits.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Shared engine and script limits
    pub engine: EngineConfig,
    /// Orchestration platform naming and role
    pub deployment: DeploymentConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Record store location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding registry.db (default: "data")
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Address rewritten steps invoke
    pub address: String,
    pub script_timeout_ms: u64,
    pub script_memory_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub region: String,
    pub account_id: String,
    /// Role the deployed workflows run under
    pub role_arn: String,
}

impl DatabaseConfig {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("registry.db")
    }
}

impl EngineConfig {
    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }

    pub fn script_memory_bytes(&self) -> usize {
        self.script_memory_mb * 1024 * 1024
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        let region = env_or("AWS_REGION", "us-east-1");
        let account_id = env_or("AWS_ACCOUNT_ID", "000000000000");

        Self {
            server: ServerConfig {
                host: env_or("STEPFN_HOST", "0.0.0.0"),
                port: env_or("STEPFN_PORT", "3004").parse().unwrap_or(3004),
            },
            database: DatabaseConfig {
                data_dir: env_or("STEPFN_DATA_DIR", "data"),
            },
            engine: EngineConfig {
                address: std::env::var("STEPFN_ENGINE_ADDRESS").unwrap_or_else(|_| {
                    format!("arn:aws:lambda:{region}:{account_id}:function:stepfn-engine")
                }),
                script_timeout_ms: env_or("STEPFN_SCRIPT_TIMEOUT_MS", "3000")
                    .parse()
                    .unwrap_or(3000),
                script_memory_mb: env_or("STEPFN_SCRIPT_MEMORY_MB", "64").parse().unwrap_or(64),
            },
            deployment: DeploymentConfig {
                role_arn: std::env::var("STEPFN_ROLE_ARN")
                    .unwrap_or_else(|_| format!("arn:aws:iam::{account_id}:role/stepfn-workflows")),
                region,
                account_id,
            },
        }
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

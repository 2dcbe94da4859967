/// Deployment of normalized definitions to the orchestration platform
///
/// The platform itself is an external collaborator; this module only names the
/// two calls the registry makes and provides an in-process stand-in.

use async_trait::async_trait;
use thiserror::Error;

pub mod local;

pub use local::LocalDeployer;

/// Everything needed to create a deployed workflow resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    /// Deterministic resource name derived from the registry id
    pub name: String,
    /// Normalized definition, JSON-encoded
    pub definition: String,
    /// Execution role the platform assumes when running the workflow
    pub role_arn: String,
    /// Workflow flavour, e.g. `EXPRESS`
    pub workflow_type: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeployError {
    #[error("workflow resource {0} already exists")]
    AlreadyExists(String),

    #[error("workflow resource {0} does not exist")]
    Missing(String),

    #[error("platform rejected the request: {0}")]
    Rejected(String),
}

/// Create/update calls against the orchestration platform's API
#[async_trait]
pub trait WorkflowDeployer: Send + Sync {
    /// Create a new workflow resource and return its handle
    async fn create(&self, request: DeploymentRequest) -> Result<String, DeployError>;

    /// Replace the definition of an existing resource in place
    async fn update(&self, handle: &str, definition: &str) -> Result<(), DeployError>;
}

/// Naming scheme shared by create and update so both target the same resource
#[derive(Debug, Clone)]
pub struct ResourceNaming {
    pub region: String,
    pub account_id: String,
}

impl ResourceNaming {
    pub fn resource_name(&self, registry_id: &str) -> String {
        format!("stepfn-{registry_id}")
    }

    pub fn handle(&self, registry_id: &str) -> String {
        self.handle_for_name(&self.resource_name(registry_id))
    }

    pub fn handle_for_name(&self, name: &str) -> String {
        format!(
            "arn:aws:states:{}:{}:stateMachine:{}",
            self.region, self.account_id, name
        )
    }
}

/// Script registry
///
/// Persists `(id, script, normalized definition, input, write key)` and keeps the
/// deployed workflow resource in step with it. Records are never cached: every
/// read goes to the store so a stale script or write key cannot be served.

use crate::deploy::{DeployError, DeploymentRequest, ResourceNaming, WorkflowDeployer};
use crate::error::{Result, StepFnError};
use crate::workflow::{
    ids::RegistryId,
    normalize::normalize_str,
    storage::{Precondition, RecordStore},
    types::WorkflowRecord,
};
use serde_json::Value;
use std::sync::Arc;

/// Static settings the registry needs for normalization and deployment
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Address every rewritten step invokes instead of its own function
    pub engine_address: String,
    /// Role the deployed workflow runs under
    pub role_arn: String,
    /// Workflow flavour passed to the platform on create
    pub workflow_type: String,
    pub naming: ResourceNaming,
}

/// Caller-supplied content of a registration
#[derive(Debug, Clone)]
pub struct ScriptSubmission {
    pub script: String,
    /// JSON-encoded raw workflow definition
    pub definition: String,
    pub input: Value,
    pub write_key: String,
}

/// Result of a successful create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub id: RegistryId,
    pub handle: String,
}

/// Script registry over a record store and a workflow deployer
///
/// Every write goes through the store's conditional operations, so two callers
/// racing on the same id cannot both win. The deployed resource is derived from
/// the id and stays the same across updates.
pub struct ScriptRegistry {
    /// Source of truth for records; never cached
    store: Arc<dyn RecordStore>,
    /// Orchestration platform side of a registration
    deployer: Arc<dyn WorkflowDeployer>,
    settings: RegistrySettings,
}

impl ScriptRegistry {
    /// Create a registry from its collaborators
    pub fn new(
        store: Arc<dyn RecordStore>,
        deployer: Arc<dyn WorkflowDeployer>,
        settings: RegistrySettings,
    ) -> Self {
        Self {
            store,
            deployer,
            settings,
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Register a new workflow
    ///
    /// A missing or invalid `id` is replaced by a freshly generated one. The
    /// record is written first (failing if the id is taken), then the workflow
    /// resource is deployed. A deploy failure leaves the record in place and is
    /// reported as `DeploymentFailure` carrying the id.
    pub async fn create(&self, id: Option<&str>, submission: &ScriptSubmission) -> Result<Created> {
        let id = id
            .and_then(RegistryId::parse)
            .unwrap_or_else(RegistryId::generate);
        let record = self.record_for(&id, submission)?;

        match self.store.insert_new(&record).await? {
            Precondition::Applied => {}
            _ => {
                return Err(StepFnError::StorageFailure(format!(
                    "record {id} already exists"
                )))
            }
        }
        tracing::info!("📝 Stored new record {}", id);

        let handle = self
            .deployer
            .create(self.deployment_request(&id, &record.definition))
            .await
            .map_err(|e| deployment_failure(&id, e))?;

        Ok(Created { id, handle })
    }

    /// Replace the script, definition and input of an existing record
    ///
    /// The write key is checked by the store as part of the write itself; a
    /// mismatch (or unknown id) changes nothing and returns `IncorrectWriteKey`.
    pub async fn update(&self, id: &RegistryId, submission: &ScriptSubmission) -> Result<String> {
        let record = self.record_for(id, submission)?;

        match self.store.update_if_key_matches(&record).await? {
            Precondition::Applied => {}
            _ => {
                tracing::warn!("🔒 Write key rejected for {}", id);
                return Err(StepFnError::IncorrectWriteKey { id: id.to_string() });
            }
        }
        tracing::info!("📝 Updated record {}", id);

        let handle = self.settings.naming.handle(id.as_str());
        match self.deployer.update(&handle, &record.definition).await {
            Ok(()) => Ok(handle),
            Err(DeployError::Missing(_)) => {
                // Orphan from a create whose deploy never landed.
                tracing::warn!("🩹 {} was never deployed, creating it now", handle);
                self.deployer
                    .create(self.deployment_request(id, &record.definition))
                    .await
                    .map_err(|e| deployment_failure(id, e))
            }
            Err(e) => Err(deployment_failure(id, e)),
        }
    }

    /// Current record under `id`, if any
    pub async fn fetch(&self, id: &str) -> Result<Option<WorkflowRecord>> {
        self.store.get(id).await
    }

    fn record_for(&self, id: &RegistryId, submission: &ScriptSubmission) -> Result<WorkflowRecord> {
        let normalized = normalize_str(
            &submission.definition,
            id.as_str(),
            &self.settings.engine_address,
        )?;

        Ok(WorkflowRecord {
            id: id.to_string(),
            script: submission.script.clone(),
            definition: normalized.to_string(),
            input: submission.input.to_string(),
            write_key: submission.write_key.clone(),
        })
    }

    fn deployment_request(&self, id: &RegistryId, definition: &str) -> DeploymentRequest {
        DeploymentRequest {
            name: self.settings.naming.resource_name(id.as_str()),
            definition: definition.to_string(),
            role_arn: self.settings.role_arn.clone(),
            workflow_type: self.settings.workflow_type.clone(),
        }
    }
}

fn deployment_failure(id: &RegistryId, err: DeployError) -> StepFnError {
    tracing::error!("❌ Deployment of {} failed: {}", id, err);
    StepFnError::DeploymentFailure {
        id: id.to_string(),
        reason: err.to_string(),
    }
}

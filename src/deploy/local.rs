/// In-process deployment catalogue using ArcSwap
///
/// Stands in for the orchestration platform's API when no remote platform is
/// wired. Reads are lock-free; every create or update swaps in a new map, so a
/// reader always sees a whole catalogue.

use crate::deploy::{DeployError, DeploymentRequest, ResourceNaming, WorkflowDeployer};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};

/// A workflow resource as the platform would hold it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedWorkflow {
    pub name: String,
    pub handle: String,
    pub definition: String,
    pub role_arn: String,
    pub workflow_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-process stand-in for the orchestration platform
///
/// Keeps deployed workflows in an `ArcSwap` map: reads are lock-free and each
/// create or update swaps in a new map atomically.
#[derive(Debug)]
pub struct LocalDeployer {
    naming: ResourceNaming,
    /// Key: resource handle
    workflows: ArcSwap<HashMap<String, DeployedWorkflow>>,
}

impl LocalDeployer {
    pub fn new(naming: ResourceNaming) -> Self {
        Self {
            naming,
            workflows: ArcSwap::new(Arc::new(HashMap::new())),
        }
    }

    /// Look up a deployed workflow (lock-free read)
    pub fn get(&self, handle: &str) -> Option<DeployedWorkflow> {
        self.workflows.load().get(handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.workflows.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WorkflowDeployer for LocalDeployer {
    async fn create(&self, request: DeploymentRequest) -> Result<String, DeployError> {
        if request.definition.trim().is_empty() {
            return Err(DeployError::Rejected("empty definition".to_string()));
        }

        let handle = self.naming.handle_for_name(&request.name);
        let now = Utc::now();
        let mut outcome = Ok(handle.clone());

        self.workflows.rcu(|current| {
            let mut next = HashMap::clone(current);
            if next.contains_key(&handle) {
                outcome = Err(DeployError::AlreadyExists(request.name.clone()));
            } else {
                outcome = Ok(handle.clone());
                next.insert(
                    handle.clone(),
                    DeployedWorkflow {
                        name: request.name.clone(),
                        handle: handle.clone(),
                        definition: request.definition.clone(),
                        role_arn: request.role_arn.clone(),
                        workflow_type: request.workflow_type.clone(),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
            next
        });

        if outcome.is_ok() {
            tracing::info!("🚀 Deployed workflow resource {}", handle);
        }
        outcome
    }

    async fn update(&self, handle: &str, definition: &str) -> Result<(), DeployError> {
        if definition.trim().is_empty() {
            return Err(DeployError::Rejected("empty definition".to_string()));
        }

        let mut outcome = Ok(());
        self.workflows.rcu(|current| {
            let mut next = HashMap::clone(current);
            match next.get_mut(handle) {
                Some(existing) => {
                    existing.definition = definition.to_string();
                    existing.updated_at = Utc::now();
                    outcome = Ok(());
                }
                None => outcome = Err(DeployError::Missing(handle.to_string())),
            }
            next
        });

        if outcome.is_ok() {
            tracing::info!("🔥 Updated workflow resource {}", handle);
        }
        outcome
    }
}

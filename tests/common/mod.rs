#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use stepfn::deploy::{DeployError, DeploymentRequest, LocalDeployer, ResourceNaming, WorkflowDeployer};
use stepfn::workflow::{
    registry::RegistrySettings,
    storage::{Precondition, RecordStore, SqliteRecordStore},
    ScriptRegistry, WorkflowRecord,
};

pub const ENGINE: &str = "arn:aws:lambda:us-east-1:123456789012:function:stepfn-engine";

pub fn naming() -> ResourceNaming {
    ResourceNaming {
        region: "us-east-1".into(),
        account_id: "123456789012".into(),
    }
}

pub fn settings() -> RegistrySettings {
    RegistrySettings {
        engine_address: ENGINE.into(),
        role_arn: "arn:aws:iam::123456789012:role/stepfn".into(),
        workflow_type: "EXPRESS".into(),
        naming: naming(),
    }
}

pub async fn sqlite_store(dir: &tempfile::TempDir) -> Arc<SqliteRecordStore> {
    Arc::new(
        SqliteRecordStore::open(&dir.path().join("registry.db"))
            .await
            .expect("open store"),
    )
}

/// Local deployer whose creates can be made to fail on demand
pub struct FlakyDeployer {
    pub inner: LocalDeployer,
    pub fail_creates: AtomicBool,
}

impl FlakyDeployer {
    pub fn new() -> Self {
        Self {
            inner: LocalDeployer::new(naming()),
            fail_creates: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl WorkflowDeployer for FlakyDeployer {
    async fn create(&self, request: DeploymentRequest) -> Result<String, DeployError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(DeployError::Rejected("throttled".into()));
        }
        self.inner.create(request).await
    }

    async fn update(&self, handle: &str, definition: &str) -> Result<(), DeployError> {
        self.inner.update(handle, definition).await
    }
}

/// Store that counts every call and holds nothing
#[derive(Default)]
pub struct CountingStore {
    pub calls: AtomicUsize,
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn insert_new(&self, _record: &WorkflowRecord) -> stepfn::Result<Precondition> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Precondition::Applied)
    }

    async fn update_if_key_matches(&self, _record: &WorkflowRecord) -> stepfn::Result<Precondition> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Precondition::KeyMismatch)
    }

    async fn get(&self, _id: &str) -> stepfn::Result<Option<WorkflowRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

pub fn registry_with(store: Arc<dyn RecordStore>, deployer: Arc<dyn WorkflowDeployer>) -> ScriptRegistry {
    ScriptRegistry::new(store, deployer, settings())
}

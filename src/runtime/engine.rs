/// Shared execution engine
///
/// Every rewritten workflow step lands here. The routing token names the record
/// and handler; the engine fetches the record's current script and runs the
/// handler against the step payload in a fresh sandbox context.

use crate::error::{Result, StepFnError};
use crate::runtime::sandbox::ScriptSandbox;
use crate::workflow::{registry::ScriptRegistry, token::RoutingCarrier};
use serde_json::Value;
use std::sync::Arc;

/// Shared engine behind every rewritten workflow step
///
/// Stateless between invocations apart from the process-wide sandbox. Records
/// are read from the registry on each call, so an update takes effect on the
/// next step invocation.
pub struct ExecutionEngine {
    /// Registry the routing token's id is resolved against
    registry: Arc<ScriptRegistry>,
    /// Process-wide script environment
    sandbox: Arc<ScriptSandbox>,
}

impl ExecutionEngine {
    /// Create an engine over a registry and a sandbox
    pub fn new(registry: Arc<ScriptRegistry>, sandbox: Arc<ScriptSandbox>) -> Self {
        Self { registry, sandbox }
    }

    pub fn sandbox(&self) -> &ScriptSandbox {
        &self.sandbox
    }

    /// Run one step invocation
    ///
    /// Metadata that does not decode is rejected before the registry is consulted.
    pub async fn execute<C>(&self, metadata: &C, payload: Value) -> Result<Value>
    where
        C: RoutingCarrier + Sync + ?Sized,
    {
        let token = metadata.routing_token().map_err(|e| {
            tracing::warn!("🚫 Rejected invocation: {}", e);
            e
        })?;

        let record = self
            .registry
            .fetch(&token.registry_id)
            .await?
            .ok_or_else(|| StepFnError::ScriptNotFound(token.registry_id.clone()))?;

        tracing::info!("⚙️ Executing {}::{}", token.registry_id, token.handler);
        let started = std::time::Instant::now();
        let outcome = self
            .sandbox
            .run(record.script, token.handler.clone(), payload)
            .await;

        match &outcome {
            Ok(_) => tracing::info!(
                "✅ {}::{} completed in {:?}",
                token.registry_id,
                token.handler,
                started.elapsed()
            ),
            Err(e) => tracing::warn!(
                "❌ {}::{} failed after {:?}: {}",
                token.registry_id,
                token.handler,
                started.elapsed(),
                e
            ),
        }
        outcome
    }
}

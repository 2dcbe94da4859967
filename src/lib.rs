/// stepfn: run user scripts as workflow steps through one shared engine
///
/// Workflow definitions are normalized at registration so that every function
/// step invokes the shared execution engine with a routing token; the engine
/// then loads the registered script and runs the named handler.

// Core configuration and setup
pub mod config;

// Error taxonomy shared by every layer
pub mod error;

// Registration layer - routing tokens, normalization, storage and registry
pub mod workflow;

// Deployment of normalized definitions to the orchestration platform
pub mod deploy;

// Runtime execution - Lua sandbox and shared engine
pub mod runtime;

// HTTP API layer - registration, lookup and invocation endpoints
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{Result, ScriptFailure, StepFnError};
pub use runtime::{ExecutionEngine, ScriptSandbox};
pub use server::start_server;
pub use workflow::{normalize, RoutingToken, ScriptRegistry, WorkflowRecord};

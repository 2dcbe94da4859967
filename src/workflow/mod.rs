/// Workflow Registration Layer
///
/// This module handles everything that happens before a workflow runs:
/// - Routing tokens that name a script and handler
/// - Normalizing definitions so steps invoke the shared engine
/// - Registry ids, SQLite persistence and the script registry

// Routing token codec (client-context side channel)
pub mod token;

// Recursive definition rewrite
pub mod normalize;

// Time-ordered registry ids
pub mod ids;

// Record and request/response types
pub mod types;

// SQLite persistence with conditional writes
pub mod storage;

// Create/update over the store plus deployment
pub mod registry;

// Update-or-create entry point used by front ends
pub mod registration;

// Re-export commonly used types
pub use ids::RegistryId;
pub use normalize::normalize;
pub use registry::{RegistrySettings, ScriptRegistry, ScriptSubmission};
pub use token::{RoutingCarrier, RoutingToken};
pub use types::{RegistrationOutcome, RegistrationRequest, WorkflowRecord};

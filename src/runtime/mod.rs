/// Runtime Execution Layer
///
/// This module runs registered scripts on behalf of workflow steps:
/// - A process-wide Lua sandbox with per-call contexts
/// - The shared engine that resolves routing tokens to scripts

// Lua sandbox with time and memory limits
pub mod sandbox;

// Routing token -> record -> handler call
pub mod engine;

// Re-export main types
pub use engine::ExecutionEngine;
pub use sandbox::{SandboxLimits, ScriptSandbox};

/// HTTP API Layer
///
/// Thin front end over the registry and execution engine:
/// - Registration and read-only lookup of records
/// - Step invocation carrying a routing token

// Error -> status mapping
pub mod error;

// Registration endpoints (POST/GET)
pub mod registrations;

// Shared-engine invocation endpoint
pub mod invoke;

// Re-export router builders
pub use invoke::create_invoke_routes;
pub use registrations::{create_registration_routes, AppState};

/// Registration REST API endpoints
///
/// Registers scripts (create, or update with fallback to create) and exposes a
/// read-only view of stored records for debugging.

use crate::{
    api::error::{ApiError, ApiResult},
    error::StepFnError,
    runtime::engine::ExecutionEngine,
    workflow::{
        registration::register,
        registry::ScriptRegistry,
        types::{RecordView, RegistrationOutcome, RegistrationRequest, TraceContext},
    },
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Header the caller's tracing system propagates
pub const TRACE_HEADER: &str = "x-amzn-trace-id";

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Script registry backed by the record store
    pub registry: Arc<ScriptRegistry>,
    /// Shared execution engine
    pub engine: Arc<ExecutionEngine>,
}

/// Create registration routes
pub fn create_registration_routes() -> Router<AppState> {
    Router::new()
        .route("/api/registrations", post(create_registration))
        .route("/api/registrations/{id}", get(get_registration))
}

/// Register or re-register a script
///
/// POST /api/registrations
/// Body: { "id"?: "...", "script": "...", "definition": "...", "input": {...}, "writeKey": "..." }
async fn create_registration(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<RegistrationOutcome>> {
    // Parse JSON body manually so a bad body still gets the structured error
    let request: RegistrationRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("❌ Invalid registration body: {}", e);
        ApiError::BadRequest(format!("registration body is not valid: {e}"))
    })?;

    let trace = TraceContext::from_header(headers.get(TRACE_HEADER).and_then(|v| v.to_str().ok()));
    tracing::info!(
        "📥 Registration request (id: {}, trace: {:?})",
        request.id.as_deref().unwrap_or("<new>"),
        trace.trace_id()
    );

    let outcome = register(&state.registry, request, trace).await?;
    tracing::info!("🔥 Registered {} -> {}", outcome.id, outcome.deployed_resource_handle);
    Ok(Json(outcome))
}

/// Read-only lookup
///
/// GET /api/registrations/{id}
/// Returns: { "Script": "...", "Definition": "...", "Input": "..." }
async fn get_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecordView>> {
    match state.registry.fetch(&id).await? {
        Some(record) => Ok(Json(record.into())),
        None => Err(ApiError::Core(StepFnError::RecordNotFound(id))),
    }
}

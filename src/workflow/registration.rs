/// Registration entry point
///
/// Decides between update and create for an incoming request. An update whose
/// write key is rejected falls back to a brand-new registration under a fresh
/// id, so a caller who lost (or never had) the key still gets a working workflow.

use crate::error::{Result, StepFnError};
use crate::workflow::{
    ids::RegistryId,
    registry::{ScriptRegistry, ScriptSubmission},
    types::{RegistrationOutcome, RegistrationRequest, TraceContext},
};

pub async fn register(
    registry: &ScriptRegistry,
    request: RegistrationRequest,
    trace: TraceContext,
) -> Result<RegistrationOutcome> {
    let submission = ScriptSubmission {
        script: request.script,
        definition: request.definition,
        input: request.input,
        write_key: request.write_key,
    };

    let existing = request.id.as_deref().and_then(RegistryId::parse);
    let (id, handle) = match existing {
        Some(id) => match registry.update(&id, &submission).await {
            Ok(handle) => (id, handle),
            Err(StepFnError::IncorrectWriteKey { .. }) => {
                tracing::info!("↩️ Registering {} as a new workflow instead", id);
                let created = registry.create(None, &submission).await?;
                (created.id, created.handle)
            }
            Err(e) => return Err(e),
        },
        None => {
            let created = registry.create(None, &submission).await?;
            (created.id, created.handle)
        }
    };

    Ok(RegistrationOutcome {
        id: id.to_string(),
        deployed_resource_handle: handle,
        trace_id: trace.trace_id(),
        trace_header: trace.header,
    })
}

/// Workflow definition normalizer
///
/// Rewrites every step that invokes a function so that it invokes the shared
/// execution engine instead, carrying a routing token naming the registry id and
/// the handler the step originally targeted. Map iterators and Parallel branches
/// are nested definitions and are rewritten recursively.

use crate::error::{Result, StepFnError};
use crate::workflow::token::RoutingToken;
use serde_json::{Map, Value};

/// Resource prefix of the platform's "invoke a function" integration
pub const LAMBDA_INVOKE_PREFIX: &str = "arn:aws:states:::lambda:invoke";

/// Fields that would override the static target at run time
const DYNAMIC_TARGET_FIELDS: [&str; 3] = ["FunctionName.$", "Qualifier", "Qualifier.$"];

/// Keys under which a Map step keeps its sub-definition (legacy first)
const MAP_SUBDEFINITION_KEYS: [&str; 2] = ["Iterator", "ItemProcessor"];

/// Closed set of step shapes the normalizer distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    Task,
    Map,
    Parallel,
    Other,
}

impl StepKind {
    fn of(trail: &str, step: &Map<String, Value>) -> Result<Self> {
        let ty = step
            .get("Type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(trail, "step has no string `Type`"))?;
        Ok(match ty {
            "Task" => StepKind::Task,
            "Map" => StepKind::Map,
            "Parallel" => StepKind::Parallel,
            _ => StepKind::Other,
        })
    }
}

/// Normalize `definition` for the record `registry_id`
///
/// Pure: the input is left untouched and a rewritten copy is returned.
pub fn normalize(definition: &Value, registry_id: &str, engine_address: &str) -> Result<Value> {
    Normalizer::new(registry_id, engine_address).normalize(definition)
}

/// Parse a JSON-encoded definition and normalize it
pub fn normalize_str(definition: &str, registry_id: &str, engine_address: &str) -> Result<Value> {
    let parsed: Value = serde_json::from_str(definition)
        .map_err(|e| StepFnError::MalformedDefinition(format!("definition is not JSON: {e}")))?;
    normalize(&parsed, registry_id, engine_address)
}

/// Definition rewriter bound to one record and one engine address
///
/// Every eligible Task gets a routing token for `registry_id` and has its
/// target replaced by `engine_address`. Tasks already pointing at the engine
/// with a token are left alone, so running it twice changes nothing.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    /// Registry id embedded in every routing token
    registry_id: &'a str,
    /// Address every rewritten step invokes
    engine_address: &'a str,
}

impl<'a> Normalizer<'a> {
    /// Create a normalizer for one record
    pub fn new(registry_id: &'a str, engine_address: &'a str) -> Self {
        Self {
            registry_id,
            engine_address,
        }
    }

    /// Rewrite a whole definition, failing on missing `States` or step `Type`
    pub fn normalize(&self, definition: &Value) -> Result<Value> {
        self.definition(definition, "$")
    }

    fn definition(&self, definition: &Value, trail: &str) -> Result<Value> {
        let root = definition
            .as_object()
            .ok_or_else(|| malformed(trail, "definition is not an object"))?;
        let states = root
            .get("States")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(trail, "definition has no `States` object"))?;

        let mut rewritten = Map::with_capacity(states.len());
        for (name, step) in states {
            let step_trail = format!("{trail}.States.{name}");
            rewritten.insert(name.clone(), self.step(step, &step_trail)?);
        }

        let mut out = root.clone();
        out.insert("States".to_string(), Value::Object(rewritten));
        Ok(Value::Object(out))
    }

    fn step(&self, step: &Value, trail: &str) -> Result<Value> {
        let fields = step
            .as_object()
            .ok_or_else(|| malformed(trail, "step is not an object"))?;

        match StepKind::of(trail, fields)? {
            StepKind::Task => self.task(fields, trail).map(Value::Object),
            StepKind::Map => self.map(fields, trail).map(Value::Object),
            StepKind::Parallel => self.parallel(fields, trail).map(Value::Object),
            StepKind::Other => Ok(step.clone()),
        }
    }

    fn task(&self, fields: &Map<String, Value>, trail: &str) -> Result<Map<String, Value>> {
        let resource = fields
            .get("Resource")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(trail, "task has no string `Resource`"))?;

        if !resource.starts_with(LAMBDA_INVOKE_PREFIX) {
            // TODO: direct function-ARN resources need their own rewrite rule.
            tracing::debug!("↪️ Leaving {} untouched (resource {})", trail, resource);
            return Ok(fields.clone());
        }

        let params = fields
            .get("Parameters")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(trail, "function invocation has no `Parameters` object"))?;

        if self.already_routed(params) {
            return Ok(fields.clone());
        }

        let handler = params
            .get("FunctionName")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(trail, "function invocation has no static `FunctionName`"))?;

        let token = RoutingToken::new(self.registry_id, handler);
        tracing::debug!("🔀 Routing {} handler '{}' through the shared engine", trail, handler);

        let mut params = params.clone();
        params.insert("ClientContext".to_string(), Value::String(token.encode()));
        params.insert(
            "FunctionName".to_string(),
            Value::String(self.engine_address.to_string()),
        );
        for field in DYNAMIC_TARGET_FIELDS {
            params.remove(field);
        }

        let mut out = fields.clone();
        out.insert("Parameters".to_string(), Value::Object(params));
        Ok(out)
    }

    fn already_routed(&self, params: &Map<String, Value>) -> bool {
        params.get("FunctionName").and_then(Value::as_str) == Some(self.engine_address)
            && params.contains_key("ClientContext")
    }

    fn map(&self, fields: &Map<String, Value>, trail: &str) -> Result<Map<String, Value>> {
        let mut out = fields.clone();
        let mut found = false;
        for key in MAP_SUBDEFINITION_KEYS {
            if let Some(sub) = fields.get(key) {
                let normalized = self.definition(sub, &format!("{trail}.{key}"))?;
                out.insert(key.to_string(), normalized);
                found = true;
            }
        }
        if !found {
            return Err(malformed(trail, "map step has neither `Iterator` nor `ItemProcessor`"));
        }
        Ok(out)
    }

    fn parallel(&self, fields: &Map<String, Value>, trail: &str) -> Result<Map<String, Value>> {
        let branches = fields
            .get("Branches")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed(trail, "parallel step has no `Branches` array"))?;

        let normalized = branches
            .iter()
            .enumerate()
            .map(|(idx, branch)| self.definition(branch, &format!("{trail}.Branches[{idx}]")))
            .collect::<Result<Vec<_>>>()?;

        let mut out = fields.clone();
        out.insert("Branches".to_string(), Value::Array(normalized));
        Ok(out)
    }
}

fn malformed(trail: &str, reason: &str) -> StepFnError {
    StepFnError::MalformedDefinition(format!("{trail}: {reason}"))
}

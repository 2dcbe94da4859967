/// Lua script sandbox
///
/// `ScriptSandbox` is the long-lived, process-wide half: it owns the limits and
/// counters and is shared behind an `Arc`. Each call gets a brand-new
/// `ScriptContext` (its own Lua state) on a blocking thread; the context is
/// owned by that closure, so it is torn down on success, script error, timeout
/// or panic alike, and no globals survive into the next call.
///
/// The time budget is enforced inside the VM by an instruction hook. Once the
/// deadline passes, `pcall`/`xpcall` re-raise instead of swallowing the error and
/// a handler that still returns normally is reported as timed out. Coroutines
/// are not loaded, since their threads would run outside the hook.

use crate::error::{Result, ScriptFailure, StepFnError};
use mlua::{
    Function, HookTriggers, Lua, LuaOptions, LuaSerdeExt, MultiValue, StdLib, Value as LuaValue,
    Variadic, VmState,
};
use serde_json::Value;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

/// Chunk name reported in script diagnostics
const CHUNK_NAME: &str = "index.lua";

/// Message raised into the script once its deadline has passed
const TIME_BUDGET_EXCEEDED: &str = "script exceeded its time budget";

/// Extra time the async side waits on the blocking thread past the script budget
const JOIN_GRACE: Duration = Duration::from_millis(500);

/// Resource ceilings applied to every context
#[derive(Debug, Clone)]
pub struct SandboxLimits {
    /// Wall-clock budget for loading the script plus the handler call
    pub timeout: Duration,
    /// Bytes the Lua allocator may hold
    pub memory_limit: usize,
    /// VM instructions between deadline checks
    pub hook_interval: u32,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            memory_limit: 64 * 1024 * 1024,
            hook_interval: 1_000,
        }
    }
}

/// Counters for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxStats {
    pub invocations: u64,
    pub timeouts: u64,
}

/// Process-wide script execution environment
///
/// Created once at start-up and shared by every invocation. It holds no Lua
/// state of its own; [`ScriptSandbox::run`] opens a fresh context per call.
#[derive(Debug)]
pub struct ScriptSandbox {
    limits: SandboxLimits,
    invocations: AtomicU64,
    timeouts: AtomicU64,
}

impl ScriptSandbox {
    /// Create the sandbox once at start-up
    pub fn new(limits: SandboxLimits) -> Self {
        Self {
            limits,
            invocations: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Load `script` into a fresh context and call `handler(payload)`
    ///
    /// The caller is answered with a timeout once the budget plus a short grace
    /// period has elapsed, even if the blocking thread has not finished. That
    /// thread is detached at that point and only the instruction hook can stop it.
    pub async fn run(&self, script: String, handler: String, payload: Value) -> Result<Value> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let limits = self.limits.clone();
        let budget = limits.timeout + JOIN_GRACE;
        let timeout_ms = limits.timeout.as_millis() as u64;

        let task = tokio::task::spawn_blocking(move || {
            let context = ScriptContext::open(&limits)?;
            context.load(&script)?;
            context.call(&handler, &payload)
        });

        let outcome = match tokio::time::timeout(budget, task).await {
            Ok(joined) => joined
                .map_err(|e| ScriptFailure::Runtime(format!("script task did not complete: {e}")))?,
            Err(_) => {
                tracing::error!("⏱️ Script thread still running {:?} past its budget", JOIN_GRACE);
                Err(ScriptFailure::Timeout(timeout_ms).into())
            }
        };

        if let Err(StepFnError::ScriptExecutionFailed(ScriptFailure::Timeout(_))) = &outcome {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }

    pub fn stats(&self) -> SandboxStats {
        SandboxStats {
            invocations: self.invocations.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

/// One isolated Lua state, used for exactly one handler call
struct ScriptContext {
    lua: Lua,
    timed_out: Arc<AtomicBool>,
    timeout_ms: u64,
}

impl ScriptContext {
    fn open(limits: &SandboxLimits) -> Result<Self> {
        let libs = StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8;
        let lua = Lua::new_with(libs, LuaOptions::new()).map_err(runtime)?;
        lua.set_memory_limit(limits.memory_limit).map_err(runtime)?;

        let timed_out = Arc::new(AtomicBool::new(false));
        install_globals(&lua).map_err(runtime)?;
        guard_protected_calls(&lua, &timed_out).map_err(runtime)?;

        let deadline = Instant::now() + limits.timeout;
        let flag = Arc::clone(&timed_out);
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(limits.hook_interval),
            move |_lua, _debug| {
                if Instant::now() >= deadline {
                    flag.store(true, Ordering::SeqCst);
                    Err(mlua::Error::runtime(TIME_BUDGET_EXCEEDED))
                } else {
                    Ok(VmState::Continue)
                }
            },
        );

        Ok(Self {
            lua,
            timed_out,
            timeout_ms: limits.timeout.as_millis() as u64,
        })
    }

    /// Run the script body so its handler functions become globals
    fn load(&self, script: &str) -> Result<()> {
        self.lua
            .load(script)
            .set_name(CHUNK_NAME)
            .exec()
            .map_err(|e| StepFnError::from(self.classify(e)))?;
        self.ensure_within_budget()
    }

    fn call(&self, handler: &str, payload: &Value) -> Result<Value> {
        let function = match self.lua.globals().get::<LuaValue>(handler) {
            Ok(LuaValue::Function(function)) => function,
            _ => return Err(ScriptFailure::HandlerNotFound(handler.to_string()).into()),
        };

        let argument = self.lua.to_value(payload).map_err(runtime)?;
        let returned: LuaValue = function
            .call(argument)
            .map_err(|e| StepFnError::from(self.classify(e)))?;
        self.ensure_within_budget()?;

        self.lua
            .from_value::<Value>(returned)
            .map_err(|e| StepFnError::UnserializableResult(e.to_string()))
    }

    /// A script that swallowed the deadline error still must not succeed
    fn ensure_within_budget(&self) -> Result<()> {
        if self.timed_out.load(Ordering::SeqCst) {
            return Err(ScriptFailure::Timeout(self.timeout_ms).into());
        }
        Ok(())
    }

    fn classify(&self, err: mlua::Error) -> ScriptFailure {
        if self.timed_out.load(Ordering::SeqCst) {
            return ScriptFailure::Timeout(self.timeout_ms);
        }
        match err {
            mlua::Error::SyntaxError { message, .. } => ScriptFailure::Syntax(message),
            other => ScriptFailure::Runtime(other.to_string()),
        }
    }
}

/// Strip file loading and route `print` into tracing
fn install_globals(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();

    for name in ["dofile", "loadfile", "load"] {
        globals.set(name, mlua::Nil)?;
    }

    globals.set(
        "print",
        lua.create_function(|_, args: Variadic<LuaValue>| {
            let line = args
                .iter()
                .map(describe)
                .collect::<Vec<_>>()
                .join("\t");
            tracing::info!(target: "stepfn::script", "{}", line);
            Ok(())
        })?,
    )?;

    globals.set(
        "now",
        lua.create_function(|_, ()| Ok(chrono::Utc::now().to_rfc3339()))?,
    )?;

    Ok(())
}

/// Make `pcall`/`xpcall` re-raise once the deadline has passed
///
/// The originals still catch ordinary script errors. The wrappers are installed
/// before the script loads, so it never sees the unwrapped functions.
fn guard_protected_calls(lua: &Lua, timed_out: &Arc<AtomicBool>) -> mlua::Result<()> {
    let globals = lua.globals();

    for name in ["pcall", "xpcall"] {
        let protected: Function = globals.get(name)?;
        let flag = Arc::clone(timed_out);
        globals.set(
            name,
            lua.create_function(move |_, args: MultiValue| {
                let results = protected.call::<MultiValue>(args)?;
                if flag.load(Ordering::SeqCst) {
                    return Err(mlua::Error::runtime(TIME_BUDGET_EXCEEDED));
                }
                Ok(results)
            })?,
        )?;
    }

    Ok(())
}

fn describe(value: &LuaValue) -> String {
    match value {
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => b.to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => n.to_string(),
        LuaValue::String(s) => s.to_string_lossy().to_string(),
        other => other.type_name().to_string(),
    }
}

fn runtime(err: mlua::Error) -> StepFnError {
    ScriptFailure::Runtime(err.to_string()).into()
}

/// Execution Engine - Sandboxed Invocation
///
/// **Core Responsibility:**
/// Load a submission into a fresh JavaScript realm, resolve the named
/// function, call it with already-normalized arguments and hand back the
/// returned value.
///
/// **Architectural Boundary:**
/// - Engine knows HOW code runs (embedded interpreter, child process)
/// - Engine does NOT parse test-case strings
/// - Engine does NOT compare results
///
/// **Isolation:**
/// Every invocation gets its own `boa_engine::Context`, so globals written
/// by one test case are never visible to the next. Loop-iteration and
/// recursion limits are set on each context. They are per call frame, so
/// they do not bound total work: a loop that calls a looping function can
/// run far past any deadline. An abandoned engine thread therefore keeps its
/// run's [`RunPermit`] until it really exits, and deployments that must
/// reclaim CPU on timeout use the process backend.
use crate::error::ExecutionError;
use crate::value::Value;
use async_trait::async_trait;
use boa_engine::{Context, Source};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use tokio::sync::{oneshot, OwnedSemaphorePermit};
use tracing::{debug, warn};

const HARNESS: &str = include_str!("harness.js");

/// Interpreter threads recurse deeply on nested user code.
pub const ENGINE_STACK_BYTES: usize = 32 * 1024 * 1024;

/// Interpreter limits applied to every realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            loop_iteration_limit: 10_000_000,
            recursion_limit: 10_000,
        }
    }
}

/// One call of a submitted function with concrete arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    pub source: String,
    pub function_name: String,
    pub args: Vec<Value>,
    #[serde(default)]
    pub limits: Limits,
}

/// What a realm reports back. Also the reply format of `hiremate-worker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Ok { value: Value },
    Compile { message: String },
    Runtime { message: String },
}

impl Outcome {
    pub fn into_result(self) -> Result<Value, ExecutionError> {
        match self {
            Outcome::Ok { value } => Ok(value),
            Outcome::Compile { message } => Err(ExecutionError::Compile(message)),
            Outcome::Runtime { message } => Err(ExecutionError::Runtime(message)),
        }
    }

    fn from_result(result: Result<Value, ExecutionError>) -> Self {
        match result {
            Ok(value) => Outcome::Ok { value },
            Err(ExecutionError::Compile(message)) => Outcome::Compile { message },
            Err(other) => Outcome::Runtime {
                message: other.to_string(),
            },
        }
    }
}

/// Admission slot of one run, shared by everything executing on its behalf.
/// The slot returns to the executor when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct RunPermit(Arc<OwnedSemaphorePermit>);

impl RunPermit {
    pub fn new(permit: OwnedSemaphorePermit) -> Self {
        Self(Arc::new(permit))
    }
}

/// Swappable execution backend.
///
/// Implementations must give every call a fresh realm and must be safe to
/// abandon: the dispatcher drops the returned future when a deadline
/// passes.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn invoke(&self, invocation: &Invocation) -> Result<Value, ExecutionError>;

    /// [`CodeRunner::invoke`] on behalf of an admitted run. The permit must
    /// stay held for as long as the submitted code can still execute.
    async fn invoke_with_permit(
        &self,
        invocation: &Invocation,
        permit: RunPermit,
    ) -> Result<Value, ExecutionError> {
        let _permit = permit;
        self.invoke(invocation).await
    }
}

/// Embedded-interpreter backend.
///
/// Each invocation runs on its own OS thread with a large stack. A dropped
/// future cannot stop that thread; it runs until the script returns or an
/// interpreter limit trips, holding the run's permit until then.
#[derive(Debug, Default, Clone)]
pub struct InProcessEngine;

impl InProcessEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run one invocation on the calling thread.
    pub fn invoke_blocking(&self, invocation: &Invocation) -> Outcome {
        if !is_identifier(&invocation.function_name) {
            return Outcome::Compile {
                message: format!("Invalid function name: '{}'", invocation.function_name),
            };
        }

        match build_script(invocation) {
            Ok(script) => run_script(&script, invocation.limits),
            Err(e) => Outcome::from_result(Err(e)),
        }
    }

    async fn run_on_thread(
        &self,
        invocation: &Invocation,
        permit: Option<RunPermit>,
    ) -> Result<Value, ExecutionError> {
        let (tx, rx) = oneshot::channel();
        let engine = self.clone();
        let invocation = invocation.clone();

        thread::Builder::new()
            .name("hiremate-engine".to_string())
            .stack_size(ENGINE_STACK_BYTES)
            .spawn(move || {
                let outcome = engine.invoke_blocking(&invocation);
                if tx.send(outcome).is_err() {
                    debug!(function = %invocation.function_name, "Invocation finished after caller gave up");
                }
                drop(permit);
            })
            .map_err(|e| ExecutionError::Backend(format!("failed to spawn engine thread: {}", e)))?;

        match rx.await {
            Ok(outcome) => outcome.into_result(),
            Err(_) => {
                warn!("Engine thread exited without a result");
                Err(ExecutionError::Backend("engine thread terminated".to_string()))
            }
        }
    }
}

#[async_trait]
impl CodeRunner for InProcessEngine {
    fn name(&self) -> &'static str {
        "in_process"
    }

    async fn invoke(&self, invocation: &Invocation) -> Result<Value, ExecutionError> {
        self.run_on_thread(invocation, None).await
    }

    async fn invoke_with_permit(
        &self,
        invocation: &Invocation,
        permit: RunPermit,
    ) -> Result<Value, ExecutionError> {
        self.run_on_thread(invocation, Some(permit)).await
    }
}

/// Harness applied to the submission, its function name and the tagged
/// arguments, all passed as string literals.
fn build_script(invocation: &Invocation) -> Result<String, ExecutionError> {
    let args_json = serde_json::to_string(&invocation.args)
        .map_err(|e| ExecutionError::Backend(format!("failed to encode arguments: {}", e)))?;
    let literal = |s: &str| {
        serde_json::to_string(s)
            .map_err(|e| ExecutionError::Backend(format!("failed to encode script: {}", e)))
    };

    Ok(format!(
        "{}({}, {}, {})",
        HARNESS,
        literal(&invocation.source)?,
        literal(&invocation.function_name)?,
        literal(&args_json)?
    ))
}

fn run_script(script: &str, limits: Limits) -> Outcome {
    let mut context = Context::default();
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(limits.loop_iteration_limit);
    context
        .runtime_limits_mut()
        .set_recursion_limit(limits.recursion_limit);

    // Engine limits are not catchable from JavaScript, so they surface here
    let reply = match context.eval(Source::from_bytes(script)) {
        Ok(reply) => reply,
        Err(e) => {
            return Outcome::Runtime {
                message: e.to_string(),
            }
        }
    };

    let Some(reply) = reply.as_string().map(|s| s.to_std_string_escaped()) else {
        return Outcome::Runtime {
            message: "harness returned a non-string reply".to_string(),
        };
    };

    match serde_json::from_str::<Outcome>(&reply) {
        Ok(outcome) => outcome,
        Err(e) => Outcome::Runtime {
            message: format!("malformed harness reply: {}", e),
        },
    }
}

/// `[A-Za-z_$][A-Za-z0-9_$]*`
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

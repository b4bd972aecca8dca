/// Process backend: one `hiremate-worker` child per invocation.
///
/// The invocation is written to the child's stdin as JSON and the child
/// answers with a single `Outcome` on stdout. The child is spawned with
/// `kill_on_drop`, so a dispatcher that stops awaiting after its deadline
/// also kills the process, which the in-process backend cannot do.
use crate::engine::{CodeRunner, Invocation, Outcome};
use crate::error::ExecutionError;
use crate::value::Value;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct ProcessEngine {
    worker_bin: PathBuf,
}

impl ProcessEngine {
    pub fn new(worker_bin: impl Into<PathBuf>) -> Self {
        Self {
            worker_bin: worker_bin.into(),
        }
    }

    pub fn worker_bin(&self) -> &Path {
        &self.worker_bin
    }
}

#[async_trait]
impl CodeRunner for ProcessEngine {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn invoke(&self, invocation: &Invocation) -> Result<Value, ExecutionError> {
        let request = serde_json::to_vec(invocation)
            .map_err(|e| ExecutionError::Backend(format!("failed to encode invocation: {}", e)))?;

        let mut child = Command::new(&self.worker_bin)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!(worker = %self.worker_bin.display(), error = %e, "Failed to spawn worker");
                ExecutionError::Backend(format!(
                    "failed to spawn worker {}: {}",
                    self.worker_bin.display(),
                    e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&request)
                .await
                .map_err(|e| ExecutionError::Backend(format!("failed to write to worker: {}", e)))?;
            // closing stdin marks the end of the request
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecutionError::Backend(format!("failed to wait for worker: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("no diagnostics");
            return Err(ExecutionError::Backend(format!(
                "worker exited with {}: {}",
                output.status, detail
            )));
        }

        debug!(bytes = output.stdout.len(), "Worker replied");

        let outcome: Outcome = serde_json::from_slice(&output.stdout)
            .map_err(|e| ExecutionError::Backend(format!("malformed worker reply: {}", e)))?;
        outcome.into_result()
    }
}

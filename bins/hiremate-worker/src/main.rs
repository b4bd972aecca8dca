/// HireMate Worker - one invocation per process
///
/// **Protocol:**
/// - stdin: one `Invocation` as JSON, terminated by EOF
/// - stdout: one `Outcome` as JSON
/// - stderr: logs
/// - exit code 0 whenever an outcome was produced (including compile and
///   runtime failures of the submission), 1 when the request itself was
///   unusable
///
/// The parent kills this process when its deadline passes, so there is no
/// timeout handling here beyond the interpreter limits carried in the
/// request.
use anyhow::{anyhow, Context, Result};
use hiremate_executor::engine::ENGINE_STACK_BYTES;
use hiremate_executor::{InProcessEngine, Invocation};
use std::io::{Read, Write};
use std::thread;
use tracing::{debug, info};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut request = String::new();
    std::io::stdin()
        .read_to_string(&mut request)
        .context("Failed to read invocation from stdin")?;

    let invocation: Invocation =
        serde_json::from_str(&request).context("Failed to parse invocation")?;

    debug!(
        function = %invocation.function_name,
        args = invocation.args.len(),
        source_size = invocation.source.len(),
        "Received invocation"
    );

    // The interpreter needs more stack than the main thread provides
    let handle = thread::Builder::new()
        .name("hiremate-engine".to_string())
        .stack_size(ENGINE_STACK_BYTES)
        .spawn(move || InProcessEngine::new().invoke_blocking(&invocation))
        .context("Failed to spawn engine thread")?;

    let outcome = handle
        .join()
        .map_err(|_| anyhow!("Engine thread panicked"))?;

    let reply = serde_json::to_string(&outcome).context("Failed to encode outcome")?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(reply.as_bytes())
        .context("Failed to write outcome")?;
    stdout.flush().context("Failed to flush outcome")?;

    info!("Invocation complete");
    Ok(())
}

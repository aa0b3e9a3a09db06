//! Bounded execution of an external capture tool.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{CaptureError, Result};

/// Run `program` with `args`, killing it after `timeout_ms`.
///
/// Returns `Ok(())` on a zero exit status. A non-zero exit maps to
/// [`CaptureError::CaptureFailed`] and an expired timeout to
/// [`CaptureError::CaptureTimeout`].
pub(crate) fn run_tool(
    backend: &str,
    program: &Path,
    args: &[String],
    timeout_ms: u64,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_tool_async(backend, program, args, timeout_ms))
}

async fn run_tool_async(
    backend: &str,
    program: &Path,
    args: &[String],
    timeout_ms: u64,
) -> Result<()> {
    debug!("Running {} {}", program.display(), args.join(" "));

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CaptureError::CaptureFailed {
            backend: backend.to_string(),
            code: None,
            stderr: format!("failed to start {}: {e}", program.display()),
        })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        child.wait_with_output(),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            warn!(backend, timeout_ms, "Capture tool timed out, killing process");
            return Err(CaptureError::CaptureTimeout {
                backend: backend.to_string(),
                timeout_ms,
            });
        }
    };

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(CaptureError::CaptureFailed {
            backend: backend.to_string(),
            code: output.status.code(),
            stderr,
        })
    }
}

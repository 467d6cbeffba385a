//! Subprocess execution shared by text extraction and OCR.
//!
//! Every invocation is bound to a cancellation token and, optionally, a hard
//! timeout. The child is spawned with `kill_on_drop`, so losing the race to
//! either one tears the process down.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("External tool not found: {0}")]
    NotFound(String),

    #[error("{tool} failed: {stderr}")]
    Failed { tool: String, stderr: String },

    #[error("{tool} timed out after {}s", .after.as_secs())]
    TimedOut { tool: String, after: Duration },

    #[error("cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run a command to completion and return its stdout.
pub async fn run_tool(
    mut cmd: Command,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<String, ToolError> {
    let tool = cmd.as_std().get_program().to_string_lossy().into_owned();

    if cancel.is_cancelled() {
        return Err(ToolError::Cancelled);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(tool = %tool, args = ?cmd.as_std().get_args().collect::<Vec<_>>(), "running external tool");

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::NotFound(tool));
        }
        Err(e) => return Err(ToolError::Io(e)),
    };

    let wait = async {
        let output = child.wait_with_output();
        match timeout {
            Some(after) => match tokio::time::timeout(after, output).await {
                Ok(result) => result.map_err(ToolError::Io),
                Err(_) => Err(ToolError::TimedOut {
                    tool: tool.clone(),
                    after,
                }),
            },
            None => output.await.map_err(ToolError::Io),
        }
    };

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ToolError::Cancelled),
        result = wait => result?,
    };

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(ToolError::Failed {
            tool,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

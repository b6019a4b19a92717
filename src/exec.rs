//! Subprocess execution.
//!
//! One child process per tool call, a timeout around it, and a line-oriented
//! parser for `--json=stream` output. Nothing is shared between calls.

use crate::errors::ServiceError;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: Option<i32>,
}

/// Run the ast-grep binary with the given argument array.
///
/// The child is killed when the timeout elapses or the future is dropped.
/// Captured stdout is capped at `max_output_bytes`.
pub async fn run_binary(
    binary: &Path,
    args: &[String],
    timeout: Duration,
    max_output_bytes: usize,
) -> Result<ExecOutput, ServiceError> {
    tracing::debug!("spawning {} {:?}", binary.display(), args);

    let child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            ServiceError::Binary(format!("failed to spawn {}: {e}", binary.display()))
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ServiceError::Timeout {
            seconds: timeout.as_secs(),
        })?
        .map_err(ServiceError::Io)?;

    if output.stdout.len() > max_output_bytes {
        return Err(ServiceError::Execution {
            message: format!(
                "ast-grep produced {} bytes of output (cap is {max_output_bytes}); narrow the search",
                output.stdout.len()
            ),
            stderr: String::new(),
        });
    }

    Ok(ExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
        exit_code: output.status.code(),
    })
}

/// Fail when the binary exited non-zero without producing any stream output.
/// ast-grep exits non-zero for usage errors; a successful run with zero
/// matches still exits zero with empty stdout.
pub fn check_execution(output: &ExecOutput) -> Result<(), ServiceError> {
    if !output.success && output.stdout.trim().is_empty() {
        return Err(ServiceError::Execution {
            message: match output.exit_code {
                Some(code) => format!("ast-grep exited with status {code}"),
                None => "ast-grep was terminated by a signal".to_string(),
            },
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(())
}

/// Parse `--json=stream` output: one JSON object per line, blank lines
/// tolerated. A malformed line fails the whole call and names the line.
pub fn parse_json_stream<T: DeserializeOwned>(stdout: &str) -> Result<Vec<T>, ServiceError> {
    let mut records = Vec::new();
    for (idx, line) in stdout.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: T = serde_json::from_str(line).map_err(|e| {
            ServiceError::Json(format!("invalid JSON on output line {}: {e}", idx + 1))
        })?;
        records.push(record);
    }
    Ok(records)
}

//! Shared helpers for integration tests.
//!
//! The services are exercised against a scripted stand-in for the ast-grep
//! binary: a shell script that answers `--version` probes and prints canned
//! `--json=stream` lines. Unix only, like the scripts themselves.

#![allow(dead_code)]

use ast_grep_cli_mcp::config::ServiceConfig;
use std::path::{Path, PathBuf};

/// Write a stand-in ast-grep that prints the given stream lines on stdout.
#[cfg(unix)]
pub fn write_stub_ast_grep(dir: &Path, stdout_lines: &[String]) -> PathBuf {
    write_stub_script(dir, &stub_body(stdout_lines, 0, ""))
}

/// Write a stand-in ast-grep that fails with the given status and stderr.
#[cfg(unix)]
pub fn write_failing_ast_grep(dir: &Path, exit_code: i32, stderr: &str) -> PathBuf {
    write_stub_script(dir, &stub_body(&[], exit_code, stderr))
}

/// Write a stand-in ast-grep that hangs for `seconds` before answering.
#[cfg(unix)]
pub fn write_sleeping_ast_grep(dir: &Path, seconds: u64) -> PathBuf {
    let body = format!(
        "{version_probe}sleep {seconds}\nexit 0\n",
        version_probe = VERSION_PROBE
    );
    write_stub_script(dir, &body)
}

const VERSION_PROBE: &str = "for arg in \"$@\"; do\n  if [ \"$arg\" = \"--version\" ]; then\n    echo 'ast-grep 0.38.6'\n    exit 0\n  fi\ndone\n";

#[cfg(unix)]
fn stub_body(stdout_lines: &[String], exit_code: i32, stderr: &str) -> String {
    let mut body = String::from(VERSION_PROBE);
    for line in stdout_lines {
        body.push_str("cat <<'STREAM_EOF'\n");
        body.push_str(line);
        body.push_str("\nSTREAM_EOF\n");
    }
    if !stderr.is_empty() {
        body.push_str(&format!("echo '{stderr}' >&2\n"));
    }
    body.push_str(&format!("exit {exit_code}\n"));
    body
}

#[cfg(unix)]
fn write_stub_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("ast-grep");
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Service config pointing at a workspace root and a stub binary, with
/// downloads disabled so tests never touch the network.
pub fn stub_config(workspace: &Path, binary: PathBuf) -> ServiceConfig {
    ServiceConfig {
        root_directories: vec![workspace.to_path_buf()],
        binary_path: Some(binary),
        download_enabled: false,
        ..Default::default()
    }
}

/// A `--json=stream` line for a plain match in `file`.
pub fn match_line(file: &Path, text: &str, line: usize) -> String {
    serde_json::json!({
        "text": text,
        "range": {
            "byteOffset": { "start": 0, "end": text.len() },
            "start": { "line": line, "column": 0 },
            "end": { "line": line, "column": text.len() }
        },
        "file": file.to_string_lossy(),
        "lines": text,
    })
    .to_string()
}

/// A `--json=stream` line carrying a rewrite for `file`.
pub fn replacement_line(file: &Path, old: &str, new: &str, line: usize) -> String {
    serde_json::json!({
        "text": old,
        "range": {
            "byteOffset": { "start": 0, "end": old.len() },
            "start": { "line": line, "column": 0 },
            "end": { "line": line, "column": old.len() }
        },
        "file": file.to_string_lossy(),
        "lines": old,
        "replacement": new,
        "replacementOffsets": { "start": 0, "end": old.len() }
    })
    .to_string()
}

/// A `--json=stream` line for a scan finding in `file`.
pub fn finding_line(file: &Path, rule_id: &str, severity: &str, message: &str) -> String {
    serde_json::json!({
        "text": "eval(code)",
        "range": {
            "byteOffset": { "start": 0, "end": 10 },
            "start": { "line": 4, "column": 2 },
            "end": { "line": 4, "column": 12 }
        },
        "file": file.to_string_lossy(),
        "lines": "eval(code)",
        "ruleId": rule_id,
        "severity": severity,
        "message": message
    })
    .to_string()
}

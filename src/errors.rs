//! # Error Types
//!
//! Error handling for the ast-grep CLI bridge service.
//! Failures are tagged by cause and carry a `recoverable` flag so the MCP
//! client can tell a fixable request apart from a dead end.

use rmcp::model::ErrorData;
use std::fmt;

/// Error types that can occur while bridging tool calls to the ast-grep CLI.
///
/// Tool-level failures are surfaced to the MCP client as structured content
/// (summary text plus a `{code, message, recoverable}` JSON body), not as
/// protocol-level errors. Only malformed request parameters and unknown tool
/// names become protocol errors.
#[derive(Debug)]
pub enum ServiceError {
    /// Request parameters failed validation before any subprocess was spawned
    Validation(String),
    /// No usable ast-grep binary, or download/installation failed
    Binary(String),
    /// A requested path escapes the configured workspace roots
    Security(String),
    /// The child process exceeded the configured timeout
    Timeout { seconds: u64 },
    /// The ast-grep binary rejected the invocation
    Execution { message: String, stderr: String },
    /// The binary's JSON stream output could not be parsed
    Json(String),
    /// Inline rule YAML could not be composed
    Yaml(String),
    /// I/O error reading/writing files
    Io(std::io::Error),
    /// Glob pattern compilation error
    Glob(globset::Error),
    /// Regular expression compilation error
    Regex(regex::Error),
    /// Error walking directory trees during fallback search
    WalkDir(walkdir::Error),
    /// MCP tool not found
    ToolNotFound(String),
}

impl ServiceError {
    /// Stable machine-readable tag for the structured error body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::Binary(_) => "binary_error",
            ServiceError::Security(_) => "security_error",
            ServiceError::Timeout { .. } => "timeout_error",
            ServiceError::Execution { .. } => "execution_error",
            ServiceError::Json(_) => "json_error",
            ServiceError::Yaml(_) => "yaml_error",
            ServiceError::Io(_) => "io_error",
            ServiceError::Glob(_) => "glob_error",
            ServiceError::Regex(_) => "regex_error",
            ServiceError::WalkDir(_) => "walkdir_error",
            ServiceError::ToolNotFound(_) => "tool_not_found",
        }
    }

    /// Whether the client can expect a retry to succeed after adjusting its
    /// request or environment. Security denials and engine rejections are
    /// final; bad parameters, missing binaries, and timeouts are not.
    pub fn recoverable(&self) -> bool {
        match self {
            ServiceError::Validation(_) => true,
            ServiceError::Binary(_) => true,
            ServiceError::Timeout { .. } => true,
            ServiceError::Glob(_) => true,
            ServiceError::Security(_) => false,
            ServiceError::Execution { .. } => false,
            ServiceError::Json(_) => false,
            ServiceError::Yaml(_) => false,
            ServiceError::Io(_) => false,
            ServiceError::Regex(_) => false,
            ServiceError::WalkDir(_) => false,
            ServiceError::ToolNotFound(_) => false,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation(msg) => write!(f, "Validation error: {msg}"),
            ServiceError::Binary(msg) => write!(f, "Binary error: {msg}"),
            ServiceError::Security(msg) => write!(f, "Security error: {msg}"),
            ServiceError::Timeout { seconds } => {
                write!(f, "ast-grep did not finish within {seconds}s")
            }
            ServiceError::Execution { message, stderr } => {
                if stderr.is_empty() {
                    write!(f, "Execution error: {message}")
                } else {
                    write!(f, "Execution error: {message}: {stderr}")
                }
            }
            ServiceError::Json(msg) => write!(f, "JSON stream error: {msg}"),
            ServiceError::Yaml(msg) => write!(f, "Rule YAML error: {msg}"),
            ServiceError::Io(err) => write!(f, "IO error: {err}"),
            ServiceError::Glob(err) => write!(f, "Glob error: {err}"),
            ServiceError::Regex(err) => write!(f, "Regex error: {err}"),
            ServiceError::WalkDir(err) => write!(f, "Directory traversal error: {err}"),
            ServiceError::ToolNotFound(tool) => write!(f, "Tool not found: {tool}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Io(err)
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for ServiceError {
    fn from(err: serde_yaml::Error) -> Self {
        ServiceError::Yaml(err.to_string())
    }
}

impl From<globset::Error> for ServiceError {
    fn from(err: globset::Error) -> Self {
        ServiceError::Glob(err)
    }
}

impl From<regex::Error> for ServiceError {
    fn from(err: regex::Error) -> Self {
        ServiceError::Regex(err)
    }
}

impl From<walkdir::Error> for ServiceError {
    fn from(err: walkdir::Error) -> Self {
        ServiceError::WalkDir(err)
    }
}

impl From<ServiceError> for ErrorData {
    fn from(err: ServiceError) -> Self {
        ErrorData::internal_error(err.to_string(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(ServiceError::Validation("bad".into()).recoverable());
        assert!(ServiceError::Binary("missing".into()).recoverable());
        assert!(ServiceError::Timeout { seconds: 30 }.recoverable());
        assert!(!ServiceError::Security("escape".into()).recoverable());
        assert!(
            !ServiceError::Execution {
                message: "exit 2".into(),
                stderr: "bad pattern".into(),
            }
            .recoverable()
        );
        assert!(!ServiceError::Json("line 3".into()).recoverable());
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ServiceError::Validation("x".into()).code(), "validation_error");
        assert_eq!(ServiceError::Binary("x".into()).code(), "binary_error");
        assert_eq!(ServiceError::Security("x".into()).code(), "security_error");
        assert_eq!(ServiceError::Timeout { seconds: 1 }.code(), "timeout_error");
    }

    #[test]
    fn test_execution_display_includes_stderr() {
        let err = ServiceError::Execution {
            message: "ast-grep exited with status 2".into(),
            stderr: "unknown flag".into(),
        };
        let text = err.to_string();
        assert!(text.contains("status 2"));
        assert!(text.contains("unknown flag"));
    }
}

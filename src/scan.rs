//! Lint-rule scans.
//!
//! `ast_run_rule` composes a single inline YAML rule from the request and
//! hands it to `ast-grep scan --inline-rules`. The rule engine itself lives
//! in the binary; this module only builds the YAML and parses findings.

use crate::binary::BinaryManager;
use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use crate::exec;
use crate::pattern::PatternValidator;
use crate::types::*;
use crate::workspace::WorkspaceManager;

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Severities `ast-grep scan` understands.
pub const SEVERITY_LEVELS: &[&str] = &["error", "warning", "info", "hint", "off"];

/// Inline rule shape serialized to YAML for `--inline-rules`.
#[derive(Debug, Serialize)]
struct InlineRule<'a> {
    id: &'a str,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
    rule: InlinePattern<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct InlinePattern<'a> {
    pattern: &'a str,
}

#[derive(Clone)]
pub struct ScanService {
    config: ServiceConfig,
    workspace: WorkspaceManager,
    binary: BinaryManager,
    validator: PatternValidator,
}

impl ScanService {
    pub fn new(config: ServiceConfig, workspace: WorkspaceManager, binary: BinaryManager) -> Self {
        Self {
            config,
            workspace,
            binary,
            validator: PatternValidator::new(),
        }
    }

    #[tracing::instrument(skip(self, param), fields(rule_id = %param.id))]
    pub async fn ast_run_rule(&self, param: RunRuleParam) -> Result<RunRuleResult, ServiceError> {
        let warnings = self.validator.validate(&param.pattern)?;
        validate_rule_id(&param.id)?;
        if param.language.trim().is_empty() {
            return Err(ServiceError::Validation(
                "language is required for rule scans".to_string(),
            ));
        }
        if let Some(severity) = &param.severity {
            if !SEVERITY_LEVELS.contains(&severity.as_str()) {
                return Err(ServiceError::Validation(format!(
                    "unknown severity '{severity}'; expected one of: {}",
                    SEVERITY_LEVELS.join(", ")
                )));
            }
        }
        if param.max_results == 0 {
            return Err(ServiceError::Validation(
                "max_results must be at least 1".to_string(),
            ));
        }

        let rule_yaml = compose_rule_yaml(&param)?;
        let paths = self.workspace.resolve_paths(&param.paths)?;

        // Rule evaluation has no approximation; the real engine is required.
        let binary = self.binary.resolve().await?.ok_or_else(|| {
            ServiceError::Binary(format!(
                "ast-grep binary is required for ast_run_rule; install it or set {}",
                crate::binary::AST_GREP_ENV_VAR
            ))
        })?;

        let args = build_scan_args(&rule_yaml, &param, &paths);
        let output = exec::run_binary(
            &binary.path,
            &args,
            self.config.command_timeout(),
            self.config.max_output_bytes,
        )
        .await?;
        exec::check_execution(&output)?;

        let stream: Vec<StreamMatch> = exec::parse_json_stream(&output.stdout)?;
        let total_findings = stream.len();
        let files: BTreeSet<&str> = stream.iter().map(|m| m.file.as_str()).collect();
        let files_with_findings = files.len();

        let findings: Vec<RuleFinding> = stream
            .iter()
            .take(param.max_results)
            .map(|m| RuleFinding::from_stream(m, &param.id))
            .collect();

        Ok(RunRuleResult {
            limit_reached: total_findings > findings.len(),
            findings,
            total_findings,
            files_with_findings,
            rule: rule_yaml,
            pattern_warnings: warnings,
        })
    }
}

/// Rule ids end up in file names and reports; keep them to the conventional
/// kebab/snake identifier shape.
pub fn validate_rule_id(id: &str) -> Result<(), ServiceError> {
    let mut chars = id.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_alphabetic()
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "invalid rule id '{id}': must start with a letter and contain only letters, digits, '-' or '_'"
        )))
    }
}

pub fn compose_rule_yaml(param: &RunRuleParam) -> Result<String, ServiceError> {
    let rule = InlineRule {
        id: &param.id,
        language: &param.language,
        severity: param.severity.as_deref(),
        message: param.message.as_deref(),
        note: param.note.as_deref(),
        rule: InlinePattern {
            pattern: &param.pattern,
        },
        fix: param.fix.as_deref(),
    };
    Ok(serde_yaml::to_string(&rule)?)
}

/// `ast-grep scan --inline-rules` invocation.
pub fn build_scan_args(rule_yaml: &str, param: &RunRuleParam, paths: &[PathBuf]) -> Vec<String> {
    let mut args = vec![
        "scan".to_string(),
        "--inline-rules".to_string(),
        rule_yaml.to_string(),
        "--json=stream".to_string(),
    ];

    for glob in &param.globs {
        args.push("--globs".to_string());
        args.push(glob.clone());
    }
    for path in paths {
        args.push(path.to_string_lossy().to_string());
    }

    args
}

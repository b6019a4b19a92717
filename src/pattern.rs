//! Pattern heuristics.
//!
//! ast-grep itself is the only real authority on pattern syntax. These
//! regex checks inspect the pattern string before it reaches the binary and
//! emit advisory warnings for the mistakes LLM clients make most often.
//! Only an empty pattern is a hard error.

use crate::errors::ServiceError;
use regex::Regex;

/// Metavariable names that almost always denote a list of nodes. A single
/// `$` capture with one of these names matches exactly one node, which is
/// rarely what the caller meant.
const SPREAD_NAMES: &[&str] = &["ARGS", "PARAMS", "BODY", "STMTS", "ITEMS", "ELEMENTS", "FIELDS"];

const METAVAR_WARNING_THRESHOLD: usize = 5;

#[derive(Clone, Default)]
pub struct PatternValidator;

impl PatternValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check a pattern string and collect advisory warnings. Warnings never
    /// block execution; they ride along in the tool result.
    pub fn validate(&self, pattern: &str) -> Result<Vec<String>, ServiceError> {
        if pattern.trim().is_empty() {
            return Err(ServiceError::Validation(
                "pattern must not be empty".to_string(),
            ));
        }

        let mut warnings = Vec::new();

        // $$$NAME captures are fine; strip them so the single-$ checks below
        // only see what is left.
        let multi_re = Regex::new(r"\$\$\$[A-Z_][A-Z0-9_]*|\$\$\$")?;
        let without_multi = multi_re.replace_all(pattern, "");

        let lower_re = Regex::new(r"\$([a-z][A-Za-z0-9_]*)")?;
        for cap in lower_re.captures_iter(&without_multi) {
            if let Some(name) = cap.get(1) {
                warnings.push(format!(
                    "metavariable '${}' is lowercase and will not capture; use '${}'",
                    name.as_str(),
                    name.as_str().to_uppercase()
                ));
            }
        }

        let single_re = Regex::new(r"\$([A-Z_][A-Z0-9_]*)")?;
        let mut metavar_count = 0;
        for cap in single_re.captures_iter(&without_multi) {
            metavar_count += 1;
            if let Some(name) = cap.get(1) {
                if SPREAD_NAMES.contains(&name.as_str()) {
                    warnings.push(format!(
                        "'${}' matches a single node; if you meant a list (arguments, statements, ...) use '$$${}'",
                        name.as_str(),
                        name.as_str()
                    ));
                }
            }
        }
        metavar_count += multi_re.find_iter(pattern).count();

        if pattern.contains("...") {
            warnings.push(
                "'...' is not ast-grep syntax; use '$$$' to match zero or more nodes".to_string(),
            );
        }

        for (open, close, label) in [('(', ')', "parentheses"), ('{', '}', "braces"), ('[', ']', "brackets")] {
            let opens = pattern.matches(open).count();
            let closes = pattern.matches(close).count();
            if opens != closes {
                warnings.push(format!(
                    "unbalanced {label} ({opens} '{open}' vs {closes} '{close}'); the pattern may not parse as a complete AST node"
                ));
            }
        }

        if metavar_count > METAVAR_WARNING_THRESHOLD {
            warnings.push(format!(
                "{metavar_count} metavariables in one pattern; consider splitting the search"
            ));
        }

        Ok(warnings)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Wire types mirroring ast-grep's --json=stream output (camelCase on the wire).

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WirePosition {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WireByteOffset {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRange {
    pub byte_offset: WireByteOffset,
    pub start: WirePosition,
    pub end: WirePosition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMetaVar {
    pub text: String,
    pub range: WireRange,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireMetaVariables {
    #[serde(default)]
    pub single: HashMap<String, WireMetaVar>,
    #[serde(default)]
    pub multi: HashMap<String, Vec<WireMetaVar>>,
    #[serde(default)]
    pub transformed: HashMap<String, String>,
}

/// One line of `--json=stream` output. `ast-grep run` and `ast-grep scan`
/// share this shape; scan additionally fills the rule fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMatch {
    pub text: String,
    pub range: WireRange,
    pub file: String,
    #[serde(default)]
    pub lines: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub meta_variables: Option<WireMetaVariables>,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub replacement_offsets: Option<WireByteOffset>,
    #[serde(default)]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

// ast_search types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParam {
    pub pattern: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub globs: Vec<String>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub strictness: Option<String>,
    #[serde(default)]
    pub context: Option<usize>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub include_hidden: bool,
}

impl Default for SearchParam {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            paths: Vec::new(),
            language: None,
            globs: Vec::new(),
            selector: None,
            strictness: None,
            context: None,
            max_results: default_max_results(),
            follow_symlinks: false,
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub file_path: String,
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
    pub byte_start: usize,
    pub byte_end: usize,
    pub vars: HashMap<String, String>,
}

impl MatchRecord {
    /// Flatten a stream record into the flat shape clients consume.
    /// Multi-node captures are joined into one text value.
    pub fn from_stream(m: &StreamMatch) -> Self {
        let mut vars = HashMap::new();
        if let Some(meta) = &m.meta_variables {
            for (name, var) in &meta.single {
                vars.insert(name.clone(), var.text.clone());
            }
            for (name, items) in &meta.multi {
                let joined = items
                    .iter()
                    .map(|v| v.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                vars.insert(name.clone(), joined);
            }
            for (name, text) in &meta.transformed {
                vars.insert(name.clone(), text.clone());
            }
        }

        MatchRecord {
            file_path: m.file.clone(),
            text: m.text.clone(),
            start_line: m.range.start.line,
            end_line: m.range.end.line,
            start_col: m.range.start.column,
            end_col: m.range.end.column,
            byte_start: m.range.byte_offset.start,
            byte_end: m.range.byte_offset.end,
            vars,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub matches: Vec<MatchRecord>,
    pub total_matches: usize,
    pub files_with_matches: usize,
    pub limit_reached: bool,
    /// "ast-grep" for real invocations, "regex-fallback" when no binary was available
    pub engine: String,
    pub pattern_warnings: Vec<String>,
}

// ast_replace types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceParam {
    pub pattern: String,
    pub replacement: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub globs: Vec<String>,
    #[serde(default = "default_true")]
    pub dry_run: bool,
    #[serde(default = "default_max_results_large")]
    pub max_results: usize,
}

impl Default for ReplaceParam {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            replacement: String::new(),
            paths: Vec::new(),
            language: None,
            globs: Vec::new(),
            dry_run: default_true(),
            max_results: default_max_results_large(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
    pub old_text: String,
    pub new_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileChangeSet {
    pub file_path: String,
    pub changes: Vec<ChangeRecord>,
    pub total_changes: usize,
    /// sha256 of the file content after an applied replace; absent for dry runs
    pub file_hash: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplaceResult {
    pub file_results: Vec<FileChangeSet>,
    pub files_with_changes: usize,
    pub total_changes: usize,
    pub dry_run: bool,
    pub applied: bool,
    pub limit_reached: bool,
    pub pattern_warnings: Vec<String>,
}

// ast_run_rule types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRuleParam {
    pub id: String,
    pub language: String,
    pub pattern: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub fix: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub globs: Vec<String>,
    #[serde(default = "default_max_findings")]
    pub max_results: usize,
}

impl Default for RunRuleParam {
    fn default() -> Self {
        Self {
            id: String::new(),
            language: String::new(),
            pattern: String::new(),
            message: None,
            severity: None,
            fix: None,
            note: None,
            paths: Vec::new(),
            globs: Vec::new(),
            max_results: default_max_findings(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleFinding {
    pub rule_id: String,
    pub severity: String,
    pub message: Option<String>,
    pub note: Option<String>,
    pub file_path: String,
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
    /// Rewrite the rule's fix would apply, when the rule has one
    pub suggested_fix: Option<String>,
}

impl RuleFinding {
    pub fn from_stream(m: &StreamMatch, fallback_rule_id: &str) -> Self {
        RuleFinding {
            rule_id: m
                .rule_id
                .clone()
                .unwrap_or_else(|| fallback_rule_id.to_string()),
            severity: m.severity.clone().unwrap_or_else(|| "warning".to_string()),
            message: m.message.clone(),
            note: m.note.clone(),
            file_path: m.file.clone(),
            text: m.text.clone(),
            start_line: m.range.start.line,
            end_line: m.range.end.line,
            start_col: m.range.start.column,
            end_col: m.range.end.column,
            suggested_fix: m.replacement.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunRuleResult {
    pub findings: Vec<RuleFinding>,
    pub total_findings: usize,
    pub files_with_findings: usize,
    pub limit_reached: bool,
    /// The inline YAML rule handed to `ast-grep scan`
    pub rule: String,
    pub pattern_warnings: Vec<String>,
}

// Utility types

#[derive(Debug, Serialize, Deserialize)]
pub struct ListLanguagesParam {}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListLanguagesResult {
    pub languages: Vec<String>,
}

// Default functions for serde
fn default_max_results() -> usize {
    100
}
fn default_max_results_large() -> usize {
    1000
}
fn default_max_findings() -> usize {
    500
}
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_param_defaults() {
        let param = SearchParam {
            pattern: "console.log($VAR)".to_string(),
            language: Some("javascript".to_string()),
            ..Default::default()
        };

        assert!(param.paths.is_empty());
        assert!(param.globs.is_empty());
        assert_eq!(param.max_results, 100);
        assert!(!param.follow_symlinks);
        assert!(!param.include_hidden);
    }

    #[test]
    fn test_replace_param_defaults() {
        let param = ReplaceParam {
            pattern: "var $VAR = $VALUE;".to_string(),
            replacement: "let $VAR = $VALUE;".to_string(),
            language: Some("javascript".to_string()),
            ..Default::default()
        };

        assert!(param.dry_run); // Should default to true
        assert_eq!(param.max_results, 1000);
    }

    #[test]
    fn test_run_rule_param_defaults() {
        let json = r#"{"id": "no-eval", "language": "javascript", "pattern": "eval($ARG)"}"#;
        let param: RunRuleParam = serde_json::from_str(json).unwrap();

        assert_eq!(param.id, "no-eval");
        assert!(param.severity.is_none());
        assert!(param.fix.is_none());
        assert_eq!(param.max_results, 500);
    }

    #[test]
    fn test_stream_match_wire_parse() {
        // A representative line of `ast-grep run --json=stream` output.
        let line = r#"{"text":"console.log(x)","range":{"byteOffset":{"start":10,"end":24},"start":{"line":1,"column":0},"end":{"line":1,"column":14}},"file":"src/app.js","lines":"console.log(x)","language":"JavaScript","metaVariables":{"single":{"VAR":{"text":"x","range":{"byteOffset":{"start":22,"end":23},"start":{"line":1,"column":12},"end":{"line":1,"column":13}}}},"multi":{},"transformed":{}}}"#;

        let m: StreamMatch = serde_json::from_str(line).unwrap();
        assert_eq!(m.file, "src/app.js");
        assert_eq!(m.range.start.line, 1);
        assert_eq!(m.range.byte_offset.start, 10);
        assert!(m.replacement.is_none());

        let record = MatchRecord::from_stream(&m);
        assert_eq!(record.vars.get("VAR").map(String::as_str), Some("x"));
        assert_eq!(record.byte_end, 24);
    }

    #[test]
    fn test_stream_match_with_replacement() {
        let line = r#"{"text":"var x = 1;","range":{"byteOffset":{"start":0,"end":10},"start":{"line":0,"column":0},"end":{"line":0,"column":10}},"file":"a.js","lines":"var x = 1;","replacement":"let x = 1;","replacementOffsets":{"start":0,"end":10}}"#;

        let m: StreamMatch = serde_json::from_str(line).unwrap();
        assert_eq!(m.replacement.as_deref(), Some("let x = 1;"));
        assert_eq!(m.replacement_offsets.unwrap().end, 10);
    }

    #[test]
    fn test_stream_match_scan_fields() {
        let line = r#"{"text":"eval(code)","range":{"byteOffset":{"start":5,"end":15},"start":{"line":2,"column":4},"end":{"line":2,"column":14}},"file":"b.js","lines":"eval(code)","ruleId":"no-eval","severity":"error","message":"do not use eval"}"#;

        let m: StreamMatch = serde_json::from_str(line).unwrap();
        let finding = RuleFinding::from_stream(&m, "fallback-id");
        assert_eq!(finding.rule_id, "no-eval");
        assert_eq!(finding.severity, "error");
        assert_eq!(finding.message.as_deref(), Some("do not use eval"));
        assert!(finding.suggested_fix.is_none());
    }

    #[test]
    fn test_multi_metavar_joined() {
        let line = r#"{"text":"f(a, b)","range":{"byteOffset":{"start":0,"end":7},"start":{"line":0,"column":0},"end":{"line":0,"column":7}},"file":"c.js","lines":"f(a, b)","metaVariables":{"single":{},"multi":{"ARGS":[{"text":"a","range":{"byteOffset":{"start":2,"end":3},"start":{"line":0,"column":2},"end":{"line":0,"column":3}}},{"text":"b","range":{"byteOffset":{"start":5,"end":6},"start":{"line":0,"column":5},"end":{"line":0,"column":6}}}]},"transformed":{}}}"#;

        let m: StreamMatch = serde_json::from_str(line).unwrap();
        let record = MatchRecord::from_stream(&m);
        assert_eq!(record.vars.get("ARGS").map(String::as_str), Some("a b"));
    }

    #[test]
    fn test_search_param_serialization() {
        let param = SearchParam {
            pattern: "console.log($VAR)".to_string(),
            paths: vec!["src".to_string()],
            language: Some("javascript".to_string()),
            ..Default::default()
        };

        let serialized = serde_json::to_string(&param).unwrap();
        let deserialized: SearchParam = serde_json::from_str(&serialized).unwrap();

        assert_eq!(param.pattern, deserialized.pattern);
        assert_eq!(param.paths, deserialized.paths);
        assert_eq!(param.language, deserialized.language);
    }
}

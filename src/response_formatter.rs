use crate::errors::ServiceError;
use crate::types::*;
use rmcp::model::{CallToolResult, Content};
use serde_json;

pub struct ResponseFormatter;

impl ResponseFormatter {
    /// Create a formatted response with both JSON data and human-readable text
    pub fn create_formatted_response<T>(
        result: &T,
        summary: String,
    ) -> Result<CallToolResult, Box<dyn std::error::Error + Send + Sync>>
    where
        T: serde::Serialize,
    {
        let json_value = serde_json::to_value(result)?;

        let contents = vec![Content::text(summary), Content::json(json_value)?];

        Ok(CallToolResult::success(contents))
    }

    /// Surface a service failure as structured tool content rather than a
    /// protocol-level error: a text summary plus a machine-readable body.
    pub fn error_result(err: &ServiceError) -> CallToolResult {
        let body = serde_json::json!({
            "code": err.code(),
            "message": err.to_string(),
            "recoverable": err.recoverable(),
        });

        let mut contents = vec![Content::text(format!("❌ **{}**", err))];
        if let Ok(json) = Content::json(body) {
            contents.push(json);
        }
        CallToolResult::error(contents)
    }

    /// Format a search result with a readable summary
    pub fn format_search_result(result: &SearchResult) -> String {
        let mut summary = if result.matches.is_empty() {
            "🔍 **No matches found**\n\nThe pattern did not match anything in the searched paths."
                .to_string()
        } else {
            let mut text = format!(
                "🔍 **Search Results**\n\n🎯 **Matches**: {} in {} files\n",
                result.total_matches, result.files_with_matches
            );

            for (i, m) in result.matches.iter().take(5).enumerate() {
                text.push_str(&format!(
                    "\n{}. `{}` **Line {}-{}**:\n```\n{}\n```\n",
                    i + 1,
                    m.file_path,
                    m.start_line,
                    m.end_line,
                    m.text.trim()
                ));
            }
            if result.matches.len() > 5 {
                text.push_str(&format!(
                    "\n... and {} more matches in the JSON data\n",
                    result.matches.len() - 5
                ));
            }
            if result.limit_reached {
                text.push_str("\n⚠️ **Result limit reached** - raise max_results or narrow the search\n");
            }
            text
        };

        if result.engine == "regex-fallback" {
            summary.push_str("\n⚠️ **Regex fallback** - no ast-grep binary was available; matches are approximate\n");
        }
        append_warnings(&mut summary, &result.pattern_warnings);
        summary
    }

    /// Format a replace result with a readable summary
    pub fn format_replace_result(result: &ReplaceResult) -> String {
        let mut summary = if result.total_changes == 0 {
            "🔄 **No changes**\n\nThe pattern did not match anything to rewrite.".to_string()
        } else {
            let mode = if result.applied {
                "✅ **Changes applied**"
            } else {
                "🔍 **Dry run** - no files were modified"
            };
            let mut text = format!(
                "{mode}\n\n📁 **Files**: {}\n🔄 **Changes**: {}\n",
                result.files_with_changes, result.total_changes
            );

            for file_result in result.file_results.iter().take(5) {
                text.push_str(&format!(
                    "\n📄 `{}`: {} changes\n",
                    file_result.file_path, file_result.total_changes
                ));
                if let Some(change) = file_result.changes.first() {
                    text.push_str(&format!(
                        "   Line {}: `{}` → `{}`\n",
                        change.start_line,
                        change.old_text.trim(),
                        change.new_text.trim()
                    ));
                }
            }
            if result.file_results.len() > 5 {
                text.push_str(&format!(
                    "\n... and {} more files in the JSON data\n",
                    result.file_results.len() - 5
                ));
            }
            if result.limit_reached {
                text.push_str("\n⚠️ **Change limit reached** - not all matches are listed\n");
            }
            text
        };

        append_warnings(&mut summary, &result.pattern_warnings);
        summary
    }

    /// Format a rule scan result with a readable summary
    pub fn format_run_rule_result(result: &RunRuleResult) -> String {
        let mut summary = if result.findings.is_empty() {
            "📋 **No findings**\n\nThe rule did not flag anything in the scanned paths.".to_string()
        } else {
            let mut text = format!(
                "📋 **Rule Findings**\n\n🎯 **Findings**: {} in {} files\n",
                result.total_findings, result.files_with_findings
            );

            for (i, finding) in result.findings.iter().take(5).enumerate() {
                text.push_str(&format!(
                    "\n{}. [{}] `{}` **Line {}**: {}\n",
                    i + 1,
                    finding.severity,
                    finding.file_path,
                    finding.start_line,
                    finding
                        .message
                        .as_deref()
                        .unwrap_or(finding.text.trim())
                ));
            }
            if result.findings.len() > 5 {
                text.push_str(&format!(
                    "\n... and {} more findings in the JSON data\n",
                    result.findings.len() - 5
                ));
            }
            if result.limit_reached {
                text.push_str("\n⚠️ **Finding limit reached** - raise max_results or narrow the scan\n");
            }
            text
        };

        append_warnings(&mut summary, &result.pattern_warnings);
        summary
    }
}

fn append_warnings(summary: &mut String, warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    summary.push_str("\n⚠️ **Pattern warnings**:\n");
    for warning in warnings {
        summary.push_str(&format!("- {warning}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_match() -> MatchRecord {
        MatchRecord {
            file_path: "src/app.js".to_string(),
            text: "console.log(x)".to_string(),
            start_line: 3,
            end_line: 3,
            start_col: 0,
            end_col: 14,
            byte_start: 30,
            byte_end: 44,
            vars: HashMap::new(),
        }
    }

    #[test]
    fn test_format_search_result_empty() {
        let result = SearchResult {
            matches: vec![],
            total_matches: 0,
            files_with_matches: 0,
            limit_reached: false,
            engine: "ast-grep".to_string(),
            pattern_warnings: vec![],
        };
        let summary = ResponseFormatter::format_search_result(&result);
        assert!(summary.contains("No matches found"));
    }

    #[test]
    fn test_format_search_result_fallback_flagged() {
        let result = SearchResult {
            matches: vec![sample_match()],
            total_matches: 1,
            files_with_matches: 1,
            limit_reached: false,
            engine: "regex-fallback".to_string(),
            pattern_warnings: vec!["a warning".to_string()],
        };
        let summary = ResponseFormatter::format_search_result(&result);
        assert!(summary.contains("Regex fallback"));
        assert!(summary.contains("a warning"));
        assert!(summary.contains("src/app.js"));
    }

    #[test]
    fn test_format_replace_result_dry_run() {
        let result = ReplaceResult {
            file_results: vec![FileChangeSet {
                file_path: "src/app.js".to_string(),
                changes: vec![ChangeRecord {
                    start_line: 1,
                    end_line: 1,
                    start_col: 0,
                    end_col: 10,
                    old_text: "var x = 1;".to_string(),
                    new_text: "let x = 1;".to_string(),
                }],
                total_changes: 1,
                file_hash: None,
            }],
            files_with_changes: 1,
            total_changes: 1,
            dry_run: true,
            applied: false,
            limit_reached: false,
            pattern_warnings: vec![],
        };
        let summary = ResponseFormatter::format_replace_result(&result);
        assert!(summary.contains("Dry run"));
        assert!(summary.contains("no files were modified"));
        assert!(summary.contains("var x = 1;"));
    }

    #[test]
    fn test_error_result_is_structured() {
        let err = ServiceError::Timeout { seconds: 30 };
        let result = ResponseFormatter::error_result(&err);
        assert_eq!(result.is_error, Some(true));
    }
}

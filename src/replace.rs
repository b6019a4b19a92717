use crate::binary::BinaryManager;
use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use crate::exec;
use crate::pattern::PatternValidator;
use crate::types::*;
use crate::workspace::WorkspaceManager;

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Clone)]
pub struct ReplaceService {
    config: ServiceConfig,
    workspace: WorkspaceManager,
    binary: BinaryManager,
    validator: PatternValidator,
}

impl ReplaceService {
    pub fn new(config: ServiceConfig, workspace: WorkspaceManager, binary: BinaryManager) -> Self {
        Self {
            config,
            workspace,
            binary,
            validator: PatternValidator::new(),
        }
    }

    #[tracing::instrument(skip(self, param), fields(pattern = %param.pattern, dry_run = param.dry_run))]
    pub async fn ast_replace(&self, param: ReplaceParam) -> Result<ReplaceResult, ServiceError> {
        let warnings = self.validator.validate(&param.pattern)?;
        if param.max_results == 0 {
            return Err(ServiceError::Validation(
                "max_results must be at least 1".to_string(),
            ));
        }

        let paths = self.workspace.resolve_paths(&param.paths)?;

        // Rewriting from a regex approximation is never acceptable; replace
        // requires the real engine.
        let binary = self.binary.resolve().await?.ok_or_else(|| {
            ServiceError::Binary(format!(
                "ast-grep binary is required for ast_replace; install it or set {}",
                crate::binary::AST_GREP_ENV_VAR
            ))
        })?;

        let args = build_replace_args(&param, &paths);
        let output = exec::run_binary(
            &binary.path,
            &args,
            self.config.command_timeout(),
            self.config.max_output_bytes,
        )
        .await?;
        exec::check_execution(&output)?;

        let stream: Vec<StreamMatch> = exec::parse_json_stream(&output.stdout)?;
        let total_changes = stream.len();
        let limit_reached = total_changes > param.max_results;

        // Deterministic file order, changes grouped per file.
        let mut per_file: BTreeMap<String, Vec<ChangeRecord>> = BTreeMap::new();
        for m in stream.iter().take(param.max_results) {
            per_file
                .entry(m.file.clone())
                .or_default()
                .push(ChangeRecord {
                    start_line: m.range.start.line,
                    end_line: m.range.end.line,
                    start_col: m.range.start.column,
                    end_col: m.range.end.column,
                    old_text: m.text.clone(),
                    new_text: m.replacement.clone().unwrap_or_default(),
                });
        }

        let applied = !param.dry_run;
        let mut file_results = Vec::with_capacity(per_file.len());
        for (file_path, changes) in per_file {
            let file_hash = if applied {
                Some(hash_file(&file_path)?)
            } else {
                None
            };
            file_results.push(FileChangeSet {
                total_changes: changes.len(),
                file_path,
                changes,
                file_hash,
            });
        }

        Ok(ReplaceResult {
            files_with_changes: file_results.len(),
            file_results,
            total_changes,
            dry_run: param.dry_run,
            applied,
            limit_reached,
            pattern_warnings: warnings,
        })
    }
}

/// sha256 of the file content after an applied rewrite, so clients can
/// detect concurrent edits before a follow-up call.
fn hash_file(path: &str) -> Result<String, ServiceError> {
    let content = std::fs::read(path)?;
    Ok(format!("sha256:{}", hex::encode(Sha256::digest(&content))))
}

/// `ast-grep run --rewrite` invocation. `--update-all` is appended only when
/// the caller explicitly turned dry_run off.
pub fn build_replace_args(param: &ReplaceParam, paths: &[PathBuf]) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--pattern".to_string(),
        param.pattern.clone(),
        "--rewrite".to_string(),
        param.replacement.clone(),
        "--json=stream".to_string(),
    ];

    if let Some(language) = &param.language {
        args.push("--lang".to_string());
        args.push(language.clone());
    }
    for glob in &param.globs {
        args.push("--globs".to_string());
        args.push(glob.clone());
    }
    if !param.dry_run {
        args.push("--update-all".to_string());
    }
    for path in paths {
        args.push(path.to_string_lossy().to_string());
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_replace_args_dry_run() {
        let param = ReplaceParam {
            pattern: "var $VAR = $VALUE;".to_string(),
            replacement: "let $VAR = $VALUE;".to_string(),
            language: Some("javascript".to_string()),
            ..Default::default()
        };
        let args = build_replace_args(&param, &[PathBuf::from("/ws")]);

        assert_eq!(
            args,
            vec![
                "run",
                "--pattern",
                "var $VAR = $VALUE;",
                "--rewrite",
                "let $VAR = $VALUE;",
                "--json=stream",
                "--lang",
                "javascript",
                "/ws",
            ]
        );
        assert!(!args.contains(&"--update-all".to_string()));
    }

    #[test]
    fn test_build_replace_args_apply_mode() {
        let param = ReplaceParam {
            pattern: "eval($ARG)".to_string(),
            replacement: String::new(),
            dry_run: false,
            ..Default::default()
        };
        let args = build_replace_args(&param, &[PathBuf::from("/ws")]);

        assert!(args.contains(&"--update-all".to_string()));
        // The empty rewrite (deletion) still travels as an explicit argument.
        let rewrite_idx = args.iter().position(|a| a == "--rewrite").unwrap();
        assert_eq!(args[rewrite_idx + 1], "");
    }
}

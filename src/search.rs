use crate::binary::{BinaryManager, ResolvedBinary};
use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use crate::exec;
use crate::fallback;
use crate::pattern::PatternValidator;
use crate::types::*;
use crate::workspace::WorkspaceManager;

use std::collections::BTreeSet;
use std::path::PathBuf;

/// Match strictness levels `ast-grep run --strictness` accepts.
pub const STRICTNESS_LEVELS: &[&str] = &["cst", "smart", "ast", "relaxed", "signature"];

#[derive(Clone)]
pub struct SearchService {
    config: ServiceConfig,
    workspace: WorkspaceManager,
    binary: BinaryManager,
    validator: PatternValidator,
}

impl SearchService {
    pub fn new(config: ServiceConfig, workspace: WorkspaceManager, binary: BinaryManager) -> Self {
        Self {
            config,
            workspace,
            binary,
            validator: PatternValidator::new(),
        }
    }

    #[tracing::instrument(skip(self, param), fields(pattern = %param.pattern))]
    pub async fn ast_search(&self, param: SearchParam) -> Result<SearchResult, ServiceError> {
        let mut warnings = self.validator.validate(&param.pattern)?;

        if let Some(strictness) = &param.strictness {
            if !STRICTNESS_LEVELS.contains(&strictness.as_str()) {
                return Err(ServiceError::Validation(format!(
                    "unknown strictness '{strictness}'; expected one of: {}",
                    STRICTNESS_LEVELS.join(", ")
                )));
            }
        }
        if param.max_results == 0 {
            return Err(ServiceError::Validation(
                "max_results must be at least 1".to_string(),
            ));
        }

        let paths = self.workspace.resolve_paths(&param.paths)?;

        match self.binary.resolve().await? {
            Some(binary) => {
                self.search_with_binary(&binary, &param, &paths, warnings)
                    .await
            }
            None => {
                tracing::warn!("no ast-grep binary resolved; using regex fallback");
                warnings.push(fallback::FALLBACK_WARNING.to_string());
                let matches = fallback::regex_search(&paths, &param, &self.config)?;
                let files: BTreeSet<&str> =
                    matches.iter().map(|m| m.file_path.as_str()).collect();
                let limit_reached = matches.len() >= param.max_results;
                Ok(SearchResult {
                    total_matches: matches.len(),
                    files_with_matches: files.len(),
                    matches,
                    limit_reached,
                    engine: "regex-fallback".to_string(),
                    pattern_warnings: warnings,
                })
            }
        }
    }

    async fn search_with_binary(
        &self,
        binary: &ResolvedBinary,
        param: &SearchParam,
        paths: &[PathBuf],
        warnings: Vec<String>,
    ) -> Result<SearchResult, ServiceError> {
        let args = build_search_args(param, paths);
        let output = exec::run_binary(
            &binary.path,
            &args,
            self.config.command_timeout(),
            self.config.max_output_bytes,
        )
        .await?;
        exec::check_execution(&output)?;

        let stream: Vec<StreamMatch> = exec::parse_json_stream(&output.stdout)?;
        let total_matches = stream.len();
        let files: BTreeSet<&str> = stream.iter().map(|m| m.file.as_str()).collect();
        let files_with_matches = files.len();

        let matches: Vec<MatchRecord> = stream
            .iter()
            .take(param.max_results)
            .map(MatchRecord::from_stream)
            .collect();

        Ok(SearchResult {
            limit_reached: total_matches > matches.len(),
            matches,
            total_matches,
            files_with_matches,
            engine: "ast-grep".to_string(),
            pattern_warnings: warnings,
        })
    }
}

/// `ast-grep run` invocation for a search. Flag order is fixed so tests can
/// assert the exact argument array.
pub fn build_search_args(param: &SearchParam, paths: &[PathBuf]) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--pattern".to_string(),
        param.pattern.clone(),
        "--json=stream".to_string(),
    ];

    if let Some(language) = &param.language {
        args.push("--lang".to_string());
        args.push(language.clone());
    }
    if let Some(selector) = &param.selector {
        args.push("--selector".to_string());
        args.push(selector.clone());
    }
    if let Some(strictness) = &param.strictness {
        args.push("--strictness".to_string());
        args.push(strictness.clone());
    }
    for glob in &param.globs {
        args.push("--globs".to_string());
        args.push(glob.clone());
    }
    if let Some(context) = param.context {
        args.push("--context".to_string());
        args.push(context.to_string());
    }
    if param.follow_symlinks {
        args.push("--follow".to_string());
    }
    if param.include_hidden {
        args.push("--no-ignore".to_string());
        args.push("hidden".to_string());
    }
    for path in paths {
        args.push(path.to_string_lossy().to_string());
    }

    args
}

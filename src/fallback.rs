//! Regex fallback search.
//!
//! Last link in the binary resolution chain: when no ast-grep binary can be
//! resolved, `ast_search` degrades to an approximate regex scan over the
//! workspace. Metavariables become wildcards, nothing is captured, and
//! results are clearly flagged. Replace and scan never use this path.

use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use crate::types::{MatchRecord, SearchParam};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const FALLBACK_WARNING: &str = "ast-grep binary unavailable; results come from a regex \
approximation of the pattern. Structural guarantees and metavariable captures do not apply.";

/// Translate an ast-grep pattern into an approximate regex: `$$$NAME` and
/// `$$$` become lazy multi-line wildcards, `$NAME` becomes an identifier,
/// whitespace runs are flexible, everything else is matched literally.
pub fn pattern_to_regex(pattern: &str) -> Result<Regex, ServiceError> {
    let mut source = String::from("(?s)");
    let mut rest = pattern.trim();

    let multi = Regex::new(r"^\$\$\$[A-Z_][A-Z0-9_]*|^\$\$\$")?;
    let single = Regex::new(r"^\$[A-Z_][A-Z0-9_]*")?;
    let spaces = Regex::new(r"^\s+")?;

    while !rest.is_empty() {
        if let Some(m) = multi.find(rest) {
            source.push_str(".*?");
            rest = &rest[m.end()..];
        } else if let Some(m) = single.find(rest) {
            source.push_str("[A-Za-z0-9_]+");
            rest = &rest[m.end()..];
        } else if let Some(m) = spaces.find(rest) {
            source.push_str(r"\s+");
            rest = &rest[m.end()..];
        } else {
            let ch = rest.chars().next().unwrap_or_default();
            source.push_str(&regex::escape(&ch.to_string()));
            rest = &rest[ch.len_utf8()..];
        }
    }

    Ok(Regex::new(&source)?)
}

/// Walk the resolved paths and report regex pseudo-matches, applying the
/// same glob/hidden/size filters the real invocation would.
pub fn regex_search(
    paths: &[PathBuf],
    param: &SearchParam,
    config: &ServiceConfig,
) -> Result<Vec<MatchRecord>, ServiceError> {
    let regex = pattern_to_regex(&param.pattern)?;
    let glob_set = build_glob_set(&param.globs)?;
    let mut matches = Vec::new();

    for root in paths {
        for entry in WalkDir::new(root).follow_links(param.follow_symlinks) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if !param.include_hidden && is_hidden(entry.path(), root) {
                continue;
            }
            if let Some(set) = &glob_set {
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                if !set.is_match(relative) && !set.is_match(entry.path()) {
                    continue;
                }
            }
            if entry.metadata()?.len() > config.max_file_size {
                continue;
            }

            // Binary or non-UTF8 files just don't participate.
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue;
            };

            for found in regex.find_iter(&content) {
                let (start_line, start_col) = offset_to_position(&content, found.start());
                let (end_line, end_col) = offset_to_position(&content, found.end());
                matches.push(MatchRecord {
                    file_path: entry.path().to_string_lossy().to_string(),
                    text: found.as_str().to_string(),
                    start_line,
                    end_line,
                    start_col,
                    end_col,
                    byte_start: found.start(),
                    byte_end: found.end(),
                    vars: HashMap::new(),
                });
                if matches.len() >= param.max_results {
                    return Ok(matches);
                }
            }
        }
    }

    Ok(matches)
}

fn build_glob_set(globs: &[String]) -> Result<Option<GlobSet>, ServiceError> {
    if globs.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        builder.add(Glob::new(glob)?);
    }
    Ok(Some(builder.build()?))
}

fn is_hidden(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// 0-based line/column for a byte offset, matching ast-grep's positions.
fn offset_to_position(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.matches('\n').count();
    let col = before
        .rfind('\n')
        .map(|nl| offset - nl - 1)
        .unwrap_or(offset);
    (line, col)
}

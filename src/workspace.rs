//! Workspace path validation.
//!
//! Every path a request names is resolved against the configured root
//! directories. Escapes are security errors, missing paths are validation
//! errors.

use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use std::path::{Component, Path, PathBuf};

#[derive(Clone)]
pub struct WorkspaceManager {
    root_directories: Vec<PathBuf>,
}

impl WorkspaceManager {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            root_directories: config.root_directories.clone(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.root_directories
    }

    /// Resolve request paths to canonical paths under the workspace roots.
    /// An empty list means "search the whole workspace".
    pub fn resolve_paths(&self, paths: &[String]) -> Result<Vec<PathBuf>, ServiceError> {
        if paths.is_empty() {
            return self
                .root_directories
                .iter()
                .map(|root| {
                    root.canonicalize().map_err(|_| {
                        ServiceError::Validation(format!(
                            "workspace root does not exist: {}",
                            root.display()
                        ))
                    })
                })
                .collect();
        }

        let mut resolved = Vec::with_capacity(paths.len());
        for raw in paths {
            resolved.push(self.resolve_one(raw)?);
        }
        Ok(resolved)
    }

    fn resolve_one(&self, raw: &str) -> Result<PathBuf, ServiceError> {
        if raw.trim().is_empty() {
            return Err(ServiceError::Validation("empty path in 'paths'".to_string()));
        }

        let path = Path::new(raw);
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ServiceError::Security(format!(
                "path traversal is not allowed: {raw}"
            )));
        }

        if path.is_absolute() {
            let canonical = path
                .canonicalize()
                .map_err(|_| ServiceError::Validation(format!("path does not exist: {raw}")))?;
            return self.check_under_roots(canonical, raw);
        }

        // Relative paths resolve against the first root that contains them.
        for root in &self.root_directories {
            let joined = root.join(path);
            if let Ok(canonical) = joined.canonicalize() {
                return self.check_under_roots(canonical, raw);
            }
        }

        Err(ServiceError::Validation(format!(
            "path does not exist under any workspace root: {raw}"
        )))
    }

    fn check_under_roots(&self, canonical: PathBuf, raw: &str) -> Result<PathBuf, ServiceError> {
        for root in &self.root_directories {
            if let Ok(canonical_root) = root.canonicalize() {
                if canonical.starts_with(&canonical_root) {
                    return Ok(canonical);
                }
            }
        }
        Err(ServiceError::Security(format!(
            "path is outside the configured workspace roots: {raw}"
        )))
    }
}

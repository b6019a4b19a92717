//! Binary discovery and installation.
//!
//! Resolution order: configured path, `AST_GREP_BINARY_PATH`, system PATH
//! (`ast-grep` then `sg`), a previously installed copy, then a download of
//! the official release archive. An explicitly configured path that does not
//! work is a hard error rather than a silent fall-through. Resolution is not
//! cached; every call re-runs the chain.

use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const AST_GREP_ENV_VAR: &str = "AST_GREP_BINARY_PATH";

/// Release pinned for downloads. Matches the CLI version the argument
/// builders and stream parser are written against.
pub const AST_GREP_VERSION: &str = "0.38.6";

const DOWNLOAD_ATTEMPTS: u32 = 3;
const DOWNLOAD_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinarySource {
    Configured,
    Environment,
    PathLookup,
    Installed,
    Downloaded,
}

#[derive(Debug, Clone)]
pub struct ResolvedBinary {
    pub path: PathBuf,
    pub source: BinarySource,
}

#[derive(Clone)]
pub struct BinaryManager {
    config: ServiceConfig,
}

impl BinaryManager {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// Walk the resolution chain. `Ok(None)` means no binary and downloads
    /// exhausted or disabled; search falls back to regex, replace and scan
    /// refuse.
    pub async fn resolve(&self) -> Result<Option<ResolvedBinary>, ServiceError> {
        if let Some(path) = &self.config.binary_path {
            self.probe(path).await.map_err(|e| {
                ServiceError::Binary(format!(
                    "configured binary path {} is not usable: {e}",
                    path.display()
                ))
            })?;
            return Ok(Some(ResolvedBinary {
                path: path.clone(),
                source: BinarySource::Configured,
            }));
        }

        if let Ok(value) = std::env::var(AST_GREP_ENV_VAR) {
            if !value.trim().is_empty() {
                let path = PathBuf::from(value);
                self.probe(&path).await.map_err(|e| {
                    ServiceError::Binary(format!(
                        "{AST_GREP_ENV_VAR} points at {} which is not usable: {e}",
                        path.display()
                    ))
                })?;
                return Ok(Some(ResolvedBinary {
                    path,
                    source: BinarySource::Environment,
                }));
            }
        }

        for name in ["ast-grep", "sg"] {
            if let Ok(path) = which::which(name) {
                tracing::debug!("found {name} on PATH at {}", path.display());
                return Ok(Some(ResolvedBinary {
                    path,
                    source: BinarySource::PathLookup,
                }));
            }
        }

        let installed = self.install_path();
        if installed.is_file() {
            return Ok(Some(ResolvedBinary {
                path: installed,
                source: BinarySource::Installed,
            }));
        }

        if self.config.download_enabled {
            let path = self.download_with_retry().await?;
            return Ok(Some(ResolvedBinary {
                path,
                source: BinarySource::Downloaded,
            }));
        }

        Ok(None)
    }

    /// Where a downloaded binary lands.
    pub fn install_path(&self) -> PathBuf {
        self.config.install_directory.join(binary_file_name())
    }

    /// Verify a candidate actually is ast-grep by running `--version`.
    async fn probe(&self, path: &Path) -> Result<String, ServiceError> {
        let output = tokio::process::Command::new(path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| ServiceError::Binary(e.to_string()))?;

        if !output.status.success() {
            return Err(ServiceError::Binary(format!(
                "--version probe exited with status {:?}",
                output.status.code()
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !version.contains("ast-grep") {
            return Err(ServiceError::Binary(format!(
                "--version probe did not identify ast-grep (got: {version})"
            )));
        }
        Ok(version)
    }

    /// Fixed retry loop around the release download: 3 attempts, 500ms base
    /// delay, doubling. This is the only retry machinery in the server.
    async fn download_with_retry(&self) -> Result<PathBuf, ServiceError> {
        let url = release_url(target_triple()?);
        let mut delay = DOWNLOAD_BASE_DELAY;
        let mut last_error = None;

        for attempt in 1..=DOWNLOAD_ATTEMPTS {
            tracing::info!("downloading ast-grep {AST_GREP_VERSION} (attempt {attempt}): {url}");
            match self.try_download(&url).await {
                Ok(path) => {
                    tracing::info!("installed ast-grep at {}", path.display());
                    return Ok(path);
                }
                Err(e) => {
                    tracing::warn!("download attempt {attempt} failed: {e}");
                    last_error = Some(e);
                    if attempt < DOWNLOAD_ATTEMPTS {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ServiceError::Binary("ast-grep download failed with no recorded error".to_string())
        }))
    }

    async fn try_download(&self, url: &str) -> Result<PathBuf, ServiceError> {
        let response = reqwest::get(url)
            .await
            .map_err(|e| ServiceError::Binary(format!("download request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ServiceError::Binary(format!(
                "download failed with HTTP {} for {url}",
                response.status()
            )));
        }

        let archive = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Binary(format!("download body failed: {e}")))?
            .to_vec();

        let binary_bytes = tokio::task::spawn_blocking(move || extract_binary(&archive))
            .await
            .map_err(|e| ServiceError::Binary(format!("extraction task failed: {e}")))??;

        std::fs::create_dir_all(&self.config.install_directory)?;
        let target = self.install_path();

        // Stage next to the target so the final rename stays on one filesystem.
        let mut staged = tempfile::NamedTempFile::new_in(&self.config.install_directory)?;
        std::io::Write::write_all(&mut staged, &binary_bytes)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(staged.path(), std::fs::Permissions::from_mode(0o755))?;
        }
        staged
            .persist(&target)
            .map_err(|e| ServiceError::Binary(format!("failed to install binary: {e}")))?;

        self.probe(&target).await.map_err(|e| {
            ServiceError::Binary(format!("downloaded binary failed verification: {e}"))
        })?;
        Ok(target)
    }
}

fn binary_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "ast-grep.exe"
    } else {
        "ast-grep"
    }
}

/// Map host platform to the official release target triple.
fn target_triple() -> Result<&'static str, ServiceError> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("linux", "x86_64") => Ok("x86_64-unknown-linux-gnu"),
        ("linux", "aarch64") => Ok("aarch64-unknown-linux-gnu"),
        ("macos", "x86_64") => Ok("x86_64-apple-darwin"),
        ("macos", "aarch64") => Ok("aarch64-apple-darwin"),
        ("windows", "x86_64") => Ok("x86_64-pc-windows-msvc"),
        (os, arch) => Err(ServiceError::Binary(format!(
            "no prebuilt ast-grep binary for {os}/{arch}; install ast-grep and set {AST_GREP_ENV_VAR}"
        ))),
    }
}

fn release_url(triple: &str) -> String {
    format!(
        "https://github.com/ast-grep/ast-grep/releases/download/{AST_GREP_VERSION}/app-{triple}.zip"
    )
}

/// Pull the ast-grep executable out of the release zip.
fn extract_binary(archive: &[u8]) -> Result<Vec<u8>, ServiceError> {
    let cursor = std::io::Cursor::new(archive);
    let mut zip = zip::ZipArchive::new(cursor)
        .map_err(|e| ServiceError::Binary(format!("release archive is not a valid zip: {e}")))?;

    let mut entry = zip
        .by_name(binary_file_name())
        .map_err(|e| ServiceError::Binary(format!("release archive missing executable: {e}")))?;

    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| ServiceError::Binary(format!("failed to read executable from archive: {e}")))?;
    Ok(bytes)
}

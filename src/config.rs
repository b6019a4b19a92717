use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root directories requests may touch (defaults to current working directory)
    pub root_directories: Vec<PathBuf>,
    /// Explicit ast-grep binary path (takes precedence over all discovery)
    pub binary_path: Option<PathBuf>,
    /// Directory where a downloaded ast-grep binary is installed
    pub install_directory: PathBuf,
    /// Whether the manager may download the binary when discovery fails
    pub download_enabled: bool,
    /// Per-call subprocess timeout in seconds
    pub timeout_secs: u64,
    /// Cap on captured stdout per subprocess invocation
    pub max_output_bytes: usize,
    /// Maximum file size the regex fallback will read (in bytes)
    pub max_file_size: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            root_directories: vec![std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))],
            binary_path: None,
            install_directory: default_install_directory(),
            download_enabled: true,
            timeout_secs: 30,
            max_output_bytes: 16 * 1024 * 1024, // 16MiB
            max_file_size: 50 * 1024 * 1024,    // 50MB
        }
    }
}

impl ServiceConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Default to ~/.ast-grep-mcp/bin
pub fn default_install_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ast-grep-mcp")
        .join("bin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert!(config.binary_path.is_none());
        assert!(config.download_enabled);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_output_bytes, 16 * 1024 * 1024);
        assert_eq!(config.command_timeout(), Duration::from_secs(30));
        assert!(config.install_directory.ends_with("bin"));
    }
}

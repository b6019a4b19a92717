//! Tests for ReplaceService against a scripted stand-in binary.

mod common;

use ast_grep_cli_mcp::binary::BinaryManager;
use ast_grep_cli_mcp::config::ServiceConfig;
use ast_grep_cli_mcp::errors::ServiceError;
use ast_grep_cli_mcp::replace::ReplaceService;
use ast_grep_cli_mcp::types::ReplaceParam;
use ast_grep_cli_mcp::workspace::WorkspaceManager;
use std::path::PathBuf;
use tempfile::TempDir;

fn service_for(config: ServiceConfig) -> ReplaceService {
    let workspace = WorkspaceManager::new(&config);
    let binary = BinaryManager::new(config.clone());
    ReplaceService::new(config, workspace, binary)
}

#[cfg(unix)]
#[tokio::test]
async fn test_dry_run_builds_diff_without_hashes() {
    let workspace = TempDir::new().unwrap();
    let bin_dir = TempDir::new().unwrap();
    let target = workspace.path().join("app.js");
    std::fs::write(&target, "var x = 1;\nvar y = 2;\n").unwrap();

    let stub = common::write_stub_ast_grep(
        bin_dir.path(),
        &[
            common::replacement_line(&target, "var x = 1;", "let x = 1;", 0),
            common::replacement_line(&target, "var y = 2;", "let y = 2;", 1),
        ],
    );
    let service = service_for(common::stub_config(workspace.path(), stub));

    let result = service
        .ast_replace(ReplaceParam {
            pattern: "var $NAME = $VALUE;".to_string(),
            replacement: "let $NAME = $VALUE;".to_string(),
            dry_run: true,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(result.dry_run);
    assert!(!result.applied);
    assert_eq!(result.total_changes, 2);
    assert_eq!(result.files_with_changes, 1);
    let file_result = &result.file_results[0];
    assert!(file_result.file_hash.is_none());
    assert_eq!(file_result.changes[0].new_text, "let x = 1;");
    // Dry run leaves the file alone; the stub never writes either way, but
    // the content check documents the contract.
    let content = std::fs::read_to_string(&target).unwrap();
    assert!(content.contains("var x = 1;"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_apply_mode_reports_file_hashes() {
    let workspace = TempDir::new().unwrap();
    let bin_dir = TempDir::new().unwrap();
    let target = workspace.path().join("app.js");
    std::fs::write(&target, "let x = 1;\n").unwrap();

    let stub = common::write_stub_ast_grep(
        bin_dir.path(),
        &[common::replacement_line(
            &target,
            "var x = 1;",
            "let x = 1;",
            0,
        )],
    );
    let service = service_for(common::stub_config(workspace.path(), stub));

    let result = service
        .ast_replace(ReplaceParam {
            pattern: "var $NAME = $VALUE;".to_string(),
            replacement: "let $NAME = $VALUE;".to_string(),
            dry_run: false,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(result.applied);
    let file_result = &result.file_results[0];
    let hash = file_result.file_hash.as_deref().unwrap();
    assert!(hash.starts_with("sha256:"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_replace_groups_changes_per_file() {
    let workspace = TempDir::new().unwrap();
    let bin_dir = TempDir::new().unwrap();
    let first = workspace.path().join("a.js");
    let second = workspace.path().join("b.js");
    std::fs::write(&first, "var a = 1;\n").unwrap();
    std::fs::write(&second, "var b = 2;\n").unwrap();

    let stub = common::write_stub_ast_grep(
        bin_dir.path(),
        &[
            common::replacement_line(&second, "var b = 2;", "let b = 2;", 0),
            common::replacement_line(&first, "var a = 1;", "let a = 1;", 0),
        ],
    );
    let service = service_for(common::stub_config(workspace.path(), stub));

    let result = service
        .ast_replace(ReplaceParam {
            pattern: "var $NAME = $VALUE;".to_string(),
            replacement: "let $NAME = $VALUE;".to_string(),
            dry_run: true,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(result.files_with_changes, 2);
    // BTreeMap ordering: a.js before b.js regardless of stream order.
    assert!(result.file_results[0].file_path.ends_with("a.js"));
    assert!(result.file_results[1].file_path.ends_with("b.js"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_replace_requires_a_usable_binary() {
    let workspace = TempDir::new().unwrap();

    let config = ServiceConfig {
        root_directories: vec![workspace.path().to_path_buf()],
        binary_path: Some(PathBuf::from("/definitely/not/ast-grep")),
        download_enabled: false,
        ..Default::default()
    };
    let service = service_for(config);

    let err = service
        .ast_replace(ReplaceParam {
            pattern: "var $NAME = $VALUE;".to_string(),
            replacement: "let $NAME = $VALUE;".to_string(),
            dry_run: true,
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Binary(_)));
}

use crate::binary::BinaryManager;
use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use crate::replace::ReplaceService;
use crate::scan::ScanService;
use crate::search::SearchService;
use crate::tool_router::ToolRouter;
use crate::types::*;
use crate::workspace::WorkspaceManager;

use std::sync::Arc;

use rmcp::{
    ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, ErrorData, Implementation, InitializeResult,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, Tool,
    },
    service::{RequestContext, RoleServer},
};

/// Languages the wrapped CLI ships grammars for. Advisory only; the binary
/// remains the authority and rejects anything it does not know.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "bash", "c", "cpp", "csharp", "css", "elixir", "go", "haskell", "html", "java", "javascript",
    "json", "jsx", "kotlin", "lua", "nix", "php", "python", "ruby", "rust", "scala", "solidity",
    "swift", "tsx", "typescript", "yaml",
];

#[derive(Clone)]
pub struct AstGrepService {
    search_service: SearchService,
    replace_service: ReplaceService,
    scan_service: ScanService,
}

impl Default for AstGrepService {
    fn default() -> Self {
        Self::new()
    }
}

impl AstGrepService {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let workspace = WorkspaceManager::new(&config);
        let binary = BinaryManager::new(config.clone());
        let search_service =
            SearchService::new(config.clone(), workspace.clone(), binary.clone());
        let replace_service =
            ReplaceService::new(config.clone(), workspace.clone(), binary.clone());
        let scan_service = ScanService::new(config, workspace, binary);

        Self {
            search_service,
            replace_service,
            scan_service,
        }
    }

    pub async fn ast_search(&self, param: SearchParam) -> Result<SearchResult, ServiceError> {
        self.search_service.ast_search(param).await
    }

    pub async fn ast_replace(&self, param: ReplaceParam) -> Result<ReplaceResult, ServiceError> {
        self.replace_service.ast_replace(param).await
    }

    pub async fn ast_run_rule(&self, param: RunRuleParam) -> Result<RunRuleResult, ServiceError> {
        self.scan_service.ast_run_rule(param).await
    }

    pub fn list_languages(&self, _param: ListLanguagesParam) -> ListLanguagesResult {
        ListLanguagesResult {
            languages: SUPPORTED_LANGUAGES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ServerHandler for AstGrepService {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: "ast-grep-cli-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            capabilities: ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability {
                    list_changed: Some(true),
                }),
                ..Default::default()
            },
            instructions: Some("This MCP server runs the ast-grep CLI for structural code search (ast_search), rewrites (ast_replace), and one-off lint rules (ast_run_rule). Patterns use $VAR for one node and $$$NAME for a list of nodes. ast_replace requires an explicit dry_run.".into()),
        }
    }

    #[tracing::instrument(skip(self, _request, _context))]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: vec![
                Tool {
                    name: "ast_search".into(),
                    description: Some("Search code structurally with an ast-grep pattern. Runs `ast-grep run --pattern <pattern> --json=stream` over the workspace.".into()),
                    input_schema: Arc::new(serde_json::from_value(serde_json::json!({
                        "type": "object",
                        "properties": {
                            "pattern": { "type": "string", "description": "ast-grep pattern, e.g. console.log($VAR)" },
                            "paths": { "type": "array", "items": { "type": "string" }, "description": "Files or directories to search, relative to the workspace roots (default: whole workspace)" },
                            "language": { "type": "string", "description": "Language to parse files as (default: inferred from file extensions)" },
                            "globs": { "type": "array", "items": { "type": "string" }, "description": "Glob filters, e.g. src/**/*.ts or !dist" },
                            "selector": { "type": "string", "description": "AST node kind to match inside the pattern context" },
                            "strictness": { "type": "string", "enum": ["cst", "smart", "ast", "relaxed", "signature"] },
                            "context": { "type": "integer", "minimum": 0, "maximum": 100, "description": "Context lines around each match" },
                            "max_results": { "type": "integer", "minimum": 1, "maximum": 10000, "default": 100 },
                            "follow_symlinks": { "type": "boolean", "default": false },
                            "include_hidden": { "type": "boolean", "default": false }
                        },
                        "required": ["pattern"]
                    })).unwrap()),
                    annotations: None,
                },
                Tool {
                    name: "ast_replace".into(),
                    description: Some("Rewrite code structurally. Runs `ast-grep run --pattern <pattern> --rewrite <replacement> --json=stream`; dry_run=true previews, dry_run=false applies with --update-all. dry_run must be passed explicitly.".into()),
                    input_schema: Arc::new(serde_json::from_value(serde_json::json!({
                        "type": "object",
                        "properties": {
                            "pattern": { "type": "string", "description": "ast-grep pattern to match" },
                            "replacement": { "type": "string", "description": "Rewrite template; may reference captured metavariables" },
                            "paths": { "type": "array", "items": { "type": "string" } },
                            "language": { "type": "string" },
                            "globs": { "type": "array", "items": { "type": "string" } },
                            "dry_run": { "type": "boolean", "description": "true previews the diff, false applies changes to files. Required." },
                            "max_results": { "type": "integer", "minimum": 1, "maximum": 10000, "default": 1000 }
                        },
                        "required": ["pattern", "replacement", "dry_run"]
                    })).unwrap()),
                    annotations: None,
                },
                Tool {
                    name: "ast_run_rule".into(),
                    description: Some("Run a one-off ast-grep lint rule. Composes an inline YAML rule from id/language/pattern and runs `ast-grep scan --inline-rules --json=stream`.".into()),
                    input_schema: Arc::new(serde_json::from_value(serde_json::json!({
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "Rule id, e.g. no-eval" },
                            "language": { "type": "string", "description": "Language the rule applies to" },
                            "pattern": { "type": "string", "description": "ast-grep pattern the rule matches" },
                            "message": { "type": "string", "description": "Message reported with each finding" },
                            "severity": { "type": "string", "enum": ["error", "warning", "info", "hint", "off"] },
                            "fix": { "type": "string", "description": "Rewrite template reported as the suggested fix" },
                            "note": { "type": "string" },
                            "paths": { "type": "array", "items": { "type": "string" } },
                            "globs": { "type": "array", "items": { "type": "string" } },
                            "max_results": { "type": "integer", "minimum": 1, "maximum": 10000, "default": 500 }
                        },
                        "required": ["id", "language", "pattern"]
                    })).unwrap()),
                    annotations: None,
                },
                Tool {
                    name: "list_languages".into(),
                    description: Some("List the languages the wrapped ast-grep CLI supports.".into()),
                    input_schema: Arc::new(serde_json::from_value(serde_json::json!({ "type": "object", "properties": {} })).unwrap()),
                    annotations: None,
                },
            ],
            ..Default::default()
        })
    }

    #[tracing::instrument(skip(self, request, _context), fields(tool_name = %request.name))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        ToolRouter::route_tool_call(self, request).await
    }
}

//! # Tool Router Module
//!
//! Routes MCP tool calls to the service methods. Parameter-shape failures
//! and unknown tool names become protocol errors; everything that goes wrong
//! after that is reported as structured tool content with the error taxonomy.

use crate::ast_grep_service::AstGrepService;
use crate::response_formatter::ResponseFormatter;
use crate::types::*;

use rmcp::model::{CallToolRequestParam, CallToolResult, ErrorData};
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// Routes tool calls to appropriate service methods
pub struct ToolRouter;

impl ToolRouter {
    /// Helper function to parse request parameters
    pub fn parse_params<T: DeserializeOwned>(
        request: &CallToolRequestParam,
    ) -> Result<T, ErrorData> {
        serde_json::from_value(serde_json::Value::Object(
            request.arguments.clone().unwrap_or_default(),
        ))
        .map_err(|e| ErrorData::invalid_params(Cow::Owned(e.to_string()), None))
    }

    /// Helper function to create formatted response
    fn create_formatted_response<T: serde::Serialize>(
        result: &T,
        summary: String,
    ) -> Result<CallToolResult, ErrorData> {
        ResponseFormatter::create_formatted_response(result, summary)
            .map_err(|e| ErrorData::internal_error(Cow::Owned(e.to_string()), None))
    }

    /// Route a tool call to the appropriate service method
    pub async fn route_tool_call(
        service: &AstGrepService,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ErrorData> {
        match request.name.as_ref() {
            "ast_search" => Self::handle_ast_search(service, request).await,
            "ast_replace" => Self::handle_ast_replace(service, request).await,
            "ast_run_rule" => Self::handle_ast_run_rule(service, request).await,
            "list_languages" => Self::handle_list_languages(service, request).await,
            _ => Err(ErrorData::method_not_found::<
                rmcp::model::CallToolRequestMethod,
            >()),
        }
    }

    async fn handle_ast_search(
        service: &AstGrepService,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ErrorData> {
        let param: SearchParam = Self::parse_params(&request)?;

        match service.ast_search(param).await {
            Ok(result) => {
                let summary = ResponseFormatter::format_search_result(&result);
                Self::create_formatted_response(&result, summary)
            }
            Err(err) => Ok(ResponseFormatter::error_result(&err)),
        }
    }

    async fn handle_ast_replace(
        service: &AstGrepService,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ErrorData> {
        // Guard against accidental writes: an LLM that omits dry_run almost
        // never meant to modify files, so require the intent to be explicit.
        let has_dry_run = request
            .arguments
            .as_ref()
            .is_some_and(|args| args.contains_key("dry_run"));
        if !has_dry_run {
            return Err(ErrorData::invalid_params(
                Cow::Borrowed(
                    "ast_replace requires an explicit 'dry_run'. Pass dry_run=true to preview changes or dry_run=false to apply them to files.",
                ),
                None,
            ));
        }

        let param: ReplaceParam = Self::parse_params(&request)?;

        match service.ast_replace(param).await {
            Ok(result) => {
                let summary = ResponseFormatter::format_replace_result(&result);
                Self::create_formatted_response(&result, summary)
            }
            Err(err) => Ok(ResponseFormatter::error_result(&err)),
        }
    }

    async fn handle_ast_run_rule(
        service: &AstGrepService,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ErrorData> {
        let param: RunRuleParam = Self::parse_params(&request)?;

        match service.ast_run_rule(param).await {
            Ok(result) => {
                let summary = ResponseFormatter::format_run_rule_result(&result);
                Self::create_formatted_response(&result, summary)
            }
            Err(err) => Ok(ResponseFormatter::error_result(&err)),
        }
    }

    async fn handle_list_languages(
        service: &AstGrepService,
        _request: CallToolRequestParam,
    ) -> Result<CallToolResult, ErrorData> {
        let result = service.list_languages(ListLanguagesParam {});
        let json_value = serde_json::to_value(&result)
            .map_err(|e| ErrorData::internal_error(Cow::Owned(e.to_string()), None))?;
        Ok(CallToolResult::success(vec![
            rmcp::model::Content::json(json_value)?,
        ]))
    }
}

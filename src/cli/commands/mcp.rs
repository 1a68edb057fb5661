//! refshelf mcp - MCP (Model Context Protocol) server mode
//!
//! Exposes library search as MCP tools over stdio so tool-calling agents can
//! query references, read document pages and find related work. Every tool
//! returns pretty-printed JSON text.

use std::io::{self, BufRead, Write};

use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::app::AppContext;
use crate::cli::commands::show::missing_ids;
use crate::cli::output::{OutputMode, emit_json};
use crate::error::{Result, ShelfError};
use crate::model::{SearchFilters, parse_rec_numbers};

/// MCP server protocol version
const PROTOCOL_VERSION: &str = "2024-11-05";
/// Server name for identification
const SERVER_NAME: &str = "refshelf";
/// Server version (from cargo)
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Args, Debug)]
pub struct McpArgs {
    #[command(subcommand)]
    pub command: McpCommand,
}

#[derive(Subcommand, Debug)]
pub enum McpCommand {
    /// Start MCP server with stdio transport
    Serve(ServeArgs),
    /// List available MCP tools
    Tools,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Echo traffic to stderr
    #[arg(long)]
    pub debug: bool,
}

// ============================================================================
// JSON-RPC 2.0 Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data,
            }),
        }
    }

    /// Success carrying any serializable result.
    fn from_result<T: Serialize>(id: Option<Value>, result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self::success(id, value),
            Err(err) => Self::error(
                id,
                INTERNAL_ERROR,
                format!("Failed to serialize result: {err}"),
                None,
            ),
        }
    }
}

// JSON-RPC 2.0 error codes
const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

// ============================================================================
// MCP Protocol Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ServerCapabilities {
    tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
struct ToolsCapability {
    #[serde(rename = "listChanged")]
    list_changed: bool,
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: String,
    capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ToolsListResult {
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct ToolResult {
    content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    is_error: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ToolContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

impl ToolResult {
    fn text(text: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text,
            }],
            is_error: None,
        }
    }

    fn json(value: &Value) -> Result<Self> {
        Ok(Self::text(serde_json::to_string_pretty(value)?))
    }

    fn error(message: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: message,
            }],
            is_error: Some(true),
        }
    }
}

// ============================================================================
// Tool Definitions
// ============================================================================

fn filter_properties() -> serde_json::Map<String, Value> {
    let props = json!({
        "year_from": {
            "type": "integer",
            "description": "Earliest publication year (inclusive)"
        },
        "year_to": {
            "type": "integer",
            "description": "Latest publication year (inclusive)"
        },
        "author": {
            "type": "string",
            "description": "Author name substring, case-insensitive"
        },
        "ref_type": {
            "type": "string",
            "description": "Reference type substring, e.g. \"Journal Article\" or \"Book\""
        }
    });
    match props {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

fn limit_property(default: usize) -> Value {
    json!({
        "type": "integer",
        "description": format!("Maximum number of results (default: {default})"),
        "default": default
    })
}

fn query_schema(query_key: &str, query_doc: &str, default_limit: usize, with_filters: bool) -> Value {
    let mut props = serde_json::Map::new();
    props.insert(
        query_key.to_string(),
        json!({"type": "string", "description": query_doc}),
    );
    if with_filters {
        props.extend(filter_properties());
    }
    props.insert("limit".to_string(), limit_property(default_limit));
    json!({
        "type": "object",
        "properties": props,
        "required": [query_key]
    })
}

fn define_tools(ctx: &AppContext) -> Vec<Tool> {
    let search = &ctx.config.search;
    vec![
        Tool {
            name: "search_references".to_string(),
            description: "Search reference metadata (title, authors, abstract, keywords, journal) \
                          with weighted BM25 ranking and optional year/author/type filters"
                .to_string(),
            input_schema: query_schema("query", "Search terms", search.default_limit, true),
        },
        Tool {
            name: "search_fulltext".to_string(),
            description: "Search the extracted page text of attached documents; returns \
                          references with highlighted page snippets"
                .to_string(),
            input_schema: {
                let mut schema =
                    query_schema("query", "Search terms", search.default_limit, false);
                schema["properties"]["max_snippets"] = json!({
                    "type": "integer",
                    "description": "Snippets per reference",
                    "default": search.max_snippets_per_reference
                });
                schema
            },
        },
        Tool {
            name: "search_library".to_string(),
            description: "Search metadata and page text together; references matching both \
                          rank first, then metadata-only, then text-only"
                .to_string(),
            input_schema: query_schema("query", "Search terms", search.library_limit, true),
        },
        Tool {
            name: "get_reference_details".to_string(),
            description: "Full bibliographic record for one reference".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "rec_number": {
                        "type": "integer",
                        "description": "Record number of the reference"
                    }
                },
                "required": ["rec_number"]
            }),
        },
        Tool {
            name: "get_references".to_string(),
            description: "Full records for several references in the given order; unknown \
                          record numbers are listed under \"missing\""
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "rec_numbers": {
                        "type": "string",
                        "description": "Comma-separated record numbers, e.g. \"12,45,78\""
                    }
                },
                "required": ["rec_numbers"]
            }),
        },
        Tool {
            name: "list_references_by_topic".to_string(),
            description: "List references about a topic, ranked by metadata relevance"
                .to_string(),
            input_schema: query_schema("topic", "Topic to browse", search.default_limit, true),
        },
        Tool {
            name: "find_related".to_string(),
            description: "References similar to a given one, by embeddings when available, \
                          otherwise by shared keywords and title words"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "rec_number": {
                        "type": "integer",
                        "description": "Record number of the seed reference"
                    },
                    "limit": limit_property(search.related_limit)
                },
                "required": ["rec_number"]
            }),
        },
        Tool {
            name: "search_semantic".to_string(),
            description: "Search by meaning using reference embeddings; empty when embeddings \
                          are not available"
                .to_string(),
            input_schema: query_schema(
                "query",
                "Natural-language description",
                search.related_limit,
                false,
            ),
        },
        Tool {
            name: "read_document_pages".to_string(),
            description: "Stored page text of a reference's document for an inclusive page range"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "rec_number": {
                        "type": "integer",
                        "description": "Record number of the reference"
                    },
                    "start_page": {
                        "type": "integer",
                        "description": "First page, 1-based",
                        "default": 1
                    },
                    "end_page": {
                        "type": "integer",
                        "description": format!(
                            "Last page, inclusive (at most {} pages per call)",
                            ctx.config.library.max_pages_per_read
                        )
                    }
                },
                "required": ["rec_number"]
            }),
        },
        Tool {
            name: "library_stats".to_string(),
            description: "Counts of references, pages and embeddings in the library".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        },
        Tool {
            name: "rebuild_index".to_string(),
            description: "Regenerate the metadata and page-text search indexes from stored records"
                .to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        },
    ]
}

// ============================================================================
// MCP Server Implementation
// ============================================================================

pub fn run(ctx: &AppContext, args: &McpArgs) -> Result<()> {
    match &args.command {
        McpCommand::Serve(serve_args) => run_serve(ctx, serve_args),
        McpCommand::Tools => run_tools(ctx),
    }
}

fn run_tools(ctx: &AppContext) -> Result<()> {
    let tools = define_tools(ctx);
    if ctx.output_mode == OutputMode::Robot {
        emit_json(&json!({
            "tools": tools,
            "count": tools.len()
        }))
    } else {
        println!("Available MCP Tools:\n");
        for tool in &tools {
            println!("  {} - {}", tool.name, tool.description);
        }
        println!("\n{} tools available.", tools.len());
        Ok(())
    }
}

fn run_serve(ctx: &AppContext, args: &ServeArgs) -> Result<()> {
    if args.debug {
        eprintln!("[refshelf-mcp] Starting MCP server (stdio mode)");
        eprintln!("[refshelf-mcp] Server: {SERVER_NAME} v{SERVER_VERSION}");
        eprintln!("[refshelf-mcp] Protocol: {PROTOCOL_VERSION}");
    }
    let stdin = io::stdin();
    serve(ctx, stdin.lock(), io::stdout(), args.debug)
}

/// Line-delimited JSON-RPC loop; returns when input ends. Write and flush
/// failures on `output` are returned as errors.
fn serve<R: BufRead, W: Write>(ctx: &AppContext, input: R, mut output: W, debug: bool) -> Result<()> {
    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "stdin read error");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        if debug {
            eprintln!("[refshelf-mcp] <- {line}");
        }

        // None for notifications: no response is written.
        if let Some(response) = handle_request(ctx, &line) {
            let response_json = serialize_response(&response);
            if debug {
                eprintln!("[refshelf-mcp] -> {response_json}");
            }
            writeln!(output, "{response_json}")?;
            output.flush()?;
        }
    }

    debug!("MCP server shutting down");
    Ok(())
}

fn serialize_response(response: &JsonRpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        warn!(error = %e, "failed to serialize JSON-RPC response");
        format!(
            r#"{{"jsonrpc":"2.0","error":{{"code":{INTERNAL_ERROR},"message":"Serialization failed"}}}}"#
        )
    })
}

fn handle_request(ctx: &AppContext, line: &str) -> Option<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            return Some(JsonRpcResponse::error(
                None,
                PARSE_ERROR,
                format!("Parse error: {e}"),
                None,
            ));
        }
    };

    if request.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::error(
            request.id,
            INVALID_REQUEST,
            "Invalid JSON-RPC version".to_string(),
            None,
        ));
    }

    match request.method.as_str() {
        "initialize" => Some(handle_initialize(request.id)),
        "initialized" | "notifications/initialized" => handle_initialized(request.id),
        "tools/list" => Some(JsonRpcResponse::from_result(
            request.id,
            &ToolsListResult {
                tools: define_tools(ctx),
            },
        )),
        "tools/call" => Some(handle_tools_call(ctx, request.id, &request.params)),
        "ping" | "shutdown" => Some(JsonRpcResponse::success(request.id, json!({}))),
        "resources/list" => Some(JsonRpcResponse::success(
            request.id,
            json!({"resources": []}),
        )),
        "resources/templates/list" => Some(JsonRpcResponse::success(
            request.id,
            json!({"resourceTemplates": []}),
        )),
        _ => {
            // Notifications (no id) never get a response.
            request.id.as_ref()?;
            Some(JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
                None,
            ))
        }
    }
}

fn handle_initialize(id: Option<Value>) -> JsonRpcResponse {
    let result = InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: ToolsCapability {
                list_changed: false,
            },
        },
        server_info: ServerInfo {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
        },
    };
    JsonRpcResponse::from_result(id, &result)
}

fn handle_initialized(id: Option<Value>) -> Option<JsonRpcResponse> {
    id.map(|id| JsonRpcResponse::success(Some(id), json!({})))
}

fn handle_tools_call(ctx: &AppContext, id: Option<Value>, params: &Value) -> JsonRpcResponse {
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return JsonRpcResponse::error(
            id,
            INVALID_PARAMS,
            "Missing required parameter: name".to_string(),
            None,
        );
    };

    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    debug!(tool = name, "tool call");

    let result = match name {
        "search_references" => handle_tool_search_references(ctx, &arguments),
        "search_fulltext" => handle_tool_search_fulltext(ctx, &arguments),
        "search_library" => handle_tool_search_library(ctx, &arguments),
        "get_reference_details" => handle_tool_reference_details(ctx, &arguments),
        "get_references" => handle_tool_get_references(ctx, &arguments),
        "list_references_by_topic" => handle_tool_list_by_topic(ctx, &arguments),
        "find_related" => handle_tool_find_related(ctx, &arguments),
        "search_semantic" => handle_tool_search_semantic(ctx, &arguments),
        "read_document_pages" => handle_tool_read_pages(ctx, &arguments),
        "library_stats" => handle_tool_stats(ctx),
        "rebuild_index" => handle_tool_rebuild_index(ctx),
        _ => Err(ShelfError::ValidationFailed(format!("Unknown tool: {name}"))),
    };

    let tool_result = result.unwrap_or_else(|e| {
        warn!(tool = name, code = e.code(), error = %e, "tool call failed");
        ToolResult::error(e.to_string())
    });
    JsonRpcResponse::from_result(id, &tool_result)
}

// ============================================================================
// Argument helpers
// ============================================================================

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ShelfError::ValidationFailed(format!("Missing required parameter: {key}")))
}

fn required_i64(args: &Value, key: &str) -> Result<i64> {
    match args.get(key) {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
            ShelfError::ValidationFailed(format!("Parameter {key} must be an integer"))
        }),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| {
            ShelfError::ValidationFailed(format!("Parameter {key} must be an integer"))
        }),
        _ => Err(ShelfError::ValidationFailed(format!(
            "Missing required parameter: {key}"
        ))),
    }
}

fn optional_u64(args: &Value, key: &str) -> Result<Option<u64>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            ShelfError::ValidationFailed(format!("Parameter {key} must be a non-negative integer"))
        }),
    }
}

fn limit_arg(args: &Value, default: usize) -> Result<usize> {
    Ok(optional_u64(args, "limit")?
        .map_or(default, |v| usize::try_from(v).unwrap_or(usize::MAX)))
}

fn filters_arg(args: &Value) -> Result<SearchFilters> {
    let year = |key: &str| -> Result<Option<i32>> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| {
                    ShelfError::ValidationFailed(format!("Parameter {key} must be a year"))
                }),
        }
    };
    let text = |key: &str| {
        args.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    };
    Ok(SearchFilters {
        year_from: year("year_from")?,
        year_to: year("year_to")?,
        author: text("author"),
        ref_type: text("ref_type"),
    })
}

// ============================================================================
// Tool Handlers
// ============================================================================

fn handle_tool_search_references(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let query = required_str(args, "query")?;
    let filters = filters_arg(args)?;
    let limit = limit_arg(args, ctx.config.search.default_limit)?;

    let results = ctx.library().search_metadata(query, &filters, limit)?;
    ToolResult::json(&json!({
        "query": query,
        "count": results.len(),
        "results": results,
    }))
}

fn handle_tool_search_fulltext(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let query = required_str(args, "query")?;
    let limit = limit_arg(args, ctx.config.search.default_limit)?;
    let max_snippets = optional_u64(args, "max_snippets")?.map_or(
        ctx.config.search.max_snippets_per_reference,
        |v| usize::try_from(v).unwrap_or(usize::MAX),
    );

    let results = ctx.library().search_fulltext(query, limit, max_snippets)?;
    ToolResult::json(&json!({
        "query": query,
        "count": results.len(),
        "results": results,
    }))
}

fn handle_tool_search_library(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let query = required_str(args, "query")?;
    let filters = filters_arg(args)?;
    let limit = limit_arg(args, ctx.config.search.library_limit)?;

    let results = ctx.library().search_library(query, &filters, limit)?;
    ToolResult::json(&json!({
        "query": query,
        "count": results.len(),
        "results": results,
    }))
}

fn handle_tool_reference_details(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let rec_number = required_i64(args, "rec_number")?;
    let output = match ctx.library().get_reference(rec_number)? {
        Some(detail) => json!({"found": true, "reference": detail}),
        None => json!({"found": false, "rec_number": rec_number}),
    };
    ToolResult::json(&output)
}

fn handle_tool_get_references(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let requested = match args.get("rec_numbers") {
        Some(Value::String(list)) => parse_rec_numbers(list)?,
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_i64().ok_or_else(|| {
                    ShelfError::MalformedInput(format!("invalid record number {item}"))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        _ => {
            return Err(ShelfError::ValidationFailed(
                "Missing required parameter: rec_numbers".to_string(),
            ));
        }
    };

    let references = ctx.library().get_references(&requested)?;
    let missing = missing_ids(&requested, &references);
    ToolResult::json(&json!({
        "count": references.len(),
        "references": references,
        "missing": missing,
    }))
}

fn handle_tool_list_by_topic(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let topic = required_str(args, "topic")?;
    let filters = filters_arg(args)?;
    let limit = limit_arg(args, ctx.config.search.default_limit)?;

    let results = ctx.library().list_by_topic(topic, &filters, limit)?;
    ToolResult::json(&json!({
        "topic": topic,
        "count": results.len(),
        "results": results,
    }))
}

fn handle_tool_find_related(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let rec_number = required_i64(args, "rec_number")?;
    let limit = limit_arg(args, ctx.config.search.related_limit)?;
    let library = ctx.library();

    if library.get_reference(rec_number)?.is_none() {
        return ToolResult::json(&json!({"found": false, "rec_number": rec_number}));
    }
    let related = library.find_related(rec_number, limit)?;
    ToolResult::json(&json!({
        "found": true,
        "rec_number": rec_number,
        "via": related.via,
        "count": related.hits.len(),
        "results": related.hits,
    }))
}

fn handle_tool_search_semantic(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let query = required_str(args, "query")?;
    let limit = limit_arg(args, ctx.config.search.related_limit)?;
    let library = ctx.library();

    let available = library.embeddings_available() && ctx.db.has_embeddings()?;
    let results = library.search_semantic(query, limit)?;
    ToolResult::json(&json!({
        "query": query,
        "available": available,
        "count": results.len(),
        "results": results,
    }))
}

fn handle_tool_read_pages(ctx: &AppContext, args: &Value) -> Result<ToolResult> {
    let rec_number = required_i64(args, "rec_number")?;
    let start = optional_u64(args, "start_page")?.unwrap_or(1);
    let end = optional_u64(args, "end_page")?;
    let to_page = |v: u64| {
        u32::try_from(v)
            .map_err(|_| ShelfError::MalformedInput(format!("page number {v} is out of range")))
    };

    let library = ctx.library();
    if library.get_reference(rec_number)?.is_none() {
        return ToolResult::json(&json!({"found": false, "rec_number": rec_number}));
    }
    let read = library.read_pages(rec_number, to_page(start)?, end.map(to_page).transpose()?)?;
    ToolResult::json(&json!({
        "found": true,
        "rec_number": read.rec_number,
        "start_page": read.start,
        "end_page": read.end,
        "capped": read.capped,
        "pages": read.pages.iter().map(|p| json!({
            "page": p.page_number,
            "text": p.text,
        })).collect::<Vec<_>>(),
    }))
}

fn handle_tool_stats(ctx: &AppContext) -> Result<ToolResult> {
    let stats = ctx.library().stats()?;
    ToolResult::json(&json!({
        "total_references": stats.total_references,
        "total_pages": stats.total_pages,
        "references_with_pages": stats.references_with_pages,
        "references_with_embeddings": stats.references_with_embeddings,
        "embeddings_available": ctx.embedder.is_some(),
    }))
}

fn handle_tool_rebuild_index(ctx: &AppContext) -> Result<ToolResult> {
    ctx.db.rebuild_indexes()?;
    let stats = ctx.db.stats()?;
    info!(
        references = stats.total_references,
        pages = stats.total_pages,
        "search indexes rebuilt"
    );
    ToolResult::json(&json!({
        "rebuilt": true,
        "references": stats.total_references,
        "pages": stats.total_pages,
    }))
}

//! MCP Server Core
//!
//! Handles the main MCP server logic: JSON-RPC method dispatch to the
//! `initialize`/`tools/list`/`tools/call` trio and, from there, to one
//! `tools::<name>::execute` per §6 External Interface operation. The
//! server holds no memory-domain state of its own — every mutation and
//! query goes through the shared [`hippograph_core::Engine`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hippograph_core::Engine;

use crate::protocol::messages::{
    CallToolRequest, CallToolResult, InitializeRequest, InitializeResult, ListToolsResult,
    ServerCapabilities, ServerInfo, ToolDescription,
};
use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_VERSION};
use crate::tools;

/// MCP server implementation: one [`Engine`] shared behind tool calls.
pub struct McpServer {
    engine: Arc<Engine>,
    initialized: bool,
    /// Tool calls since startup; used to space out the maintenance nudge
    /// below the background timer's cadence (`main.rs`'s 300s loop) so a
    /// burst of ingests during an active session doesn't wait a full cycle.
    tool_call_count: AtomicU64,
}

impl McpServer {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine, initialized: false, tool_call_count: AtomicU64::new(0) }
    }

    /// Handle an incoming JSON-RPC request.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("Handling request: {}", request.method);

        if !self.initialized && request.method != "initialize" && request.method != "notifications/initialized" {
            warn!("Rejecting request '{}': server not initialized", request.method);
            return Some(JsonRpcResponse::error(request.id, JsonRpcError::server_not_initialized()));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "notifications/initialized" => return None,
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!("Unknown method: {}", method);
                Err(JsonRpcError::method_not_found())
            }
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    fn handle_initialize(&mut self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: InitializeRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => InitializeRequest { protocol_version: None, client_info: None, capabilities: serde_json::Value::Null },
        };

        let negotiated_version = match request.protocol_version {
            Some(v) if v.as_str() < MCP_VERSION => v,
            _ => MCP_VERSION.to_string(),
        };

        self.initialized = true;
        info!("MCP session initialized with protocol version {}", negotiated_version);

        let result = InitializeResult {
            protocol_version: negotiated_version,
            server_info: ServerInfo { name: "hippograph".to_string(), version: env!("CARGO_PKG_VERSION").to_string() },
            capabilities: ServerCapabilities {
                tools: Some({
                    let mut map = std::collections::HashMap::new();
                    map.insert("listChanged".to_string(), serde_json::json!(false));
                    map
                }),
            },
            instructions: Some(
                "HippoGraph is your associative memory store. Notes accumulate over time and form \
                 a graph through shared entities and semantic similarity; `search` retrieves them \
                 through a hybrid pipeline of vector search, spreading activation, keyword matching, \
                 and temporal scoring. Use `add` to remember things worth recalling later, `search` \
                 to recall them, and `set_importance` to mark a note as identity-defining so it \
                 resists temporal decay."
                    .to_string(),
            ),
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    fn handle_tools_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let tools = vec![
            ToolDescription {
                name: "add".to_string(),
                description: "Ingest a new note: embeds the content, checks for near-duplicates, persists the node, links extracted entities, and creates semantic and entity edges.".to_string(),
                input_schema: tools::add::schema(),
            },
            ToolDescription {
                name: "update".to_string(),
                description: "Update a note's content and/or category. Changing content snapshots the prior version (up to 5 kept) and, if configured, re-links entities.".to_string(),
                input_schema: tools::update::schema(),
            },
            ToolDescription {
                name: "delete".to_string(),
                description: "Delete a note and all of its incident edges, entity links, and versions.".to_string(),
                input_schema: tools::delete::schema(),
            },
            ToolDescription {
                name: "set_importance".to_string(),
                description: "Set a note's importance tier (low/normal/critical), which scales its retrieval score.".to_string(),
                input_schema: tools::set_importance::schema(),
            },
            ToolDescription {
                name: "find_similar".to_string(),
                description: "Find notes whose embeddings are near a piece of text, without ingesting it.".to_string(),
                input_schema: tools::find_similar::schema(),
            },
            ToolDescription {
                name: "get_history".to_string(),
                description: "List a note's content versions (up to 5, most recent first).".to_string(),
                input_schema: tools::get_history::schema(),
            },
            ToolDescription {
                name: "restore_version".to_string(),
                description: "Replace a note's content with one of its historical versions, keeping its id.".to_string(),
                input_schema: tools::restore_version::schema(),
            },
            ToolDescription {
                name: "search".to_string(),
                description: "Hybrid search over notes: ANN vector search, graph spreading activation, BM25 keyword matching, and temporal scoring, blended and decayed by recency and importance.".to_string(),
                input_schema: tools::search::schema(),
            },
            ToolDescription {
                name: "stats".to_string(),
                description: "Summary counts: nodes, edges, entities, categories, top PageRank nodes, community count.".to_string(),
                input_schema: tools::stats::stats_schema(),
            },
            ToolDescription {
                name: "get_graph".to_string(),
                description: "List a note's outgoing edges with their weights and types.".to_string(),
                input_schema: tools::get_graph::schema(),
            },
            ToolDescription {
                name: "run_sleep".to_string(),
                description: "Run a maintenance cycle (light: anchor boost, stale-edge decay, duplicate scan, PageRank; deep: additionally community detection and relation extraction). `dryRun` reports without mutating.".to_string(),
                input_schema: tools::run_sleep::schema(),
            },
            ToolDescription {
                name: "search_stats".to_string(),
                description: "Search latency percentiles (p50/p95/p99) over the most recent searches.".to_string(),
                input_schema: tools::stats::search_stats_schema(),
            },
        ];

        serde_json::to_value(ListToolsResult { tools }).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let request: CallToolRequest = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing tool call parameters")),
        };

        let cancel = CancellationToken::new();
        let result: Result<serde_json::Value, String> = match request.name.as_str() {
            "add" => tools::add::execute(&self.engine, &request.arguments).await,
            "update" => tools::update::execute(&self.engine, &request.arguments).await,
            "delete" => tools::delete::execute(&self.engine, &request.arguments).await,
            "set_importance" => tools::set_importance::execute(&self.engine, &request.arguments).await,
            "find_similar" => tools::find_similar::execute(&self.engine, &request.arguments).await,
            "get_history" => tools::get_history::execute(&self.engine, &request.arguments).await,
            "restore_version" => tools::restore_version::execute(&self.engine, &request.arguments).await,
            "search" => tools::search::execute(&self.engine, &request.arguments, &cancel).await,
            "stats" => tools::stats::execute_stats(&self.engine).await,
            "get_graph" => tools::get_graph::execute(&self.engine, &request.arguments).await,
            "run_sleep" => tools::run_sleep::execute(&self.engine, &request.arguments).await,
            "search_stats" => tools::stats::execute_search_stats(&self.engine, &request.arguments).await,
            other => {
                warn!("Unknown tool requested: {}", other);
                return Ok(serde_json::to_value(CallToolResult::error(format!("unknown tool '{other}'")))
                    .map_err(|e| JsonRpcError::internal_error(&e.to_string()))?);
            }
        };

        let call_result = match result {
            Ok(value) => CallToolResult::ok(&value),
            Err(message) => CallToolResult::error(message),
        };

        // §4.9: light-sleep triggers on a new-node counter, deep-sleep on a
        // wall-clock timer. `main.rs` already polls both every 300s; this
        // nudge only shortens the wait for light-sleep during a session
        // with many `add` calls in flight between polls.
        let count = self.tool_call_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 25 == 0 && self.engine.light_sleep_due() {
            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                match engine.run_sleep(hippograph_core::SleepMode::Light, false) {
                    Ok(report) => info!(steps = report.steps.len(), "inline light sleep completed"),
                    Err(e) => warn!("inline light sleep failed: {}", e),
                }
            });
        }

        serde_json::to_value(call_result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }
}

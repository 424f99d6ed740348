//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::CacheService;
use crate::tools::{
    CacheDeleteParams, CacheFetchParams, CacheInstallParams, activate_impl, delete_impl, fetch_impl, generations_impl,
    install_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    service: Arc<CacheService>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler.
    pub fn new(service: CacheService) -> Self {
        Self { service: Arc::new(service), tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Install a cache generation: precache the configured manifest into it and, unless skip_waiting is off, activate it and retire every other generation."
    )]
    async fn cache_install(&self, params: Parameters<CacheInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.service, params.0).await
    }

    #[tool(description = "Activate the installed, waiting generation and delete every other generation.")]
    async fn cache_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.service).await
    }

    /// Intercepted request: cache hit, or exactly one network fetch on a miss.
    #[tool(
        description = "Fetch a URL through the cache. Served from the active generation on a hit; otherwise fetched from the network once and not stored."
    )]
    async fn cache_fetch(&self, params: Parameters<CacheFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.service, params.0).await
    }

    #[tool(description = "List stored cache generations with entry counts and the active one.")]
    async fn cache_generations(&self) -> Result<CallToolResult, McpError> {
        generations_impl(&self.service).await
    }

    #[tool(description = "Delete a cache generation by tag.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(&self.service, params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

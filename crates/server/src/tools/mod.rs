//! MCP tool implementations.
//!
//! Each tool takes the shared [`CacheService`](crate::state::CacheService)
//! and returns its output as pretty-printed JSON text content.

pub mod activate;
pub mod delete;
pub mod fetch;
pub mod generations;
pub mod install;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use swcache_core::Error;

pub use activate::activate_impl;
pub use delete::{CacheDeleteParams, delete_impl};
pub use fetch::{CacheFetchParams, fetch_impl};
pub use generations::generations_impl;
pub use install::{CacheInstallParams, install_impl};

fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

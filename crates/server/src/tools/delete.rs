//! cache_delete tool implementation.
//!
//! Deletes a generation by tag. Deleting the active generation turns every
//! later request into a miss.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::Error;

use super::json_result;
use crate::state::CacheService;

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Generation tag to delete.
    pub tag: String,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    pub tag: String,
    /// False if no such generation existed.
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(service: &CacheService, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.trim();
    if tag.is_empty() {
        return Err(Error::InvalidInput("tag cannot be empty".into()).into());
    }

    let deleted = service.storage().delete(tag).await?;
    for worker in service.workers().await {
        worker.generations().delete_generation(tag).await?;
    }

    json_result(&CacheDeleteOutput { tag: tag.to_string(), deleted })
}

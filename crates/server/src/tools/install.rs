//! cache_install tool implementation.
//!
//! Registers a worker for a generation tag and runs its install lifecycle.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{PrecacheReport, WorkerState};

use super::json_result;
use crate::state::CacheService;

/// Parameters for the cache_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheInstallParams {
    /// Generation tag to install. Defaults to the configured cache name.
    #[serde(default)]
    pub tag: Option<String>,
}

/// Output from the cache_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInstallOutput {
    /// The installed generation tag.
    pub tag: String,
    /// Worker state after install (activated when skip_waiting is on).
    pub state: WorkerState,
    /// What the precache loader stored.
    pub report: Option<PrecacheReport>,
    /// Every generation in storage.
    pub generations: Vec<String>,
}

/// Implementation of the cache_install tool.
pub async fn install_impl(service: &CacheService, params: CacheInstallParams) -> Result<CallToolResult, McpError> {
    let (worker, state) = service.install(params.tag).await?;

    let output = CacheInstallOutput {
        tag: worker.tag().to_string(),
        state,
        report: worker.last_report(),
        generations: worker.generations().list_generations().await.into_iter().collect(),
    };
    json_result(&output)
}

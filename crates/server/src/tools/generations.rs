//! cache_generations tool implementation.
//!
//! Lists every generation in storage with its entry count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::WorkerState;

use super::json_result;
use crate::state::CacheService;

/// A stored generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationInfo {
    pub tag: String,
    pub entries: usize,
    pub active: bool,
}

/// Output from the cache_generations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGenerationsOutput {
    pub generations: Vec<GenerationInfo>,
    /// State of the registered worker, if any.
    pub state: Option<WorkerState>,
}

/// Implementation of the cache_generations tool.
pub async fn generations_impl(service: &CacheService) -> Result<CallToolResult, McpError> {
    let active = service.active_tag().await;
    let storage = service.storage();

    let mut generations = Vec::new();
    for tag in storage.names().await? {
        let entries = storage.entry_count(&tag).await?;
        let active = active.as_deref() == Some(tag.as_str());
        generations.push(GenerationInfo { tag, entries, active });
    }

    let output = CacheGenerationsOutput { generations, state: service.host().state() };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, service, site};
    use crate::tools::{CacheInstallParams, install_impl};

    #[tokio::test]
    async fn test_generations_empty() {
        let service = service(site()).await;

        let out: CacheGenerationsOutput = output(&generations_impl(&service).await.unwrap());
        assert!(out.generations.is_empty());
        assert_eq!(out.state, None);
    }

    #[tokio::test]
    async fn test_generations_after_install() {
        let service = service(site()).await;
        install_impl(&service, CacheInstallParams { tag: Some("v1".into()) }).await.unwrap();

        let out: CacheGenerationsOutput = output(&generations_impl(&service).await.unwrap());
        assert_eq!(out.generations.len(), 1);
        assert_eq!(out.generations[0].tag, "v1");
        assert_eq!(out.generations[0].entries, 2);
        assert!(out.generations[0].active);
        assert_eq!(out.state, Some(WorkerState::Activated));
    }
}

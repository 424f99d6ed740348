//! cache_activate tool implementation.
//!
//! Activates an installed worker that is waiting (skip_waiting off).

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::WorkerState;

use super::json_result;
use crate::state::CacheService;

/// Output from the cache_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheActivateOutput {
    /// The now active generation.
    pub active: Option<String>,
    pub state: Option<WorkerState>,
    /// Generations left in storage.
    pub generations: Vec<String>,
}

/// Implementation of the cache_activate tool.
pub async fn activate_impl(service: &CacheService) -> Result<CallToolResult, McpError> {
    service.activate().await?;

    let output = CacheActivateOutput {
        active: service.active_tag().await,
        state: service.host().state(),
        generations: service.storage().names().await?,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CacheService;
    use crate::tools::testing::{output, site};
    use crate::tools::{CacheInstallParams, install_impl};
    use std::sync::Arc;
    use swcache_core::{AppConfig, CacheDb};

    async fn waiting_service() -> CacheService {
        let config = AppConfig { precache: vec!["/".into()], skip_waiting: false, ..Default::default() };
        let storage = Arc::new(CacheDb::open_in_memory().await.unwrap());
        CacheService::new(config, storage, site())
    }

    #[tokio::test]
    async fn test_activate_waiting_worker() {
        let service = waiting_service().await;
        install_impl(&service, CacheInstallParams { tag: Some("v1".into()) }).await.unwrap();
        assert_eq!(service.host().state(), Some(WorkerState::Installed));

        let result = activate_impl(&service).await.unwrap();
        let out: CacheActivateOutput = output(&result);
        assert_eq!(out.active.as_deref(), Some("v1"));
        assert_eq!(out.state, Some(WorkerState::Activated));
        assert_eq!(out.generations, vec!["v1"]);
    }

    #[tokio::test]
    async fn test_activate_without_install_is_lifecycle_error() {
        let service = waiting_service().await;

        let err = activate_impl(&service).await.unwrap_err();
        assert_eq!(err.code.0, -32005);
    }
}

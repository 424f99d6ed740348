//! Request interceptor: cache lookup, then network fallback.
//!
//! A hit is served as stored, with no freshness check. A miss goes to the
//! network exactly once and the result is returned as is; misses are never
//! written back into the cache.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheRequest, Error, GenerationManager, StoredResponse};

use crate::fetch::Fetcher;

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
}

/// Response returned for an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedResponse {
    pub source: ResponseSource,
    pub response: StoredResponse,
}

/// Serves requests from the active generation, falling back to the network.
pub struct RequestInterceptor {
    generations: Arc<GenerationManager>,
    fetcher: Arc<dyn Fetcher>,
}

impl RequestInterceptor {
    pub fn new(generations: Arc<GenerationManager>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { generations, fetcher }
    }

    /// Look the request up in the active generation.
    ///
    /// Non-GET requests, a missing active generation and storage errors all
    /// count as a miss.
    pub async fn lookup(&self, request: &CacheRequest) -> Option<StoredResponse> {
        if !request.is_cacheable() {
            return None;
        }

        let generation = self.generations.active_generation().await?;
        match generation.get(&request.key()).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, url = %request.url(), generation = generation.tag(), "cache lookup failed");
                None
            }
        }
    }

    /// Answer a request: stored response on a hit, one network call on a miss.
    ///
    /// # Errors
    ///
    /// Network errors on the miss path are returned unchanged.
    pub async fn handle(&self, request: &CacheRequest) -> Result<InterceptedResponse, Error> {
        if let Some(response) = self.lookup(request).await {
            tracing::debug!(url = %request.url(), "cache hit");
            return Ok(InterceptedResponse { source: ResponseSource::Cache, response });
        }

        tracing::debug!(method = request.method(), url = %request.url(), "cache miss, fetching from network");
        let response = self.fetcher.fetch(request).await?;
        Ok(InterceptedResponse { source: ResponseSource::Network, response: response.into_stored() })
    }
}

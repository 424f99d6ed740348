//! cache_fetch tool implementation.
//!
//! Dispatches a fetch event to the host: the active worker answers from its
//! generation or the network; with no active worker the host goes to the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{ResponseSource, fetch::resolve};
use swcache_core::{CacheRequest, Error};
use url::Url;

use super::json_result;
use crate::state::CacheService;

/// Parameters for the cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET is served from the cache.
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchOutput {
    pub url: String,
    pub final_url: String,
    /// Whether the response came from the cache or the network.
    pub source: ResponseSource,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
    pub fetched_at: String,
}

/// Implementation of the cache_fetch tool.
pub async fn fetch_impl(service: &CacheService, params: CacheFetchParams) -> Result<CallToolResult, McpError> {
    let origin = Url::parse(&service.config().origin)
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", service.config().origin)))?;
    let url = resolve(&origin, &params.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;

    let method = params.method.trim();
    if method.is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let answer = service.host().fetch(&CacheRequest::new(method, url)).await?;
    let response = answer.response;

    let output = CacheFetchOutput {
        url: response.url,
        final_url: response.final_url,
        source: answer.source,
        status: response.status,
        headers: response.headers,
        body: String::from_utf8_lossy(&response.body).into_owned(),
        body_bytes: response.body.len(),
        fetched_at: response.fetched_at,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, service, site};
    use crate::tools::{CacheInstallParams, install_impl};

    fn params(url: &str) -> CacheFetchParams {
        CacheFetchParams { url: url.into(), method: default_method() }
    }

    #[tokio::test]
    async fn test_fetch_before_install_uses_network() {
        let site = site();
        let service = service(site.clone()).await;

        let result = fetch_impl(&service, params("/")).await.unwrap();
        let out: CacheFetchOutput = output(&result);
        assert_eq!(out.source, ResponseSource::Network);
        assert_eq!(out.body, "home");
        assert_eq!(site.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_served_from_cache_after_install() {
        let site = site();
        let service = service(site.clone()).await;
        install_impl(&service, CacheInstallParams::default()).await.unwrap();
        let after_install = site.calls();

        let result = fetch_impl(&service, params("http://localhost:8501/")).await.unwrap();
        let out: CacheFetchOutput = output(&result);
        assert_eq!(out.source, ResponseSource::Cache);
        assert_eq!(out.status, 200);
        assert_eq!(site.calls(), after_install);

        let result = fetch_impl(&service, params("/unknown.png")).await.unwrap();
        let out: CacheFetchOutput = output(&result);
        assert_eq!(out.source, ResponseSource::Network);
        assert_eq!(site.calls(), after_install + 1);
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_url() {
        let service = service(site()).await;

        let err = fetch_impl(&service, params("ftp://files.test/a")).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }

    #[tokio::test]
    async fn test_post_bypasses_cache() {
        let site = site();
        let service = service(site.clone()).await;
        install_impl(&service, CacheInstallParams::default()).await.unwrap();

        let result = fetch_impl(&service, CacheFetchParams { url: "/".into(), method: "post".into() })
            .await
            .unwrap();
        let out: CacheFetchOutput = output(&result);
        assert_eq!(out.source, ResponseSource::Network);
    }
}

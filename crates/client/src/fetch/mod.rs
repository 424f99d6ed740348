//! Network fetch primitive.
//!
//! The interceptor and precache loader only see the [`Fetcher`] trait, so the
//! network can be swapped for a fake in tests. [`HttpFetcher`] is the reqwest
//! implementation used by the server.
//!
//! Like the browser `fetch()`, an HTTP error status is still a response; only
//! transport failures (DNS, connect, timeout, oversized body) are errors.

pub mod url;

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{Client, Method, StatusCode, Url, header};
use swcache_core::{CacheRequest, Error, StoredResponse};

pub use self::url::{UrlError, canonicalize, resolve};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&swcache_core::AppConfig> for FetchConfig {
    fn from(config: &swcache_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Convert into the stored representation, stamping the fetch time.
    pub fn into_stored(self) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        StoredResponse {
            url: self.url.to_string(),
            final_url: self.final_url.to_string(),
            status: self.status.as_u16(),
            headers,
            body: self.bytes.to_vec(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// The network, as seen by the cache.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue the request once. No retries.
    ///
    /// # Errors
    ///
    /// `Error::Network` for transport-level failures.
    async fn fetch(&self, request: &CacheRequest) -> Result<FetchResponse, Error>;
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: usize) -> Error {
        Error::Network(format!("{len} bytes exceeds {}", self.config.max_bytes))
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &CacheRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = request.url().clone();
        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method())))?;

        let response = self
            .http
            .request(method, url.clone())
            .send()
            .await
            .map_err(|e| Error::Network(format!("{url}: {e}")))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response from {url}: {e}")))?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len()));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            method = request.method(),
            %url,
            %final_url,
            status = status.as_u16(),
            fetch_ms,
            bytes = bytes.len(),
            "network fetch complete"
        );

        Ok(FetchResponse { url, final_url, status, headers, bytes, fetch_ms })
    }
}

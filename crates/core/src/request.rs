//! Intercepted request representation.

use url::Url;

use crate::cache::hash::compute_request_key;

/// A request as seen by the interceptor.
///
/// The URL is expected to be canonical (see `swcache_client::fetch::canonicalize`),
/// so two requests for the same resource always produce the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    method: String,
    url: Url,
}

impl CacheRequest {
    /// Build a request, normalizing the method to uppercase.
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.trim().to_ascii_uppercase(), url }
    }

    /// Shorthand for a `GET` request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Only `GET` requests are stored or matched.
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }

    /// Storage key for this request.
    pub fn key(&self) -> String {
        compute_request_key(&self.method, self.url.as_str())
    }
}

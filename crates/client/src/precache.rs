//! Precache loader.
//!
//! Fetches every manifest entry and writes the responses into a generation
//! with one atomic batch write. Fetches run concurrently (bounded), results
//! keep manifest order, and nothing is retried.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::{StreamExt, stream};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheRequest, Error, GenerationHandle, PrecachePolicy, StoredResponse};
use url::Url;

use crate::fetch::{Fetcher, resolve};

/// Ordered, duplicate-free list of resources to precache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheManifest {
    urls: Vec<Url>,
}

impl PrecacheManifest {
    /// Resolve manifest entries against `origin`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUrl` if an entry cannot be resolved
    /// - `Error::InvalidInput` if two entries name the same resource
    pub fn resolve(origin: &Url, entries: &[String]) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        let mut urls = Vec::with_capacity(entries.len());

        for entry in entries {
            let url = resolve(origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")))?;
            if !seen.insert(url.clone()) {
                return Err(Error::InvalidInput(format!("duplicate precache entry: {url}")));
            }
            urls.push(url);
        }

        Ok(Self { urls })
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// A resource that could not be precached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of a population run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PrecacheReport {
    /// Generation that was populated.
    pub generation: String,
    /// URLs written, in manifest order.
    pub stored: Vec<String>,
    /// Failures (only non-empty under `PrecachePolicy::BestEffort`).
    pub failed: Vec<PrecacheFailure>,
}

impl PrecacheReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Populates generations from a manifest.
pub struct PrecacheLoader {
    fetcher: Arc<dyn Fetcher>,
    policy: PrecachePolicy,
    concurrency: usize,
}

impl PrecacheLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: PrecachePolicy, concurrency: usize) -> Self {
        Self { fetcher, policy, concurrency: concurrency.max(1) }
    }

    pub fn policy(&self) -> PrecachePolicy {
        self.policy
    }

    /// Fetch every manifest entry and store the results in `generation`.
    ///
    /// Under `AllOrNothing` a single failure returns `Error::PrecacheFetch`
    /// for the first failing entry in manifest order and writes nothing.
    ///
    /// # Errors
    ///
    /// - `Error::PrecacheFetch` as above
    /// - storage errors from the batch write (store missing, quota)
    pub async fn populate(
        &self, generation: &GenerationHandle, manifest: &PrecacheManifest,
    ) -> Result<PrecacheReport, Error> {
        let results: Vec<(Url, Result<StoredResponse, String>)> = stream::iter(manifest.urls().iter().cloned())
            .map(|url| async move {
                let result = self.fetch_one(&url).await;
                (url, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut entries = Vec::with_capacity(results.len());
        let mut report = PrecacheReport { generation: generation.tag().to_string(), ..Default::default() };

        for (url, result) in results {
            match result {
                Ok(response) => {
                    entries.push((CacheRequest::get(url.clone()).key(), response));
                    report.stored.push(url.to_string());
                }
                Err(reason) => {
                    if self.policy == PrecachePolicy::AllOrNothing {
                        tracing::warn!(%url, %reason, generation = generation.tag(), "precache aborted");
                        return Err(Error::PrecacheFetch { url: url.to_string(), reason });
                    }
                    tracing::warn!(%url, %reason, generation = generation.tag(), "precache entry skipped");
                    report.failed.push(PrecacheFailure { url: url.to_string(), reason });
                }
            }
        }

        generation.put_all(entries).await?;

        tracing::info!(
            generation = generation.tag(),
            stored = report.stored.len(),
            failed = report.failed.len(),
            "precache complete"
        );

        Ok(report)
    }

    async fn fetch_one(&self, url: &Url) -> Result<StoredResponse, String> {
        let response = self
            .fetcher
            .fetch(&CacheRequest::get(url.clone()))
            .await
            .map_err(|e| e.to_string())?;

        if !response.status.is_success() {
            return Err(format!("status {}", response.status.as_u16()));
        }

        Ok(response.into_stored())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFetcher, ORIGIN, get, memory_storage};
    use swcache_core::GenerationManager;

    fn origin() -> Url {
        Url::parse(ORIGIN).unwrap()
    }

    fn manifest(entries: &[&str]) -> PrecacheManifest {
        let entries: Vec<String> = entries.iter().map(|s| s.to_string()).collect();
        PrecacheManifest::resolve(&origin(), &entries).unwrap()
    }

    async fn generation(tag: &str) -> GenerationHandle {
        let mgr = GenerationManager::new(tag, memory_storage().await).unwrap();
        mgr.create_generation(tag).await.unwrap()
    }

    #[test]
    fn test_manifest_resolves_in_order() {
        let m = manifest(&["/", "/icons/icon-192.png"]);
        let urls: Vec<&str> = m.urls().iter().map(Url::as_str).collect();
        assert_eq!(urls, vec!["http://localhost:8501/", "http://localhost:8501/icons/icon-192.png"]);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_manifest_rejects_duplicates() {
        let entries = vec!["/".to_string(), "http://localhost:8501/#top".to_string()];
        let result = PrecacheManifest::resolve(&origin(), &entries);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_manifest_rejects_bad_entry() {
        let entries = vec!["ftp://files.test/a".to_string()];
        assert!(matches!(PrecacheManifest::resolve(&origin(), &entries), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_populate_stores_every_entry() {
        let fetcher = Arc::new(FakeFetcher::new().respond("/", 200, "home").respond("/icons/icon-192.png", 200, "png"));
        let loader = PrecacheLoader::new(fetcher.clone(), PrecachePolicy::AllOrNothing, 4);
        let generation = generation("v1").await;

        let report = loader.populate(&generation, &manifest(&["/", "/icons/icon-192.png"])).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.stored.len(), 2);
        assert_eq!(fetcher.calls(), 2);

        let home = generation.get(&get("/").key()).await.unwrap().unwrap();
        assert_eq!(home.body, b"home");
        assert_eq!(generation.entry_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_all_or_nothing_writes_nothing_on_failure() {
        let fetcher = Arc::new(FakeFetcher::new().respond("/", 200, "home").fail("/icons/icon-192.png", "offline"));
        let loader = PrecacheLoader::new(fetcher, PrecachePolicy::AllOrNothing, 4);
        let generation = generation("v1").await;

        let result = loader.populate(&generation, &manifest(&["/", "/icons/icon-192.png"])).await;
        match result {
            Err(Error::PrecacheFetch { url, reason }) => {
                assert_eq!(url, "http://localhost:8501/icons/icon-192.png");
                assert!(reason.contains("offline"));
            }
            other => panic!("expected PrecacheFetch, got {other:?}"),
        }
        assert_eq!(generation.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_success_status_fails_precache() {
        let fetcher = Arc::new(FakeFetcher::new().respond("/", 200, "home"));
        let loader = PrecacheLoader::new(fetcher, PrecachePolicy::AllOrNothing, 2);
        let generation = generation("v1").await;

        let result = loader.populate(&generation, &manifest(&["/", "/missing.png"])).await;
        assert!(matches!(result, Err(Error::PrecacheFetch { reason, .. }) if reason == "status 404"));
    }

    #[tokio::test]
    async fn test_first_failure_in_manifest_order_is_reported() {
        let fetcher = Arc::new(FakeFetcher::new().fail("/a.js", "dns").fail("/b.js", "reset"));
        let loader = PrecacheLoader::new(fetcher, PrecachePolicy::AllOrNothing, 4);
        let generation = generation("v1").await;
        let manifest = manifest(&["/b.js", "/a.js"]);

        for _ in 0..3 {
            let result = loader.populate(&generation, &manifest).await;
            assert!(matches!(result, Err(Error::PrecacheFetch { url, .. }) if url.ends_with("/b.js")));
        }
    }

    #[tokio::test]
    async fn test_best_effort_keeps_successes() {
        let fetcher = Arc::new(FakeFetcher::new().respond("/", 200, "home").fail("/icons/icon-512.png", "offline"));
        let loader = PrecacheLoader::new(fetcher, PrecachePolicy::BestEffort, 4);
        let generation = generation("v1").await;

        let report = loader.populate(&generation, &manifest(&["/", "/icons/icon-512.png"])).await.unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.stored, vec!["http://localhost:8501/"]);
        assert_eq!(report.failed[0].url, "http://localhost:8501/icons/icon-512.png");
        assert_eq!(generation.entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_manifest() {
        let fetcher = Arc::new(FakeFetcher::new());
        let loader = PrecacheLoader::new(fetcher.clone(), PrecachePolicy::AllOrNothing, 4);
        let generation = generation("v1").await;

        let report = loader.populate(&generation, &manifest(&[])).await.unwrap();
        assert!(report.stored.is_empty());
        assert_eq!(fetcher.calls(), 0);
    }
}

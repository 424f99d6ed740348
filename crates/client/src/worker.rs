//! The cache worker: generation manager, precache loader and interceptor
//! wired behind the host lifecycle.
//!
//! - `install` creates the configured generation and precaches the manifest
//! - `activate` retires every other generation and makes this one active
//! - `fetch` serves from the active generation, falling back to the network

use std::sync::{Arc, Mutex};

use swcache_core::{AppConfig, CacheRequest, CacheStorage, Error, GenerationManager};
use url::Url;

use crate::fetch::Fetcher;
use crate::host::LifecycleHandler;
use crate::intercept::{InterceptedResponse, RequestInterceptor};
use crate::precache::{PrecacheLoader, PrecacheManifest, PrecacheReport};

pub struct CacheWorker {
    loader: PrecacheLoader,
    interceptor: RequestInterceptor,
    generations: Arc<GenerationManager>,
    manifest: PrecacheManifest,
    skip_waiting: bool,
    last_report: Mutex<Option<PrecacheReport>>,
}

impl CacheWorker {
    /// Build a worker for `config.cache_name`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUrl` if the origin or a manifest entry is not a valid URL
    /// - `Error::InvalidInput` for a blank cache name or duplicate manifest entries
    pub fn new(config: &AppConfig, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let manifest = PrecacheManifest::resolve(&origin, &config.precache)?;
        let generations = Arc::new(GenerationManager::new(config.cache_name.clone(), storage)?);

        Ok(Self {
            loader: PrecacheLoader::new(Arc::clone(&fetcher), config.precache_policy, config.precache_concurrency),
            interceptor: RequestInterceptor::new(Arc::clone(&generations), fetcher),
            generations,
            manifest,
            skip_waiting: config.skip_waiting,
            last_report: Mutex::new(None),
        })
    }

    /// The generation tag this worker installs.
    pub fn tag(&self) -> &str {
        self.generations.cache_name()
    }

    pub fn generations(&self) -> &Arc<GenerationManager> {
        &self.generations
    }

    /// Report of the last successful install, if any.
    pub fn last_report(&self) -> Option<PrecacheReport> {
        self.last_report.lock().ok().and_then(|report| report.clone())
    }
}

#[async_trait::async_trait]
impl LifecycleHandler for CacheWorker {
    async fn on_install(&self) -> Result<(), Error> {
        tracing::info!(tag = self.tag(), resources = self.manifest.len(), "installing");
        let generation = self.generations.create_generation(self.tag()).await?;
        let report = self.loader.populate(&generation, &self.manifest).await?;

        if let Ok(mut last) = self.last_report.lock() {
            *last = Some(report);
        }
        Ok(())
    }

    async fn on_activate(&self) -> Result<(), Error> {
        let retired = self.generations.activate(self.tag()).await?;
        tracing::info!(tag = self.tag(), retired = ?retired, "worker active");
        Ok(())
    }

    async fn on_fetch(&self, request: &CacheRequest) -> Result<InterceptedResponse, Error> {
        self.interceptor.handle(request).await
    }

    fn skip_waiting(&self) -> bool {
        self.skip_waiting
    }
}

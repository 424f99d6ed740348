//! Shared server state: storage, network, host and the registered workers.

use std::sync::Arc;

use swcache_client::{CacheWorker, Fetcher, Host, LocalHost, Subscription, WorkerState};
use swcache_core::{AppConfig, CacheStorage, Error};
use tokio::sync::Mutex;

struct Registered {
    worker: Arc<CacheWorker>,
    subscription: Subscription,
}

/// The worker answering fetches and the newest one, if it is not active yet.
#[derive(Default)]
struct Workers {
    active: Option<Registered>,
    incoming: Option<Registered>,
}

/// Everything the tools operate on.
///
/// The `workers` lock is only held for bookkeeping, never across a lifecycle
/// event, so listing and deleting stay available while an install precaches.
pub struct CacheService {
    config: AppConfig,
    storage: Arc<dyn CacheStorage>,
    host: LocalHost,
    workers: Mutex<Workers>,
    network: Arc<dyn Fetcher>,
}

impl CacheService {
    pub fn new(config: AppConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            storage,
            host: LocalHost::new(Arc::clone(&network)),
            workers: Mutex::new(Workers::default()),
            network,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn host(&self) -> &LocalHost {
        &self.host
    }

    /// Register a worker for `tag` (default: the configured cache name) and
    /// dispatch `install`. The active worker keeps serving until the new one
    /// activates.
    pub async fn install(&self, tag: Option<String>) -> Result<(Arc<CacheWorker>, WorkerState), Error> {
        let mut config = self.config.clone();
        if let Some(tag) = tag {
            config.cache_name = tag;
        }

        let worker = Arc::new(CacheWorker::new(&config, Arc::clone(&self.storage), Arc::clone(&self.network))?);
        {
            let mut workers = self.workers.lock().await;
            let subscription = self.host.register(worker.clone());
            workers.incoming = Some(Registered { worker: Arc::clone(&worker), subscription });
        }

        let result = self.host.install().await;
        self.sync_active().await;
        Ok((worker, result?))
    }

    /// Dispatch `activate` to the installed, waiting worker.
    pub async fn activate(&self) -> Result<(), Error> {
        let result = self.host.activate().await;
        self.sync_active().await;
        result
    }

    /// Move the incoming worker to `active` once the host has promoted it.
    async fn sync_active(&self) {
        let mut workers = self.workers.lock().await;
        let promoted = workers
            .incoming
            .as_ref()
            .is_some_and(|w| Some(w.subscription.id()) == self.host.active_id());
        if promoted {
            workers.active = workers.incoming.take();
        }
    }

    /// Every registered worker, active first.
    pub async fn workers(&self) -> Vec<Arc<CacheWorker>> {
        let workers = self.workers.lock().await;
        [workers.active.as_ref(), workers.incoming.as_ref()]
            .into_iter()
            .flatten()
            .map(|w| Arc::clone(&w.worker))
            .collect()
    }

    /// Tag served by the active worker, if any.
    pub async fn active_tag(&self) -> Option<String> {
        let active = self.workers.lock().await.active.as_ref().map(|w| Arc::clone(&w.worker));
        match active {
            Some(worker) => worker.generations().active_tag().await,
            None => None,
        }
    }
}

//! Cache generations and their lifecycle.
//!
//! A generation is a named store holding one version of the application's
//! responses. The manager creates generations, computes which ones are stale
//! relative to an active tag, and promotes a generation to active only after
//! every stale one has been deleted.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::Error;
use crate::cache::{CacheStorage, StoredResponse};

/// Tags to retire when `active` becomes the only generation.
///
/// Pure set difference `all - {active}`; no storage access.
pub fn retire_set(all: &BTreeSet<String>, active: &str) -> BTreeSet<String> {
    all.iter().filter(|tag| tag.as_str() != active).cloned().collect()
}

/// Handle to one generation's store.
#[derive(Clone)]
pub struct GenerationHandle {
    tag: String,
    storage: Arc<dyn CacheStorage>,
}

impl std::fmt::Debug for GenerationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationHandle").field("tag", &self.tag).finish_non_exhaustive()
    }
}

impl GenerationHandle {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub async fn get(&self, key: &str) -> Result<Option<StoredResponse>, Error> {
        self.storage.get(&self.tag, key).await
    }

    pub async fn put(&self, key: &str, response: &StoredResponse) -> Result<(), Error> {
        self.storage.put(&self.tag, key, response).await
    }

    /// Atomic batch write; see [`CacheStorage::put_all`].
    pub async fn put_all(&self, entries: Vec<(String, StoredResponse)>) -> Result<(), Error> {
        self.storage.put_all(&self.tag, entries).await
    }

    pub async fn entry_count(&self) -> Result<usize, Error> {
        self.storage.entry_count(&self.tag).await
    }
}

/// Owns the active generation tag for one cache name.
pub struct GenerationManager {
    cache_name: String,
    storage: Arc<dyn CacheStorage>,
    active: RwLock<Option<String>>,
}

impl GenerationManager {
    /// Create a manager whose installs target `cache_name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the cache name is blank.
    pub fn new(cache_name: impl Into<String>, storage: Arc<dyn CacheStorage>) -> Result<Self, Error> {
        let cache_name = cache_name.into();
        validate_tag(&cache_name)?;
        Ok(Self { cache_name, storage, active: RwLock::new(None) })
    }

    /// The generation tag this manager installs.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Open (creating if needed) the store for `tag`.
    ///
    /// # Errors
    ///
    /// Propagates storage errors: the store is unavailable or over quota.
    pub async fn create_generation(&self, tag: &str) -> Result<GenerationHandle, Error> {
        validate_tag(tag)?;
        self.storage.open(tag).await?;
        tracing::info!(tag, "created cache generation");
        Ok(GenerationHandle { tag: tag.to_string(), storage: Arc::clone(&self.storage) })
    }

    /// Every generation tag in storage. Storage failures yield an empty set.
    pub async fn list_generations(&self) -> BTreeSet<String> {
        match self.storage.names().await {
            Ok(names) => names.into_iter().collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to list cache generations; treating as none");
                BTreeSet::new()
            }
        }
    }

    /// Delete a generation. Unknown tags are a no-op.
    pub async fn delete_generation(&self, tag: &str) -> Result<(), Error> {
        let existed = self.storage.delete(tag).await?;
        if existed {
            tracing::info!(tag, "deleted cache generation");
        }

        let mut active = self.active.write().await;
        if active.as_deref() == Some(tag) {
            *active = None;
        }
        Ok(())
    }

    /// Generations that activating `active` would retire.
    pub async fn stale_generations(&self, active: &str) -> BTreeSet<String> {
        retire_set(&self.list_generations().await, active)
    }

    /// Delete every other generation, then mark `tag` active.
    ///
    /// Deletions are awaited one by one; if any fails the error is returned
    /// and the previously active tag is kept. Returns the retired tags.
    ///
    /// # Errors
    ///
    /// - `Error::GenerationNotFound` if `tag` was never created
    /// - storage errors from listing or deleting generations
    pub async fn activate(&self, tag: &str) -> Result<BTreeSet<String>, Error> {
        let all: BTreeSet<String> = self.storage.names().await?.into_iter().collect();
        if !all.contains(tag) {
            return Err(Error::GenerationNotFound(tag.to_string()));
        }

        let stale = retire_set(&all, tag);
        for old in &stale {
            self.storage.delete(old).await?;
            tracing::info!(tag = %old, "retired stale cache generation");
        }

        *self.active.write().await = Some(tag.to_string());
        tracing::info!(tag, retired = stale.len(), "activated cache generation");

        Ok(stale)
    }

    /// Tag of the active generation, if any.
    pub async fn active_tag(&self) -> Option<String> {
        self.active.read().await.clone()
    }

    /// Read handle to the active generation, if any.
    pub async fn active_generation(&self) -> Option<GenerationHandle> {
        self.active_tag()
            .await
            .map(|tag| GenerationHandle { tag, storage: Arc::clone(&self.storage) })
    }
}

fn validate_tag(tag: &str) -> Result<(), Error> {
    if tag.trim().is_empty() {
        return Err(Error::InvalidInput("generation tag cannot be empty".into()));
    }
    Ok(())
}

//! SQLite-backed key-value store for cached responses.
//!
//! Responses live in named stores, one per cache generation. The store is
//! the sole persistence boundary: the generation manager and the request
//! interceptor only see the [`CacheStorage`] trait.
//!
//! - Requests are keyed by a SHA-256 of method and canonical URL
//! - Batch writes are atomic (single transaction)
//! - Optional per-store entry quota
//! - Deleting a store drops all of its entries

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredResponse;

/// Async key-value store of named response caches.
///
/// Implementations must make `put_all` atomic: after a failed call the store
/// holds exactly what it held before.
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the named store if missing.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Store one response under `key`.
    async fn put(&self, name: &str, key: &str, response: &StoredResponse) -> Result<(), Error>;

    /// Look up a response.
    async fn get(&self, name: &str, key: &str) -> Result<Option<StoredResponse>, Error>;

    /// Store a batch of responses, all or nothing.
    async fn put_all(&self, name: &str, entries: Vec<(String, StoredResponse)>) -> Result<(), Error>;

    /// Drop a store. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Names of every store.
    async fn names(&self) -> Result<Vec<String>, Error>;

    /// Number of responses in a store.
    async fn entry_count(&self, name: &str) -> Result<usize, Error>;
}

#[async_trait::async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.open_store(name).await
    }

    async fn put(&self, name: &str, key: &str, response: &StoredResponse) -> Result<(), Error> {
        self.put_entries(name, vec![(key.to_string(), response.clone())]).await
    }

    async fn get(&self, name: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        self.get_entry(name, key).await
    }

    async fn put_all(&self, name: &str, entries: Vec<(String, StoredResponse)>) -> Result<(), Error> {
        self.put_entries(name, entries).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_store(name).await
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.store_names().await
    }

    async fn entry_count(&self, name: &str) -> Result<usize, Error> {
        CacheDb::entry_count(self, name).await
    }
}

//! Test doubles shared by the client modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use reqwest::{StatusCode, header};
use swcache_core::{CacheDb, CacheRequest, CacheStorage, Error, StoredResponse};

use crate::fetch::{FetchResponse, Fetcher};

pub const ORIGIN: &str = "http://localhost:8501";

enum Route {
    Respond { status: u16, body: Vec<u8> },
    Fail(String),
}

/// Scripted network that counts every call. Unrouted URLs answer 404.
#[derive(Default)]
pub struct FakeFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn url(path: &str) -> String {
        format!("{ORIGIN}{path}")
    }

    pub fn respond(self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(Self::url(path), Route::Respond { status, body: body.as_bytes().to_vec() });
        self
    }

    pub fn fail(self, path: &str, reason: &str) -> Self {
        self.set_fail(path, reason);
        self
    }

    pub fn set_fail(&self, path: &str, reason: &str) {
        self.routes.lock().unwrap().insert(Self::url(path), Route::Fail(reason.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, path: &str) -> usize {
        let url = Self::url(path);
        self.log.lock().unwrap().iter().filter(|u| **u == url).count()
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &CacheRequest) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = request.url().to_string();
        self.log.lock().unwrap().push(url.clone());

        let (status, body) = match self.routes.lock().unwrap().get(&url) {
            Some(Route::Respond { status, body }) => (*status, body.clone()),
            Some(Route::Fail(reason)) => return Err(Error::Network(reason.clone())),
            None => (404, b"not found".to_vec()),
        };

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain"));

        Ok(FetchResponse {
            url: request.url().clone(),
            final_url: request.url().clone(),
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            bytes: Bytes::from(body),
            fetch_ms: 1,
        })
    }
}

pub async fn memory_storage() -> Arc<dyn CacheStorage> {
    Arc::new(CacheDb::open_in_memory().await.unwrap())
}

pub fn get(path: &str) -> CacheRequest {
    CacheRequest::get(url::Url::parse(&format!("{ORIGIN}{path}")).unwrap())
}

/// `CacheDb` whose reads can be switched to fail.
pub struct UnreadableStorage {
    db: CacheDb,
    pub fail_reads: AtomicBool,
}

impl UnreadableStorage {
    pub async fn new() -> Arc<Self> {
        Arc::new(Self { db: CacheDb::open_in_memory().await.unwrap(), fail_reads: AtomicBool::new(false) })
    }
}

#[async_trait::async_trait]
impl CacheStorage for UnreadableStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        CacheStorage::open(&self.db, name).await
    }

    async fn put(&self, name: &str, key: &str, response: &StoredResponse) -> Result<(), Error> {
        self.db.put(name, key, response).await
    }

    async fn get(&self, name: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::CorruptEntry(format!("{name}/{key}")));
        }
        self.db.get(name, key).await
    }

    async fn put_all(&self, name: &str, entries: Vec<(String, StoredResponse)>) -> Result<(), Error> {
        self.db.put_all(name, entries).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.db.delete(name).await
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.db.names().await
    }

    async fn entry_count(&self, name: &str) -> Result<usize, Error> {
        self.db.entry_count(name).await
    }
}

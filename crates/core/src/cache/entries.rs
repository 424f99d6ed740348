//! Stored response reads and writes.
//!
//! Writes go through a single transaction per call, so `put_entries` is
//! atomic across the whole batch: either every response lands or none does.

use std::collections::HashSet;

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// A response held in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredResponse {
    /// Canonical request URL the response was stored under.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers in received order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
    /// RFC 3339 timestamp of the network fetch.
    pub fetched_at: String,
}

impl StoredResponse {
    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl CacheDb {
    /// Insert or replace a batch of responses in one transaction.
    ///
    /// Fails with `Error::StoreNotFound` if the store was never opened and
    /// with `Error::QuotaExceeded` if the batch would push the store past its
    /// entry limit. In both cases nothing is written.
    pub async fn put_entries(&self, store: &str, entries: Vec<(String, StoredResponse)>) -> Result<(), Error> {
        let store = store.to_string();
        let max_entries = self.max_entries;
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;

                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)",
                    params![store],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::StoreNotFound(store));
                }

                if let Some(limit) = max_entries {
                    let current: i64 =
                        tx.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;

                    let mut seen = HashSet::new();
                    let mut added = 0usize;
                    for (key, _) in &entries {
                        if !seen.insert(key.as_str()) {
                            continue;
                        }
                        let present: bool = tx.query_row(
                            "SELECT EXISTS(SELECT 1 FROM entries WHERE store = ?1 AND key = ?2)",
                            params![store, key],
                            |row| row.get(0),
                        )?;
                        if !present {
                            added += 1;
                        }
                    }

                    if current as usize + added > limit {
                        return Err(Error::QuotaExceeded { store, limit });
                    }
                }

                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO entries (
                            store, key, url, final_url, status_code, headers_json, body, fetched_at, stored_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                        ON CONFLICT(store, key) DO UPDATE SET
                            url = excluded.url,
                            final_url = excluded.final_url,
                            status_code = excluded.status_code,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            fetched_at = excluded.fetched_at,
                            stored_at = excluded.stored_at",
                    )?;

                    for (key, response) in &entries {
                        let headers_json = serde_json::to_string(&response.headers)
                            .map_err(|e| Error::CorruptEntry(format!("headers for {}: {e}", response.url)))?;
                        stmt.execute(params![
                            store,
                            key,
                            response.url,
                            response.final_url,
                            response.status,
                            headers_json,
                            response.body,
                            response.fetched_at,
                            stored_at,
                        ])?;
                    }
                }

                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a stored response.
    ///
    /// Returns None if the store or the key doesn't exist.
    pub async fn get_entry(&self, store: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        let store = store.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT url, final_url, status_code, headers_json, body, fetched_at
                         FROM entries WHERE store = ?1 AND key = ?2",
                        params![store, key],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, u16>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, Vec<u8>>(4)?,
                                row.get::<_, String>(5)?,
                            ))
                        },
                    )
                    .optional()?;

                let Some((url, final_url, status, headers_json, body, fetched_at)) = row else {
                    return Ok(None);
                };

                let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                    .map_err(|e| Error::CorruptEntry(format!("headers for {url}: {e}")))?;

                Ok(Some(StoredResponse { url, final_url, status, headers, body, fetched_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Number of responses held by a store.
    pub async fn entry_count(&self, store: &str) -> Result<usize, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }
}

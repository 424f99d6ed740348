//! Client-side runtime for swcache.
//!
//! This crate provides the network fetch primitive, the precache loader,
//! the request interceptor and the host lifecycle that ties them together
//! into an installable cache worker.

pub mod fetch;
pub mod host;
pub mod intercept;
pub mod precache;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetch::{FetchConfig, FetchResponse, Fetcher, HttpFetcher};
pub use host::{Host, LifecycleHandler, LocalHost, Subscription, WorkerState};
pub use intercept::{InterceptedResponse, RequestInterceptor, ResponseSource};
pub use precache::{PrecacheFailure, PrecacheLoader, PrecacheManifest, PrecacheReport};
pub use worker::CacheWorker;

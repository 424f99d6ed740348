//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Response store with SQLite backend
//! - Cache generation management
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod request;

pub use cache::{CacheDb, CacheStorage, StoredResponse};
pub use config::{AppConfig, ConfigError, PrecachePolicy};
pub use error::Error;
pub use generation::{GenerationHandle, GenerationManager, retire_set};
pub use request::CacheRequest;

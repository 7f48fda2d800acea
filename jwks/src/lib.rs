#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! The JWKS subsystem (spec §4.8): fetches signing-key documents on a
//! per-source TTL, dedups by content hash, persists durably, and fans
//! out changes to subscribers.

pub mod fetcher;
pub mod scheduler;
pub mod store;

pub use fetcher::{FetchError, HyperFetcher, JwksFetcher};
pub use scheduler::JwksCache;
pub use store::{ConfigMapStore, JwksStore, MemoryStore, StoredEntry};

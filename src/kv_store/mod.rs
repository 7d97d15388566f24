//! Hierarchical key-value storage.
//!
//! Policy records live in a flat keyspace whose `/`-separated segments encode an entity path,
//! e.g. `/acl/ip/pool/10.0.0.1`. The only operations available are point reads and writes,
//! point deletes, and ordered prefix scans/deletes: there are no range queries over IP
//! arithmetic and no multi-key transactions.
//!
//! Two implementations are provided, [`memory::InMemoryKvStore`] and [`file::FileKvStore`].
//! The former is not durable across restarts. The latter writes its state to disk after each
//! mutation and loads this state again on startup.
//!
//! Services don't use a [`KvStore`] directly. They go through a [`StoreClient`], which bounds
//! every call with a deadline.

use crate::error::Error;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod client;
pub mod file;
pub mod memory;

pub use client::{StoreClient, Timeouts};
#[allow(clippy::module_name_repetitions)]
pub use file::FileKvStore;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryKvStore;

/// `DynKvStore` is a type alias for a [`KvStore`] that can be used by multiple read/write
/// consumers that coordinate through an [`Arc`] and a [`RwLock`] wrapping the [`KvStore`].
#[allow(clippy::module_name_repetitions)]
pub type DynKvStore = Arc<RwLock<dyn KvStore + Send + Sync>>;

/// An async trait describing a hierarchical, prefix-scannable key-value store.
#[async_trait::async_trait]
pub trait KvStore {
    /// Get the value stored at `key` (if any).
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Get every key/value pair whose key starts with `prefix`, ordered by key.
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, Error>;

    /// Store `value` at `key`, replacing any previous value.
    async fn put(&mut self, key: &str, value: String) -> Result<(), Error>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&mut self, key: &str) -> Result<(), Error>;

    /// Remove every key starting with `prefix`.
    async fn delete_prefix(&mut self, prefix: &str) -> Result<(), Error>;
}

/// Decode the JSON value stored at `key`.
///
/// # Errors
///
/// Returns [`Error::Deserialization`] naming `key` if `value` doesn't have the shape of `T`.
pub fn decode<T: DeserializeOwned>(key: &str, value: &str) -> Result<T, Error> {
    serde_json::from_str(value).map_err(|source| Error::Deserialization {
        key: key.to_string(),
        source,
    })
}

/// Wrap a concrete store so it can be shared between services.
pub fn shared<S>(store: S) -> DynKvStore
where
    S: KvStore + Send + Sync + 'static,
{
    Arc::new(RwLock::new(store))
}

//! Storage abstraction for Corkboard.
//!
//! The [`KvStore`] trait is the durable local key-value store that the
//! persistence layer writes through to. Two records live in it: the state
//! snapshot and, separately, the credential (see [`crate::persistence`]).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

/// Abstract string key-value store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](KvStore::get) | Read a value, `None` if absent |
/// | [`set`](KvStore::set) | Insert or overwrite a value |
/// | [`remove`](KvStore::remove) | Delete a key (absent keys are fine) |
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

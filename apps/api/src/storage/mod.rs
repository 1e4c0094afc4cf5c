// Storage layer: an abstract key-value collection and its backends.
// The response and metadata stores only ever talk to `Collection`.

pub mod document;
pub mod memory;
pub mod table;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use document::DocumentCollection;
pub use memory::MemoryCollection;
pub use table::PgCollection;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A named collection of JSON documents addressed by string keys.
///
/// Every write replaces the full document stored under a key. Backends
/// guarantee single-key atomicity and nothing more.
#[async_trait]
pub trait Collection: Send + Sync {
    /// Collection name, used for logging and table/file naming.
    fn name(&self) -> &str;

    /// Returns the document stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Inserts or replaces the document stored under `key`.
    async fn put(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Removes `key`. Returns whether a document was actually removed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Returns every `(key, document)` whose key starts with `prefix`,
    /// sorted by key. An empty prefix scans the whole collection.
    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>, StorageError>;
}

//! Document-store capability consumed by the pipeline
//!
//! The store itself is an external collaborator; this module only
//! specifies the operations the pipeline requires from it.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Polling-location reference data, keyed by booth id
pub const BOOTHS: &str = "booths";

/// Anomaly records, keyed by `voter:kind`
pub const ANOMALIES: &str = "anomalies";

/// Parent collection of per-booth vote marker sub-collections
pub const VOTES: &str = "votes";

/// Sub-collection holding a booth's ciphertext-keyed vote markers
pub const VOTES_SUBCOLLECTION: &str = "booth";

/// Per-booth aggregate counters
pub const ANALYTICS: &str = "analytics";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store io error: {0}")]
    Io(String),

    #[error("malformed document in {collection}/{id}")]
    Codec { collection: String, id: String },
}

/// Hierarchical document store. Implementations must give
/// `read_modify_write` serializable isolation: two concurrent calls
/// for the same document each observe the other's effect, never a
/// stale read.
#[trait_variant::make(Send)]
pub trait DocumentStore {
    /// Lookup by id; `None` when the document does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Creates the document or merges the given fields into it
    async fn upsert_merge(&self, collection: &str, id: &str, fields: Value)
        -> Result<(), StoreError>;

    /// Writes a document at `collection/parent/subcollection/id`,
    /// replacing any previous content
    async fn set_nested(
        &self,
        collection: &str,
        parent: &str,
        subcollection: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError>;

    /// Serializable read-modify-write of a single document. The
    /// closure receives the current content (or `None`) and returns
    /// the content to persist; an error from the closure aborts the
    /// write and leaves the document untouched.
    async fn read_modify_write<F>(
        &self,
        collection: &str,
        id: &str,
        apply: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(Option<Value>) -> Result<Value, StoreError> + Send;
}

impl<T> DocumentStore for Arc<T>
where
    T: DocumentStore + Send + Sync,
{
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn upsert_merge(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        (**self).upsert_merge(collection, id, fields).await
    }

    async fn set_nested(
        &self,
        collection: &str,
        parent: &str,
        subcollection: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        (**self)
            .set_nested(collection, parent, subcollection, id, fields)
            .await
    }

    async fn read_modify_write<F>(
        &self,
        collection: &str,
        id: &str,
        apply: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(Option<Value>) -> Result<Value, StoreError> + Send,
    {
        (**self).read_modify_write(collection, id, apply).await
    }
}

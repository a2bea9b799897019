//! In-memory implementation of the document-store capability
//!
//! Backs tests and single-node deployments. One async mutex guards the
//! whole document map; `read_modify_write` holds it across the apply
//! closure, which serializes concurrent updates of the same document.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::Mutex;

use votum_core::store::{DocumentStore, StoreError};


type DocKey = (String, String);

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<DocKey, Value>>,
}

/// Collection path for documents nested under a parent document
pub fn nested_path(collection: &str, parent: &str, subcollection: &str) -> String {
    format!("{collection}/{parent}/{subcollection}")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct insert bypassing merge semantics, for seeding reference
    /// data at startup
    pub async fn seed(&self, collection: &str, id: &str, fields: Value) {
        let mut docs = self.docs.lock().await;
        docs.insert((collection.to_owned(), id.to_owned()), fields);
    }

    /// Number of documents under a collection path
    pub async fn count(&self, collection: &str) -> usize {
        let docs = self.docs.lock().await;
        docs.keys().filter(|(c, _)| c == collection).count()
    }

    /// Document ids under a collection path
    pub async fn ids(&self, collection: &str) -> Vec<String> {
        let docs = self.docs.lock().await;
        docs.keys()
            .filter(|(c, _)| c == collection)
            .map(|(_, id)| id.clone())
            .collect()
    }

    /// Whether `needle` appears in any collection path, document id or
    /// string value anywhere in the store
    pub async fn contains_text(&self, needle: &str) -> bool {
        let docs = self.docs.lock().await;
        docs.iter().any(|((collection, id), value)| {
            collection.contains(needle) || id.contains(needle) || value_contains(value, needle)
        })
    }
}

fn value_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(inner) => inner.contains(needle),
        Value::Array(items) => items.iter().any(|item| value_contains(item, needle)),
        Value::Object(map) => map
            .iter()
            .any(|(key, item)| key.contains(needle) || value_contains(item, needle)),
        _ => false,
    }
}

fn merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (dst, src) => *dst = src,
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let docs = self.docs.lock().await;
        Ok(docs.get(&(collection.to_owned(), id.to_owned())).cloned())
    }

    async fn upsert_merge(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().await;
        let key = (collection.to_owned(), id.to_owned());

        match docs.get_mut(&key) {
            Some(existing) => merge(existing, fields),
            None => {
                docs.insert(key, fields);
            }
        }

        Ok(())
    }

    async fn set_nested(
        &self,
        collection: &str,
        parent: &str,
        subcollection: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().await;
        let key = (nested_path(collection, parent, subcollection), id.to_owned());
        docs.insert(key, fields);

        Ok(())
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
        // the lock spans read and write: serializable by construction
        let mut docs = self.docs.lock().await;
        let key = (collection.to_owned(), id.to_owned());

        let current = docs.get(&key).cloned();
        let next = apply(current)?;
        docs.insert(key, next);

        Ok(())
    }
}

//! Document store.
//!
//! All application data lives in named collections of JSON documents, the
//! shape the storefront and admin both read and write. Two backends sit
//! behind the same handle:
//!
//! - [`PgDocumentStore`] keeps documents in a `PostgreSQL` JSONB table and
//!   fans out change notifications with `LISTEN/NOTIFY`.
//! - [`MemoryDocumentStore`] keeps everything in process; used by tests and
//!   local development.
//!
//! Nested collections are plain path strings, e.g. `carts/{uid}/items`.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = DocumentStore::memory();
//! let id = store.add("orders", json!({"status": "pending"})).await?;
//! let pending = store
//!     .query(&Query::collection("orders").where_eq("status", "pending"))
//!     .await?;
//! ```

mod memory;
mod postgres;
mod query;
mod subscription;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use query::{Direction, Filter, OrderBy, Query};
pub use subscription::Subscription;

/// Errors raised by the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// `update` targeted a document that does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Collection path, id or field name is unusable.
    #[error("invalid {kind}: {value:?}")]
    Invalid { kind: &'static str, value: String },

    /// Documents must be JSON objects.
    #[error("document is not a JSON object")]
    NotAnObject,
}

/// A stored document and its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Decode into a model, with the document id injected as `id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the fields do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut data = self.data.clone();
        if let Value::Object(fields) = &mut data {
            fields
                .entry("id")
                .or_insert_with(|| Value::String(self.id.clone()));
        }
        Ok(serde_json::from_value(data)?)
    }
}

/// Change notification emitted on every write.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: String,
}

/// Handle to whichever backend is configured.
///
/// Cheap to clone; both backends share their state behind `Arc`s.
#[derive(Clone)]
pub enum DocumentStore {
    Postgres(PgDocumentStore),
    Memory(MemoryDocumentStore),
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres(_) => f.write_str("DocumentStore::Postgres"),
            Self::Memory(_) => f.write_str("DocumentStore::Memory"),
        }
    }
}

impl DocumentStore {
    /// A fresh in-process store.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryDocumentStore::new())
    }

    /// Fetch one document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        validate_path(collection)?;
        validate_id(id)?;
        match self {
            Self::Postgres(store) => store.get(collection, id).await,
            Self::Memory(store) => Ok(store.get(collection, id).await),
        }
    }

    /// Write a document, replacing any existing one with the same id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the value is not an object or the backend fails.
    pub async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        validate_path(collection)?;
        validate_id(id)?;
        let data = strip_id(data)?;
        match self {
            Self::Postgres(store) => store.set(collection, id, data).await,
            Self::Memory(store) => {
                store.set(collection, id, data).await;
                Ok(())
            }
        }
    }

    /// Write a document only if its id is unused.
    ///
    /// Returns `false` (and writes nothing) when the id already exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the value is not an object or the backend fails.
    pub async fn create(&self, collection: &str, id: &str, data: Value) -> Result<bool, StoreError> {
        validate_path(collection)?;
        validate_id(id)?;
        let data = strip_id(data)?;
        match self {
            Self::Postgres(store) => store.create(collection, id, data).await,
            Self::Memory(store) => Ok(store.create(collection, id, data).await),
        }
    }

    /// Insert a document under a generated id and return the id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the value is not an object or the backend fails.
    pub async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.set(collection, &id, data).await?;
        Ok(id)
    }

    /// Merge top-level fields into an existing document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the document does not exist.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        validate_path(collection)?;
        validate_id(id)?;
        let updated = match self {
            Self::Postgres(store) => store.update(collection, id, fields).await?,
            Self::Memory(store) => store.update(collection, id, fields).await,
        };
        if updated {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            })
        }
    }

    /// Delete a document. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        validate_path(collection)?;
        validate_id(id)?;
        match self {
            Self::Postgres(store) => store.delete(collection, id).await,
            Self::Memory(store) => Ok(store.delete(collection, id).await),
        }
    }

    /// Run a query.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query is malformed or the backend fails.
    pub async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        query.validate()?;
        match self {
            Self::Postgres(store) => store.query(query).await,
            Self::Memory(store) => Ok(store.query(query).await),
        }
    }

    /// Watch a query. The subscription yields the full result set once
    /// immediately and again after every write to the collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query is malformed.
    pub fn subscribe(&self, query: Query) -> Result<Subscription, StoreError> {
        query.validate()?;
        let changes = match self {
            Self::Postgres(store) => store.changes(),
            Self::Memory(store) => store.changes(),
        };
        Ok(Subscription::spawn(self.clone(), query, changes))
    }

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be reached.
    pub async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Self::Postgres(store) => store.ping().await,
            Self::Memory(_) => Ok(()),
        }
    }

    // Typed helpers

    /// Fetch and decode one document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails or decoding fails.
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        self.get(collection, id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// Encode and write one document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if encoding or the backend fails.
    pub async fn set_as<T: Serialize + Sync>(
        &self,
        collection: &str,
        id: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        self.set(collection, id, serde_json::to_value(value)?).await
    }

    /// Run a query and decode every result.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails or any document fails to decode.
    pub async fn query_as<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, StoreError> {
        self.query(query)
            .await?
            .iter()
            .map(Document::decode)
            .collect()
    }
}

/// Documents are objects; a stored `id` field would shadow the key.
fn strip_id(data: Value) -> Result<Value, StoreError> {
    match data {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(Value::Object(fields))
        }
        _ => Err(StoreError::NotAnObject),
    }
}

/// Collection paths alternate collection and document segments, starting and
/// ending with a collection: `orders`, `carts/{uid}/items`.
pub(crate) fn validate_path(path: &str) -> Result<(), StoreError> {
    let segments: Vec<&str> = path.split('/').collect();
    let valid = segments.len() % 2 == 1 && segments.iter().all(|s| is_valid_segment(s));
    if valid {
        Ok(())
    } else {
        Err(StoreError::Invalid {
            kind: "collection path",
            value: path.to_owned(),
        })
    }
}

fn validate_id(id: &str) -> Result<(), StoreError> {
    if is_valid_segment(id) {
        Ok(())
    } else {
        Err(StoreError::Invalid {
            kind: "document id",
            value: id.to_owned(),
        })
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= 256
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'@' | b'+'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("orders").is_ok());
        assert!(validate_path("carts/abc123/items").is_ok());
        assert!(validate_path("carts/abc123").is_err());
        assert!(validate_path("").is_err());
        assert!(validate_path("orders/../users").is_err());
        assert!(validate_path("orders; drop").is_err());
    }

    #[test]
    fn test_decode_injects_id() {
        #[derive(serde::Deserialize)]
        struct Named {
            id: String,
            name: String,
        }

        let doc = Document {
            id: "p1".to_string(),
            data: json!({"name": "Yarn"}),
        };
        let named: Named = doc.decode().unwrap();
        assert_eq!(named.id, "p1");
        assert_eq!(named.name, "Yarn");
    }

    #[tokio::test]
    async fn test_non_object_rejected() {
        let store = DocumentStore::memory();
        let result = store.set("products", "p1", json!([1, 2, 3])).await;
        assert!(matches!(result, Err(StoreError::NotAnObject)));
    }

    #[tokio::test]
    async fn test_stored_id_field_is_dropped() {
        let store = DocumentStore::memory();
        store
            .set("products", "p1", json!({"id": "other", "name": "Yarn"}))
            .await
            .unwrap();
        let doc = store.get("products", "p1").await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"name": "Yarn"}));
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = DocumentStore::memory();
        let result = store.update("orders", "nope", Map::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_is_insert_if_absent() {
        let store = DocumentStore::memory();
        assert!(store.create("ratings", "u_p", json!({"score": 4})).await.unwrap());
        assert!(!store.create("ratings", "u_p", json!({"score": 1})).await.unwrap());
        let doc = store.get("ratings", "u_p").await.unwrap().unwrap();
        assert_eq!(doc.data["score"], 4);
    }
}

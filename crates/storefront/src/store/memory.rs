//! In-process backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};
use tokio::sync::{RwLock, broadcast};

use super::query::compare_values;
use super::{ChangeEvent, Direction, Document, Query};

const CHANGE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct Stored {
    data: Value,
    /// Insertion sequence; the default result order.
    seq: u64,
}

/// Documents held in memory, keyed by collection path then id.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<Inner>,
}

struct Inner {
    collections: RwLock<HashMap<String, HashMap<String, Stored>>>,
    next_seq: AtomicU64,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
                changes,
            }),
        }
    }

    pub(super) fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.changes.subscribe()
    }

    fn notify(&self, collection: &str, id: &str) {
        // No receivers is fine.
        let _ = self.inner.changes.send(ChangeEvent {
            collection: collection.to_owned(),
            id: id.to_owned(),
        });
    }

    pub(super) async fn get(&self, collection: &str, id: &str) -> Option<Document> {
        let collections = self.inner.collections.read().await;
        collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| Document {
                id: id.to_owned(),
                data: stored.data.clone(),
            })
    }

    pub(super) async fn set(&self, collection: &str, id: &str, data: Value) {
        {
            let mut collections = self.inner.collections.write().await;
            let docs = collections.entry(collection.to_owned()).or_default();
            let seq = docs
                .get(id)
                .map_or_else(|| self.inner.next_seq.fetch_add(1, Ordering::Relaxed), |s| s.seq);
            docs.insert(id.to_owned(), Stored { data, seq });
        }
        self.notify(collection, id);
    }

    pub(super) async fn create(&self, collection: &str, id: &str, data: Value) -> bool {
        {
            let mut collections = self.inner.collections.write().await;
            let docs = collections.entry(collection.to_owned()).or_default();
            if docs.contains_key(id) {
                return false;
            }
            let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
            docs.insert(id.to_owned(), Stored { data, seq });
        }
        self.notify(collection, id);
        true
    }

    pub(super) async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> bool {
        {
            let mut collections = self.inner.collections.write().await;
            let Some(stored) = collections.get_mut(collection).and_then(|d| d.get_mut(id)) else {
                return false;
            };
            if let Value::Object(existing) = &mut stored.data {
                existing.extend(fields);
            }
        }
        self.notify(collection, id);
        true
    }

    pub(super) async fn delete(&self, collection: &str, id: &str) -> bool {
        let removed = {
            let mut collections = self.inner.collections.write().await;
            collections
                .get_mut(collection)
                .and_then(|docs| docs.remove(id))
                .is_some()
        };
        if removed {
            self.notify(collection, id);
        }
        removed
    }

    pub(super) async fn query(&self, query: &Query) -> Vec<Document> {
        let collections = self.inner.collections.read().await;
        let Some(docs) = collections.get(&query.collection) else {
            return Vec::new();
        };

        let mut hits: Vec<(&String, &Stored)> = docs
            .iter()
            .filter(|(_, stored)| query.matches(&stored.data))
            .collect();

        hits.sort_by(|(_, a), (_, b)| match &query.order_by {
            Some(order) => {
                let ord = compare_values(a.data.get(&order.field), b.data.get(&order.field))
                    .then(a.seq.cmp(&b.seq));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            }
            None => a.seq.cmp(&b.seq),
        });

        hits.into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(id, stored)| Document {
                id: id.clone(),
                data: stored.data.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_query_filters_orders_and_limits() {
        let store = MemoryDocumentStore::new();
        store.set("orders", "a", json!({"userId": "u1", "createdAt": 3})).await;
        store.set("orders", "b", json!({"userId": "u2", "createdAt": 2})).await;
        store.set("orders", "c", json!({"userId": "u1", "createdAt": 1})).await;
        store.set("orders", "d", json!({"userId": "u1", "createdAt": 5})).await;

        let query = Query::collection("orders")
            .where_eq("userId", "u1")
            .order_by("createdAt", Direction::Descending)
            .limit(2);
        let ids: Vec<String> = store.query(&query).await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["d", "a"]);
    }

    #[tokio::test]
    async fn test_update_merges_top_level_fields() {
        let store = MemoryDocumentStore::new();
        store
            .set("orders", "o1", json!({"status": "pending", "total": "250"}))
            .await;
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("shipped"));
        assert!(store.update("orders", "o1", fields).await);

        let doc = store.get("orders", "o1").await.unwrap();
        assert_eq!(doc.data, json!({"status": "shipped", "total": "250"}));
    }

    #[tokio::test]
    async fn test_nested_collections_are_separate() {
        let store = MemoryDocumentStore::new();
        store.set("carts/u1/items", "p1", json!({"quantity": 1})).await;
        store.set("carts/u2/items", "p1", json!({"quantity": 7})).await;

        let u1 = store.query(&Query::collection("carts/u1/items")).await;
        assert_eq!(u1.len(), 1);
        assert_eq!(u1[0].data["quantity"], 1);
    }

    #[tokio::test]
    async fn test_writes_emit_changes() {
        let store = MemoryDocumentStore::new();
        let mut changes = store.changes();
        store.set("orders", "o1", json!({})).await;
        assert!(store.delete("orders", "o1").await);
        assert!(!store.delete("orders", "o1").await);

        assert_eq!(changes.recv().await.unwrap().id, "o1");
        assert_eq!(changes.recv().await.unwrap().id, "o1");
        assert!(changes.try_recv().is_err());
    }
}

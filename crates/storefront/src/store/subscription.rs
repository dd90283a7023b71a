//! Live query results.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::{ChangeEvent, Document, DocumentStore, Query};

const SNAPSHOT_BUFFER: usize = 8;

/// A running watch on a query.
///
/// Yields the full result set on start and after each write to the watched
/// collection. Dropping the subscription (or calling [`unsubscribe`]) stops
/// the background task.
///
/// [`unsubscribe`]: Subscription::unsubscribe
pub struct Subscription {
    snapshots: mpsc::Receiver<Vec<Document>>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(super) fn spawn(
        store: DocumentStore,
        query: Query,
        changes: broadcast::Receiver<ChangeEvent>,
    ) -> Self {
        let (tx, snapshots) = mpsc::channel(SNAPSHOT_BUFFER);
        let task = tokio::spawn(watch(store, query, changes, tx));
        Self { snapshots, task }
    }

    /// Wait for the next result set. `None` once the store shuts down.
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        self.snapshots.recv().await
    }

    /// Stop watching.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn watch(
    store: DocumentStore,
    query: Query,
    mut changes: broadcast::Receiver<ChangeEvent>,
    tx: mpsc::Sender<Vec<Document>>,
) {
    if !deliver(&store, &query, &tx).await {
        return;
    }

    loop {
        match changes.recv().await {
            Ok(event) if event.collection == query.collection => {}
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, collection = %query.collection, "Subscription lagged");
            }
            Err(RecvError::Closed) => return,
        }
        if !deliver(&store, &query, &tx).await {
            return;
        }
    }
}

/// Send a fresh snapshot. Returns `false` once nobody is listening.
async fn deliver(store: &DocumentStore, query: &Query, tx: &mpsc::Sender<Vec<Document>>) -> bool {
    match store.query(query).await {
        Ok(docs) => tx.send(docs).await.is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, collection = %query.collection, "Subscription query failed");
            !tx.is_closed()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_initial_snapshot_then_updates() {
        let store = DocumentStore::memory();
        store.set("orders", "o1", json!({"status": "pending"})).await.unwrap();

        let mut sub = store.subscribe(Query::collection("orders")).unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 1);

        store.set("orders", "o2", json!({"status": "pending"})).await.unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_other_collections_do_not_wake() {
        let store = DocumentStore::memory();
        let mut sub = store.subscribe(Query::collection("orders")).unwrap();
        assert!(sub.next().await.unwrap().is_empty());

        store.set("products", "p1", json!({})).await.unwrap();
        let next = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(next.is_err());
    }
}

//! `PostgreSQL` backend.
//!
//! Documents live in a single `documents` table keyed by
//! `(collection, id)` with a JSONB body. A row trigger publishes every write
//! on the `document_changes` channel; one listener task per store forwards
//! those notifications to subscriptions.

use std::time::Duration;

use serde_json::{Map, Value};
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tokio::sync::broadcast;

use super::{ChangeEvent, Document, Query, StoreError};

/// Notification channel written by the `documents` trigger.
pub const CHANGE_CHANNEL: &str = "document_changes";

const CHANGE_CAPACITY: usize = 1024;
const LISTEN_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(FromRow)]
struct DocumentRow {
    id: String,
    data: Json<Value>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            data: row.data.0,
        }
    }
}

/// Documents in `PostgreSQL`.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl PgDocumentStore {
    /// Wrap a pool and start listening for change notifications.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the listener connection cannot be
    /// opened.
    pub async fn connect(pool: PgPool) -> Result<Self, StoreError> {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);

        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        tokio::spawn(forward_notifications(listener, changes.clone()));

        Ok(Self { pool, changes })
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(super) fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    pub(super) async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub(super) async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    pub(super) async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(data))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub(super) async fn create(&self, collection: &str, id: &str, data: Value) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO NOTHING
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(data))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub(super) async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        // `||` merges top-level keys, right side wins.
        let result = sqlx::query(
            r"
            UPDATE documents
            SET data = data || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub(super) async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub(super) async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut builder = build_select(query);
        let rows = builder
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }
}

fn build_select(query: &Query) -> QueryBuilder<'static, Postgres> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT id, data FROM documents WHERE collection = ");
    builder.push_bind(query.collection.clone());

    for filter in &query.filters {
        builder.push(" AND data -> ");
        builder.push_bind(filter.field.clone());
        builder.push("::text = ");
        builder.push_bind(Json(filter.value.clone()));
        builder.push("::jsonb");
    }

    match &query.order_by {
        Some(order) => {
            builder.push(" ORDER BY data -> ");
            builder.push_bind(order.field.clone());
            builder.push("::text");
            builder.push(order.direction.sql());
            builder.push(", created_at");
        }
        None => {
            builder.push(" ORDER BY created_at, id");
        }
    }

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }

    builder
}

async fn forward_notifications(mut listener: PgListener, changes: broadcast::Sender<ChangeEvent>) {
    loop {
        match listener.recv().await {
            Ok(notification) => {
                match serde_json::from_str::<ChangeEvent>(notification.payload()) {
                    Ok(event) => {
                        let _ = changes.send(event);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, payload = notification.payload(), "Malformed change notification");
                    }
                }
            }
            Err(e) => {
                // PgListener reconnects on the next recv.
                tracing::warn!(error = %e, "Change listener error, retrying");
                tokio::time::sleep(LISTEN_RETRY_DELAY).await;
            }
        }
    }
}

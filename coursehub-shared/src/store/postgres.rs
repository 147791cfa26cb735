/// PostgreSQL document store
///
/// Stores every collection in the single `documents` table created by the
/// embedded migrations. Document bodies are JSONB; natural order is the
/// insertion sequence (`seq`).
///
/// # Transactions
///
/// `atomic_batch` runs inside one transaction. Rows read for `Update` and
/// `Expect` are locked with `SELECT ... FOR UPDATE`, so two batches touching
/// the same document serialize. Dropping the transaction on any error rolls
/// back every staged write.
///
/// # Example
///
/// ```no_run
/// use coursehub_shared::db::pool::{create_pool, DatabaseConfig};
/// use coursehub_shared::store::postgres::PgDocumentStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgDocumentStore::new(pool);
/// store.migrate().await?;
/// # Ok(())
/// # }
/// ```

use super::{BatchOp, Document, DocumentStore, Filter, Patch, Record, StoreError, StoreResult};
use crate::db::{migrations, pool};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

/// [`DocumentStore`] backed by PostgreSQL JSONB rows
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        PgDocumentStore { pool }
    }

    /// Applies pending schema migrations
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        migrations::run_migrations(&self.pool).await
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_document(collection: &str, id: Uuid, value: Value) -> StoreResult<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!(
            "document {}/{} is not an object: {}",
            collection, id, other
        ))),
    }
}

async fn lock_document(
    conn: &mut PgConnection,
    collection: &str,
    id: Uuid,
) -> StoreResult<Document> {
    let row: Option<(Json<Value>,)> = sqlx::query_as(
        "SELECT data FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
    )
    .bind(collection)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some((Json(value),)) => into_document(collection, id, value),
        None => Err(StoreError::NotFound {
            collection: collection.to_string(),
            id,
        }),
    }
}

async fn apply_op(conn: &mut PgConnection, op: BatchOp) -> StoreResult<()> {
    match op {
        BatchOp::Create {
            collection,
            id,
            mut data,
        } => {
            data.remove("id");
            sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
                .bind(&collection)
                .bind(id)
                .bind(Json(Value::Object(data)))
                .execute(&mut *conn)
                .await?;
        }
        BatchOp::Update {
            collection,
            id,
            patch,
        } => {
            let mut data = lock_document(conn, &collection, id).await?;
            patch.apply(&mut data)?;

            sqlx::query(
                "UPDATE documents SET data = $3, updated_at = NOW()
                 WHERE collection = $1 AND id = $2",
            )
            .bind(&collection)
            .bind(id)
            .bind(Json(Value::Object(data)))
            .execute(&mut *conn)
            .await?;
        }
        BatchOp::Delete { collection, id } => {
            sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                .bind(&collection)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        BatchOp::Expect {
            collection,
            id,
            field,
            value,
        } => {
            let data = lock_document(conn, &collection, id).await?;
            if data.get(&field) != Some(&value) {
                return Err(StoreError::Conflict(format!(
                    "precondition failed on {}/{}: {} != {}",
                    collection, id, field, value
                )));
            }
        }
    }

    Ok(())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn query(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<Record>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, data FROM documents WHERE collection = ");
        builder.push_bind(collection);

        for filter in filters {
            builder.push(" AND data -> ");
            builder.push_bind(filter.field.clone());
            builder.push(" = ");
            builder.push_bind(Json(filter.value.clone()));
        }
        builder.push(" ORDER BY seq");

        let rows: Vec<(Uuid, Json<Value>)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(id, Json(value))| {
                Ok(Record {
                    id,
                    data: into_document(collection, id, value)?,
                })
            })
            .collect()
    }

    async fn get(&self, collection: &str, id: Uuid) -> StoreResult<Option<Record>> {
        let row: Option<(Json<Value>,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(Json(value),)| {
            Ok(Record {
                id,
                data: into_document(collection, id, value)?,
            })
        })
        .transpose()
    }

    async fn create(&self, collection: &str, data: Document) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        let mut conn = self.pool.acquire().await?;
        apply_op(
            &mut conn,
            BatchOp::Create {
                collection: collection.to_string(),
                id,
                data,
            },
        )
        .await?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Patch) -> StoreResult<()> {
        self.atomic_batch(vec![BatchOp::update(collection, id, patch)])
            .await
    }

    async fn delete(&self, collection: &str, id: Uuid) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        apply_op(
            &mut conn,
            BatchOp::Delete {
                collection: collection.to_string(),
                id,
            },
        )
        .await
    }

    async fn atomic_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        let op_count = ops.len();
        let mut tx = self.pool.begin().await?;

        for op in ops {
            // Early return drops `tx`, which rolls back
            apply_op(&mut tx, op).await?;
        }

        tx.commit().await?;
        tracing::debug!(op_count, "Committed atomic batch");
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        pool::health_check(&self.pool).await?;
        Ok(())
    }
}

//! PostgreSQL document store.
//!
//! All collections share one table:
//!
//! ```sql
//! CREATE TABLE documents (
//!     collection TEXT  NOT NULL,
//!     doc_key    TEXT  NOT NULL,   -- JSON text of body->'_id'
//!     body       JSONB NOT NULL,
//!     seq        BIGSERIAL,        -- insertion order for unsorted finds
//!     PRIMARY KEY (collection, doc_key)
//! );
//! ```
//!
//! Equality filters become JSONB containment (`body @> $filter`), sorting
//! uses JSONB ordering of `body -> field` (numbers compare numerically), and
//! counters are bumped with a single `INSERT .. ON CONFLICT DO UPDATE`, which
//! Postgres executes atomically per row.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{check_name, Document, DocumentStore, Filter, ID_FIELD};
use crate::shared::error::StoreError;

/// Prefix of the unique indexes created by [`PgDocumentStore::create_unique_index`].
const UNIQUE_INDEX_PREFIX: &str = "uq_";

/// Primary key constraint of the `documents` table.
const PRIMARY_KEY_CONSTRAINT: &str = "documents_pkey";

/// PostgreSQL document store.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Create a store over an existing pool. The `documents` table must exist
    /// (see [`run_migrations`](crate::infrastructure::database::run_migrations)).
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `doc_key` column value for a primary key.
fn doc_key(id: &Value) -> String {
    id.to_string()
}

fn unique_index_name(collection: &str, field: &str) -> String {
    format!("{}{}__{}", UNIQUE_INDEX_PREFIX, collection, field)
}

/// Map a sqlx error to the store taxonomy.
///
/// Unique violations become `DuplicateKey` with the field recovered from the
/// constraint name; anything else means the store did not do the work.
fn map_error(collection: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(PRIMARY_KEY_CONSTRAINT) | None => ID_FIELD.to_string(),
                Some(name) => name
                    .strip_prefix(UNIQUE_INDEX_PREFIX)
                    .and_then(|rest| rest.split_once("__"))
                    .map(|(_, field)| field.to_string())
                    .unwrap_or_else(|| name.to_string()),
            };
            return StoreError::DuplicateKey {
                collection: collection.to_string(),
                field,
            };
        }
    }
    StoreError::Unavailable(err.to_string())
}

fn into_document(collection: &str, body: Json<Value>) -> Result<Document, StoreError> {
    match body.0 {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed {
            collection: collection.to_string(),
            reason: format!("expected an object, found {}", other),
        }),
    }
}

fn filter_json(filter: &Filter) -> Json<Value> {
    Json(Value::Object(filter.as_document().clone()))
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let body = sqlx::query_scalar::<_, Json<Value>>(
            r#"
            SELECT body
            FROM documents
            WHERE collection = $1 AND body @> $2
            LIMIT 1
            "#,
        )
        .bind(collection)
        .bind(filter_json(filter))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_error(collection, e))?;

        body.map(|b| into_document(collection, b)).transpose()
    }

    async fn find_one_and_increment(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        by: i64,
    ) -> Result<Document, StoreError> {
        let body = sqlx::query_scalar::<_, Json<Value>>(
            r#"
            INSERT INTO documents (collection, doc_key, body)
            VALUES ($1, $2, jsonb_build_object('_id', $3::text, $4::text, $5::bigint))
            ON CONFLICT (collection, doc_key) DO UPDATE
            SET body = documents.body || jsonb_build_object(
                $4::text,
                COALESCE((documents.body ->> $4::text)::bigint, 0) + $5::bigint
            )
            RETURNING body
            "#,
        )
        .bind(collection)
        .bind(doc_key(&Value::from(key)))
        .bind(key)
        .bind(field)
        .bind(by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_error(collection, e))?;

        into_document(collection, body)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        let key = document
            .get(ID_FIELD)
            .map(doc_key)
            .ok_or_else(|| StoreError::MissingKey {
                collection: collection.to_string(),
            })?;

        sqlx::query("INSERT INTO documents (collection, doc_key, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(key)
            .bind(Json(Value::Object(document)))
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        Ok(())
    }

    async fn update_one(&self, collection: &str, filter: &Filter, mut set: Document) -> Result<u64, StoreError> {
        set.remove(ID_FIELD);

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = body || $3
            WHERE collection = $1
              AND doc_key = (
                  SELECT doc_key FROM documents
                  WHERE collection = $1 AND body @> $2
                  LIMIT 1
              )
            "#,
        )
        .bind(collection)
        .bind(filter_json(filter))
        .bind(Json(Value::Object(set)))
        .execute(&self.pool)
        .await
        .map_err(|e| map_error(collection, e))?;

        Ok(result.rows_affected())
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE collection = $1
              AND doc_key = (
                  SELECT doc_key FROM documents
                  WHERE collection = $1 AND body @> $2
                  LIMIT 1
              )
            "#,
        )
        .bind(collection)
        .bind(filter_json(filter))
        .execute(&self.pool)
        .await
        .map_err(|e| map_error(collection, e))?;

        Ok(result.rows_affected())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort_ascending: Option<&'static str>,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let bodies = match sort_ascending {
            Some(field) => {
                sqlx::query_scalar::<_, Json<Value>>(
                    r#"
                    SELECT body
                    FROM documents
                    WHERE collection = $1 AND body @> $2
                    ORDER BY body -> $3::text ASC NULLS FIRST, seq ASC
                    LIMIT $4
                    "#,
                )
                .bind(collection)
                .bind(filter_json(filter))
                .bind(field)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_scalar::<_, Json<Value>>(
                    r#"
                    SELECT body
                    FROM documents
                    WHERE collection = $1 AND body @> $2
                    ORDER BY seq ASC
                    LIMIT $3
                    "#,
                )
                .bind(collection)
                .bind(filter_json(filter))
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| map_error(collection, e))?;

        bodies
            .into_iter()
            .map(|b| into_document(collection, b))
            .collect()
    }

    async fn create_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        check_name(collection)?;
        check_name(field)?;

        // DDL cannot take bind parameters; both names were checked above.
        let statement = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {index} ON documents ((body ->> '{field}')) \
             WHERE collection = '{collection}'",
            index = unique_index_name(collection, field),
            field = field,
            collection = collection,
        );

        sqlx::query(&statement)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        tracing::debug!(collection, field, "Unique index ensured");
        Ok(())
    }
}

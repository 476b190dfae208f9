//! Postgres-backed document store.
//!
//! Bodies live in a JSONB column; unique keys live in a side table whose
//! primary key enforces uniqueness, so a collision surfaces as Postgres error
//! `23505` and is mapped to [`StoreError::Duplicate`].
//!
//! Writes that touch keys run in one transaction. Each write bumps the
//! `revision` column, and conditional replaces compare against it. Listing
//! loads the collection and leaves filtering/sorting to the shared query
//! executor, which keeps results identical to the in-memory store.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use tourbook_core::UniqueKey;

use super::{Document, DocumentStore, Revisioned, StoreError};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT        NOT NULL,
    id          UUID        NOT NULL,
    body        JSONB       NOT NULL,
    revision    BIGINT      NOT NULL DEFAULT 0,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (collection, id)
);

ALTER TABLE documents ADD COLUMN IF NOT EXISTS revision BIGINT NOT NULL DEFAULT 0;

CREATE TABLE IF NOT EXISTS document_keys (
    collection  TEXT NOT NULL,
    field       TEXT NOT NULL,
    value       TEXT NOT NULL,
    document_id UUID NOT NULL,
    PRIMARY KEY (collection, field, value),
    FOREIGN KEY (collection, document_id)
        REFERENCES documents (collection, id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS document_keys_owner_idx
    ON document_keys (collection, document_id);
"#;

#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e, None))?;
        Ok(Self::new(pool))
    }

    /// Create tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e, None))?;
        Ok(())
    }
}

impl PostgresDocumentStore {
    /// Overwrite a document, optionally only while it is still at `expected`.
    #[instrument(skip(self, doc), fields(id = %doc.id), err)]
    async fn overwrite(
        &self,
        collection: &str,
        doc: Document,
        expected: Option<i64>,
    ) -> Result<bool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("replace", e, None))?;

        let updated = sqlx::query(
            r#"
            UPDATE documents
            SET body = $3, revision = revision + 1, updated_at = now()
            WHERE collection = $1 AND id = $2 AND ($4::BIGINT IS NULL OR revision = $4)
            "#,
        )
        .bind(collection)
        .bind(doc.id)
        .bind(Json(&doc.body))
        .bind(expected)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("replace", e, None))?;

        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM document_keys WHERE collection = $1 AND document_id = $2")
            .bind(collection)
            .bind(doc.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("replace", e, None))?;

        claim_keys(&mut tx, collection, &doc).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("replace", e, None))?;
        Ok(true)
    }
}

async fn claim_keys(
    tx: &mut Transaction<'_, Postgres>,
    collection: &str,
    doc: &Document,
) -> Result<(), StoreError> {
    for key in &doc.unique_keys {
        sqlx::query(
            "INSERT INTO document_keys (collection, field, value, document_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(collection)
        .bind(key.field)
        .bind(&key.value)
        .bind(doc.id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("claim_keys", e, Some(key)))?;
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self, doc), fields(id = %doc.id), err)]
    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert", e, None))?;

        let id_key = UniqueKey::new("id", doc.id.to_string());
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(doc.id)
            .bind(Json(&doc.body))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert", e, Some(&id_key)))?;

        claim_keys(&mut tx, collection, &doc).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert", e, None))
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError> {
        let body: Option<Json<Value>> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("get", e, None))?;
        Ok(body.map(|Json(v)| v))
    }

    async fn get_revisioned(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Revisioned>, StoreError> {
        let row: Option<(Json<Value>, i64)> = sqlx::query_as(
            "SELECT body, revision FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_revisioned", e, None))?;
        Ok(row.map(|(Json(body), revision)| Revisioned { body, revision }))
    }

    async fn find_by_key(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Value>, StoreError> {
        let body: Option<Json<Value>> = sqlx::query_scalar(
            r#"
            SELECT d.body
            FROM document_keys k
            JOIN documents d ON d.collection = k.collection AND d.id = k.document_id
            WHERE k.collection = $1 AND k.field = $2 AND k.value = $3
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_key", e, None))?;
        Ok(body.map(|Json(v)| v))
    }

    async fn replace(&self, collection: &str, doc: Document) -> Result<bool, StoreError> {
        self.overwrite(collection, doc, None).await
    }

    async fn replace_if(
        &self,
        collection: &str,
        doc: Document,
        revision: i64,
    ) -> Result<bool, StoreError> {
        self.overwrite(collection, doc, Some(revision)).await
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let deleted = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e, None))?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let bodies: Vec<Json<Value>> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = $1 ORDER BY id")
                .bind(collection)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("scan", e, None))?;
        Ok(bodies.into_iter().map(|Json(v)| v).collect())
    }
}

/// Map sqlx errors; a unique violation is attributed to `key` when given.
fn map_sqlx_error(operation: &str, err: sqlx::Error, key: Option<&UniqueKey>) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            if let Some(key) = key {
                return StoreError::Duplicate {
                    field: key.field.to_string(),
                    value: key.value.clone(),
                };
            }
        }
    }
    StoreError::Backend(format!("{operation}: {err}"))
}

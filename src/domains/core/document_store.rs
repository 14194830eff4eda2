use crate::errors::{DbError, DomainError, DomainResult, ValidationError};
use crate::domains::core::repository::{Document, EntityStore};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{query, query_as, FromRow, SqlitePool};

/// Raw row of the `documents` table
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    body: String,
}

impl DocumentRow {
    fn into_document(self) -> DomainResult<Document> {
        let fields = match serde_json::from_str::<Value>(&self.body).map_err(DbError::from)? {
            Value::Object(map) => map,
            other => {
                return Err(DbError::Json(format!(
                    "document {} body is not an object: {}",
                    self.id, other
                ))
                .into())
            }
        };
        Ok(Document { id: self.id, fields })
    }
}

fn db_err(e: sqlx::Error) -> DomainError {
    DomainError::Database(DbError::from_sqlx(e))
}

/// JSON path addressing a top-level field. SQLite path labels have no escape
/// syntax, so names containing a double quote cannot be addressed.
fn field_path(field: &str) -> Result<String, ValidationError> {
    if field.is_empty() {
        return Err(ValidationError::required("field"));
    }
    if field.contains('"') {
        return Err(ValidationError::invalid_value(
            "field",
            &format!("field name {:?} contains a double quote", field),
        ));
    }
    Ok(format!("$.\"{}\"", field))
}

/// SQLite implementation of EntityStore. Each collection is a partition of the `documents` table.
#[derive(Clone)]
pub struct SqliteEntityStore {
    pool: SqlitePool,
}

impl SqliteEntityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    async fn get(&self, collection: &str, id: &str) -> DomainResult<Document> {
        let row = query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = ? AND id = ?"
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| DomainError::EntityNotFound(collection.to_string(), id.to_string()))?;

        row.into_document()
    }

    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> DomainResult<Vec<Document>> {
        let sql = "SELECT id, body FROM documents WHERE collection = ? AND json_extract(body, ?) = ? ORDER BY id";
        let base = query_as::<_, DocumentRow>(sql)
            .bind(collection)
            .bind(field_path(field)?);

        // json_extract yields SQL scalars, so bind the matching scalar type
        let bound = match value {
            Value::String(s) => base.bind(s.clone()),
            Value::Bool(b) => base.bind(i64::from(*b)),
            Value::Number(n) if n.is_i64() => base.bind(n.as_i64()),
            Value::Number(n) => base.bind(n.as_f64()),
            other => {
                return Err(ValidationError::invalid_value(
                    field,
                    &format!("cannot query by non-scalar value {}", other),
                )
                .into())
            }
        };

        let rows = bound.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    async fn set(&self, collection: &str, document: &Document) -> DomainResult<()> {
        let body = serde_json::to_string(&document.fields).map_err(DbError::from)?;
        let now = Utc::now().to_rfc3339();

        query(
            "INSERT INTO documents (collection, id, body, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at"
        )
        .bind(collection)
        .bind(&document.id)
        .bind(body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> DomainResult<()> {
        let patch = serde_json::to_string(&fields).map_err(DbError::from)?;

        // json_patch merges in one statement; a null in the patch removes the field
        let result = query(
            "UPDATE documents SET body = json_patch(body, ?), updated_at = ? WHERE collection = ? AND id = ?"
        )
        .bind(patch)
        .bind(Utc::now().to_rfc3339())
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound(collection.to_string(), id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> DomainResult<()> {
        let result = query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound(collection.to_string(), id.to_string()));
        }
        Ok(())
    }
}

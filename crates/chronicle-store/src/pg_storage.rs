//! `PostgreSQL` implementation of the `StorageStrategy` trait.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{debug, warn};
use uuid::Uuid;

use chronicle_core::storage::{
    Document, ID_FIELD, IndexName, KeyRange, QueryResponse, REV_FIELD, StorageError,
    StorageStrategy,
};

use crate::schema;

/// SQLSTATE raised when the documents table has not been created.
const UNDEFINED_TABLE: &str = "42P01";

type DocumentRow = (String, String, Json<Value>);

/// PostgreSQL-backed document storage.
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Creates a new `PgStorage`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the documents table and its indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Backend` if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::raw_sql(schema::CREATE_DOCUMENTS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(StorageError::backend)?;
        debug!("documents schema ensured");
        Ok(())
    }
}

/// Re-attaches the storage-internal fields the way a document store returns
/// them.
fn into_document((id, rev, Json(mut body)): DocumentRow) -> Document {
    if let Some(fields) = body.as_object_mut() {
        fields.insert(ID_FIELD.to_owned(), Value::from(id));
        fields.insert(REV_FIELD.to_owned(), Value::from(rev));
    }
    body
}

fn is_undefined_table(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNDEFINED_TABLE)
}

#[async_trait]
impl StorageStrategy for PgStorage {
    async fn put(&self, key: &str, document: Document) -> Result<String, StorageError> {
        let rev = format!("1-{}", Uuid::new_v4().simple());
        let result = sqlx::query(schema::INSERT_DOCUMENT)
            .bind(key)
            .bind(&rev)
            .bind(Json(&document))
            .execute(&self.pool)
            .await
            .map_err(StorageError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(key.to_owned()));
        }
        Ok(key.to_owned())
    }

    async fn query(
        &self,
        index: IndexName,
        range: &KeyRange,
    ) -> Result<QueryResponse, StorageError> {
        let sql = match index {
            IndexName::Aggregate => schema::SELECT_BY_AGGREGATE,
            IndexName::Name => schema::SELECT_BY_NAME,
        };

        let rows = sqlx::query_as::<_, DocumentRow>(sql)
            .bind(Json(&range.prefix))
            .bind(range.start.to_string())
            .bind(range.end.to_string())
            .fetch_all(&self.pool)
            .await;

        match rows {
            Ok(rows) => Ok(QueryResponse::from_documents(
                rows.into_iter().map(into_document),
            )),
            Err(err) if is_undefined_table(&err) => {
                warn!(%index, "documents table missing; was the schema created?");
                Ok(QueryResponse::Error {
                    error: "not_found".to_owned(),
                    reason: Some(err.to_string()),
                })
            }
            Err(err) => Err(StorageError::backend(err)),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Document>, StorageError> {
        let row = sqlx::query_as::<_, DocumentRow>(schema::SELECT_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::backend)?;
        Ok(row.map(into_document))
    }
}

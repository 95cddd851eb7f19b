//! Test storages — mock `StorageStrategy` implementations for tests.

use std::io;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chronicle_core::memory::InMemoryStorage;
use chronicle_core::storage::{
    Document, IndexName, KeyRange, QueryResponse, StorageError, StorageStrategy,
};
use serde_json::Value;

fn connection_refused() -> StorageError {
    StorageError::backend(io::Error::new(
        io::ErrorKind::ConnectionRefused,
        "connection refused",
    ))
}

/// A storage whose every call fails with a backend error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingStorage;

#[async_trait]
impl StorageStrategy for FailingStorage {
    async fn put(&self, _key: &str, _document: Document) -> Result<String, StorageError> {
        Err(connection_refused())
    }

    async fn query(
        &self,
        _index: IndexName,
        _range: &KeyRange,
    ) -> Result<QueryResponse, StorageError> {
        Err(connection_refused())
    }

    async fn get(&self, _id: &str) -> Result<Option<Document>, StorageError> {
        Err(connection_refused())
    }
}

/// A storage that accepts writes but answers every query with an error
/// payload, the way a document store reports a missing view.
#[derive(Debug)]
pub struct ErrorPayloadStorage;

#[async_trait]
impl StorageStrategy for ErrorPayloadStorage {
    async fn put(&self, key: &str, _document: Document) -> Result<String, StorageError> {
        Ok(key.to_owned())
    }

    async fn query(
        &self,
        _index: IndexName,
        _range: &KeyRange,
    ) -> Result<QueryResponse, StorageError> {
        Ok(QueryResponse::Error {
            error: "not_found".to_owned(),
            reason: Some("missing_named_view".to_owned()),
        })
    }

    async fn get(&self, _id: &str) -> Result<Option<Document>, StorageError> {
        Ok(None)
    }
}

/// An in-memory storage whose queries can be delayed or failed per key
/// prefix. Records the order in which queries complete.
#[derive(Debug, Default)]
pub struct ScriptedStorage {
    inner: InMemoryStorage,
    delays: Vec<(Value, Duration)>,
    failing: Vec<Value>,
    completed: Mutex<Vec<Value>>,
}

impl ScriptedStorage {
    /// Creates a storage that behaves like a plain in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every query on `prefix` by `delay`.
    #[must_use]
    pub fn with_delay(mut self, prefix: impl Into<Value>, delay: Duration) -> Self {
        self.delays.push((prefix.into(), delay));
        self
    }

    /// Makes every query on `prefix` answer with an error payload.
    #[must_use]
    pub fn failing_on(mut self, prefix: impl Into<Value>) -> Self {
        self.failing.push(prefix.into());
        self
    }

    /// Returns the prefixes of finished queries, in completion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn completed_queries(&self) -> Vec<Value> {
        self.completed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl StorageStrategy for ScriptedStorage {
    async fn put(&self, key: &str, document: Document) -> Result<String, StorageError> {
        self.inner.put(key, document).await
    }

    async fn query(
        &self,
        index: IndexName,
        range: &KeyRange,
    ) -> Result<QueryResponse, StorageError> {
        if let Some((_, delay)) = self.delays.iter().find(|(p, _)| *p == range.prefix) {
            tokio::time::sleep(*delay).await;
        }

        let response = if self.failing.contains(&range.prefix) {
            QueryResponse::Error {
                error: "timeout".to_owned(),
                reason: Some(format!("query on {index} timed out")),
            }
        } else {
            self.inner.query(index, range).await?
        };

        self.completed.lock().unwrap_or_else(PoisonError::into_inner).push(range.prefix.clone());
        Ok(response)
    }

    async fn get(&self, id: &str) -> Result<Option<Document>, StorageError> {
        self.inner.get(id).await
    }
}

//! Storage strategy abstraction.
//!
//! The repository never talks to a database directly. It delegates to a
//! [`StorageStrategy`], which stores JSON documents under a key and serves
//! range queries over two composite indexes: `(aggregateId, time)` and
//! `(name, time)`. Only documents tagged `type = "event"` are indexed.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::EventTime;

/// A JSON document as held by the storage layer.
pub type Document = serde_json::Value;

/// Field holding the storage-assigned document identity.
pub const ID_FIELD: &str = "_id";

/// Field holding the storage-assigned document revision.
pub const REV_FIELD: &str = "_rev";

/// Secondary indexes every storage strategy must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexName {
    /// Keyed by `(aggregateId, time)`.
    Aggregate,
    /// Keyed by `(name, time)`.
    Name,
}

impl IndexName {
    /// Returns the stable name of the index.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aggregate => "aggregate",
            Self::Name => "name",
        }
    }

    /// Returns the document field that forms the first key component.
    #[must_use]
    pub fn key_field(self) -> &'static str {
        match self {
            Self::Aggregate => "aggregateId",
            Self::Name => "name",
        }
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive range over one prefix of a composite index key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRange {
    /// First key component (an aggregate id or an event name).
    pub prefix: serde_json::Value,
    /// Lowest `time` included.
    pub start: EventTime,
    /// Highest `time` included.
    pub end: EventTime,
}

impl KeyRange {
    /// Range covering the whole `time` domain for `prefix`.
    #[must_use]
    pub fn all(prefix: serde_json::Value) -> Self {
        Self::from_time(prefix, EventTime::MIN)
    }

    /// Range from `start` (inclusive) up to the upper sentinel.
    #[must_use]
    pub fn from_time(prefix: serde_json::Value, start: EventTime) -> Self {
        Self {
            prefix,
            start,
            end: EventTime::MAX,
        }
    }

    /// Returns `true` if the composite key `(prefix, time)` lies in range.
    #[must_use]
    pub fn contains(&self, prefix: &serde_json::Value, time: EventTime) -> bool {
        *prefix == self.prefix && self.start <= time && time <= self.end
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},\"{}\"]..[{},\"{}\"]",
            self.prefix, self.start, self.prefix, self.end
        )
    }
}

/// One row of an index range query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// The indexed document, possibly carrying storage-internal fields.
    pub value: Document,
}

/// Raw response of an index range query.
///
/// Mirrors the document-store wire format: either a list of rows or a
/// top-level error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResponse {
    /// The store refused or failed the query.
    Error {
        /// Short error code.
        error: String,
        /// Optional human-readable reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Matching rows in index order.
    Rows {
        /// Rows in ascending key order.
        rows: Vec<Row>,
    },
}

impl QueryResponse {
    /// Builds a row response from bare documents.
    #[must_use]
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        Self::Rows {
            rows: documents.into_iter().map(|value| Row { value }).collect(),
        }
    }
}

/// Errors raised by storage strategies.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A document already exists under the requested key.
    #[error("document conflict: {0}")]
    Conflict(String),

    /// A document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The underlying backend failed.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wraps a backend-specific error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Capability the repository needs from a document store.
#[async_trait]
pub trait StorageStrategy: Send + Sync {
    /// Persists `document` under `key` and returns the stored document id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `key` is already taken, or another
    /// `StorageError` if the document could not be written.
    async fn put(&self, key: &str, document: Document) -> Result<String, StorageError>;

    /// Range-queries `index`, inclusive of both ends of `range`, in ascending
    /// key order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query could not be issued. A store that
    /// answers with an error payload returns `Ok(QueryResponse::Error { .. })`.
    async fn query(&self, index: IndexName, range: &KeyRange)
    -> Result<QueryResponse, StorageError>;

    /// Fetches a document by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup could not be issued.
    async fn get(&self, id: &str) -> Result<Option<Document>, StorageError>;
}

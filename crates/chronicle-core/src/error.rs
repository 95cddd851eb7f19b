//! Repository error types.

use thiserror::Error;

use crate::event::AggregateId;
use crate::storage::{IndexName, StorageError};

/// Top-level error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The storage strategy did not persist an appended event.
    #[error("failed to persist event {name:?} for aggregate {aggregate_id}: {source}")]
    PersistenceFailed {
        /// Aggregate of the rejected event.
        aggregate_id: AggregateId,
        /// Name of the rejected event.
        name: String,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// An index query could not run or the store answered with an error payload.
    #[error("query on index {index} for key {key} failed: {reason}")]
    QueryFailed {
        /// Index that was queried.
        index: IndexName,
        /// First key component of the queried range.
        key: serde_json::Value,
        /// Error reported by the store.
        reason: String,
    },

    /// One stream of a multi-name read failed; no merged result is returned.
    #[error("stream {name:?} failed in a {streams}-stream read: {source}")]
    PartialFanInFailure {
        /// Name whose query failed.
        name: String,
        /// Number of streams that were being merged.
        streams: usize,
        /// The failing stream's error.
        #[source]
        source: Box<RepositoryError>,
    },

    /// A stored document did not decode into an event.
    #[error("malformed event document: {0}")]
    MalformedDocument(String),

    /// An event name was empty.
    #[error("invalid event name: {0:?}")]
    InvalidName(String),
}

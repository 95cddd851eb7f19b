//! Event repository: ordering, persistence, and time-ordered retrieval.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::clock::{Clock, TokenClock};
use crate::codec;
use crate::error::RepositoryError;
use crate::event::{AggregateId, Attrs, Event, EventNames, EventTime};
use crate::storage::{IndexName, KeyRange, StorageStrategy};

/// Appends events and reads them back in `time` order.
///
/// The repository assigns every event its ordering token and delegates
/// persistence to exactly one [`StorageStrategy`] at a time.
pub struct EventRepository {
    storage: RwLock<Arc<dyn StorageStrategy>>,
    clock: TokenClock,
}

impl EventRepository {
    /// Creates a repository over `storage`, ordering events by system time.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageStrategy>) -> Self {
        Self {
            storage: RwLock::new(storage),
            clock: TokenClock::default(),
        }
    }

    /// Creates a repository whose tokens are seeded from `clock`.
    #[must_use]
    pub fn with_clock(storage: Arc<dyn StorageStrategy>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage: RwLock::new(storage),
            clock: TokenClock::new(clock),
        }
    }

    /// Returns the currently bound storage strategy.
    #[must_use]
    pub fn strategy(&self) -> Arc<dyn StorageStrategy> {
        Arc::clone(&self.storage.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Rebinds the storage strategy.
    ///
    /// Operations already in flight keep the strategy they started with.
    pub fn set_strategy(&self, storage: Arc<dyn StorageStrategy>) {
        *self.storage.write().unwrap_or_else(PoisonError::into_inner) = storage;
    }

    /// Stores a new event and resolves with it once persisted.
    ///
    /// The `time` token is taken when the call starts, so tokens follow call
    /// order even if the storage writes complete out of order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidName` if `name` is empty, or
    /// `RepositoryError::PersistenceFailed` if the storage strategy rejects
    /// the write.
    pub async fn append(
        &self,
        aggregate_id: impl Into<AggregateId>,
        name: impl Into<String>,
        attrs: Attrs,
    ) -> Result<Event, RepositoryError> {
        let aggregate_id = aggregate_id.into();
        let name = name.into();
        if name.is_empty() {
            return Err(RepositoryError::InvalidName(name));
        }

        let event = Event {
            aggregate_id,
            name,
            time: self.clock.next_token(),
            attrs,
        };
        let document = codec::encode(&event)?;
        let storage = self.strategy();

        match storage.put(&event.time.to_string(), document).await {
            Ok(id) => {
                debug!(
                    aggregate_id = %event.aggregate_id,
                    name = %event.name,
                    time = %event.time,
                    document_id = %id,
                    "event appended"
                );
                Ok(event)
            }
            Err(source) => Err(RepositoryError::PersistenceFailed {
                aggregate_id: event.aggregate_id,
                name: event.name,
                source,
            }),
        }
    }

    /// Returns every event of `aggregate_id` in ascending `time` order.
    ///
    /// An aggregate without events yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::QueryFailed` if the index query fails, or
    /// `RepositoryError::MalformedDocument` if a stored row is not an event.
    pub async fn read_by_aggregate(
        &self,
        aggregate_id: &AggregateId,
    ) -> Result<Vec<Event>, RepositoryError> {
        let storage = self.strategy();
        let range = KeyRange::all(aggregate_id.to_key());
        let events = read_range(storage.as_ref(), IndexName::Aggregate, &range).await?;
        debug!(%aggregate_id, count = events.len(), "read events by aggregate");
        Ok(events)
    }

    /// Returns the events named by `names` with `time >= from`, as a single
    /// timeline in ascending `time` order.
    ///
    /// One name is served straight from its index range. Several names are
    /// queried concurrently; the call waits for every stream, concatenates
    /// them in name order, and stable-sorts the result by `time`. Pass
    /// `EventTime::MIN` to read from the beginning.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidName` if a name is empty. A single
    /// name fails with the query's own error; with several names, the first
    /// failing stream aborts the read with
    /// `RepositoryError::PartialFanInFailure`.
    pub async fn read_by_names(
        &self,
        names: impl Into<EventNames>,
        from: EventTime,
    ) -> Result<Vec<Event>, RepositoryError> {
        let names = names.into();
        let distinct = names.distinct();
        if let Some(empty) = distinct.iter().find(|name| name.is_empty()) {
            return Err(RepositoryError::InvalidName((*empty).to_owned()));
        }

        let storage = self.strategy();
        match distinct.as_slice() {
            [] => Ok(Vec::new()),
            [name] => {
                let range = KeyRange::from_time(serde_json::Value::from(*name), from);
                let events = read_range(storage.as_ref(), IndexName::Name, &range).await?;
                debug!(%name, %from, count = events.len(), "read events by name");
                Ok(events)
            }
            many => {
                let streams = many.len();
                let reads = many.iter().map(|name| {
                    let storage = storage.as_ref();
                    async move {
                        let range = KeyRange::from_time(serde_json::Value::from(*name), from);
                        read_range(storage, IndexName::Name, &range)
                            .await
                            .map_err(|source| {
                                warn!(%name, streams, error = %source, "stream failed, aborting merged read");
                                RepositoryError::PartialFanInFailure {
                                    name: (*name).to_owned(),
                                    streams,
                                    source: Box::new(source),
                                }
                            })
                    }
                });

                // try_join_all yields results by input position, not completion order.
                let per_stream = try_join_all(reads).await?;
                let mut merged: Vec<Event> = per_stream.into_iter().flatten().collect();
                merged.sort_by_key(|event| event.time);
                debug!(streams, %from, count = merged.len(), "merged events by name");
                Ok(merged)
            }
        }
    }

    /// Looks up a single event by its ordering token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::QueryFailed` if the lookup fails, or
    /// `RepositoryError::MalformedDocument` if the document is not an event.
    pub async fn read_event(&self, time: EventTime) -> Result<Option<Event>, RepositoryError> {
        let storage = self.strategy();
        let key = time.to_string();
        let document = storage
            .get(&key)
            .await
            .map_err(|e| RepositoryError::QueryFailed {
                index: IndexName::Aggregate,
                key: serde_json::Value::from(key),
                reason: e.to_string(),
            })?;
        document.map(codec::decode_document).transpose()
    }

    /// Returns the most recently assigned ordering token.
    #[must_use]
    pub fn last_time(&self) -> EventTime {
        self.clock.last()
    }
}

impl fmt::Debug for EventRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRepository")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

async fn read_range(
    storage: &dyn StorageStrategy,
    index: IndexName,
    range: &KeyRange,
) -> Result<Vec<Event>, RepositoryError> {
    let response = storage
        .query(index, range)
        .await
        .map_err(|e| RepositoryError::QueryFailed {
            index,
            key: range.prefix.clone(),
            reason: e.to_string(),
        })?;
    codec::decode(response, index, range)
}

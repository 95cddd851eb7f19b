//! In-memory `StorageStrategy` implementation.
//!
//! Keeps documents in a map and maintains the `aggregate` and `name` indexes
//! on every write. Suitable for tests and for running without a database.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::event::{EVENT_DOCUMENT_TYPE, EventTime};
use crate::storage::{
    Document, ID_FIELD, IndexName, KeyRange, QueryResponse, REV_FIELD, StorageError,
    StorageStrategy,
};

/// Index entry: encoded key prefix, time, document id.
type IndexEntry = (String, EventTime, String);

#[derive(Debug, Default)]
struct State {
    documents: HashMap<String, Document>,
    by_aggregate: BTreeSet<IndexEntry>,
    by_name: BTreeSet<IndexEntry>,
}

impl State {
    fn index(&self, index: IndexName) -> &BTreeSet<IndexEntry> {
        match index {
            IndexName::Aggregate => &self.by_aggregate,
            IndexName::Name => &self.by_name,
        }
    }

    fn index_mut(&mut self, index: IndexName) -> &mut BTreeSet<IndexEntry> {
        match index {
            IndexName::Aggregate => &mut self.by_aggregate,
            IndexName::Name => &mut self.by_name,
        }
    }
}

/// Process-local document store with composite-key indexes.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    state: Mutex<State>,
}

impl InMemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored documents, events or otherwise.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    /// Returns `true` if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Extracts the `(prefix, time)` key of `document` for `index`, if the
/// document is an indexable event.
fn index_key(document: &Document, index: IndexName) -> Option<(String, EventTime)> {
    if document.get("type")?.as_str()? != EVENT_DOCUMENT_TYPE {
        return None;
    }
    let prefix = document.get(index.key_field())?;
    let time = document.get("time")?.as_str()?.parse().ok()?;
    Some((prefix.to_string(), time))
}

#[async_trait]
impl StorageStrategy for InMemoryStorage {
    async fn put(&self, key: &str, mut document: Document) -> Result<String, StorageError> {
        let mut state = self.lock();
        if state.documents.contains_key(key) {
            return Err(StorageError::Conflict(key.to_owned()));
        }

        if let Some(fields) = document.as_object_mut() {
            fields.insert(ID_FIELD.to_owned(), key.into());
            fields.insert(
                REV_FIELD.to_owned(),
                format!("1-{}", Uuid::new_v4().simple()).into(),
            );
        }

        for index in [IndexName::Aggregate, IndexName::Name] {
            if let Some((prefix, time)) = index_key(&document, index) {
                state.index_mut(index).insert((prefix, time, key.to_owned()));
            }
        }
        state.documents.insert(key.to_owned(), document);
        Ok(key.to_owned())
    }

    async fn query(
        &self,
        index: IndexName,
        range: &KeyRange,
    ) -> Result<QueryResponse, StorageError> {
        let state = self.lock();
        let prefix = range.prefix.to_string();
        let lower = (prefix.clone(), range.start, String::new());

        let documents = state
            .index(index)
            .range(lower..)
            .take_while(|(p, time, _)| *p == prefix && *time <= range.end)
            .filter_map(|(_, _, id)| state.documents.get(id).cloned())
            .collect::<Vec<_>>();

        Ok(QueryResponse::from_documents(documents))
    }

    async fn get(&self, id: &str) -> Result<Option<Document>, StorageError> {
        Ok(self.lock().documents.get(id).cloned())
    }
}

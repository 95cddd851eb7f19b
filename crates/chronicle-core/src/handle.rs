//! Shared repository handle.
//!
//! A `RepositoryHandle` is built once at startup with its storage strategy
//! and passed to every consumer. All clones refer to the same repository, so
//! they share the strategy binding and continue one `time` sequence.

use std::ops::Deref;
use std::sync::Arc;

use crate::clock::Clock;
use crate::repository::EventRepository;
use crate::storage::StorageStrategy;

/// Cloneable handle to one process-wide [`EventRepository`].
#[derive(Debug, Clone)]
pub struct RepositoryHandle {
    repository: Arc<EventRepository>,
}

impl RepositoryHandle {
    /// Creates the handle, binding the repository to `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageStrategy>) -> Self {
        Self::from_repository(EventRepository::new(storage))
    }

    /// Creates the handle with an explicit wall clock for token seeding.
    #[must_use]
    pub fn with_clock(storage: Arc<dyn StorageStrategy>, clock: Arc<dyn Clock>) -> Self {
        Self::from_repository(EventRepository::with_clock(storage, clock))
    }

    /// Wraps an already constructed repository.
    #[must_use]
    pub fn from_repository(repository: EventRepository) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Returns the shared repository. Every call yields the same instance.
    #[must_use]
    pub fn instance(&self) -> Arc<EventRepository> {
        Arc::clone(&self.repository)
    }

    /// Rebinds the storage strategy for every holder of this handle.
    pub fn set_strategy(&self, storage: Arc<dyn StorageStrategy>) {
        self.repository.set_strategy(storage);
    }

    /// Returns `true` if both handles share one repository.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.repository, &other.repository)
    }
}

impl Deref for RepositoryHandle {
    type Target = EventRepository;

    fn deref(&self) -> &Self::Target {
        &self.repository
    }
}

//! Shared application state.

use chronicle_core::handle::RepositoryHandle;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle to the process-wide event repository.
    pub repository: RepositoryHandle,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(repository: RepositoryHandle) -> Self {
        Self { repository }
    }
}

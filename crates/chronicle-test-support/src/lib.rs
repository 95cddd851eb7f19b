//! Shared test mocks and utilities for the Chronicle event store.

mod clock;
mod storage;

pub use clock::FixedClock;
pub use storage::{ErrorPayloadStorage, FailingStorage, ScriptedStorage};

//! Chronicle Core — append-only event repository.
//!
//! Events are keyed by aggregate and read back either per aggregate or per
//! event name, always in ascending `time` order. Persistence goes through a
//! pluggable [`storage::StorageStrategy`]; this crate ships an in-memory one.

pub mod clock;
pub mod codec;
pub mod error;
pub mod event;
pub mod handle;
pub mod memory;
pub mod repository;
pub mod storage;

//! Behavioural tests for `EventRepository` against shared test storages.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use chronicle_core::error::RepositoryError;
use chronicle_core::event::{AggregateId, Attrs, Event, EventTime};
use chronicle_core::handle::RepositoryHandle;
use chronicle_core::memory::InMemoryStorage;
use chronicle_core::storage::{StorageError, StorageStrategy};
use chronicle_test_support::{ErrorPayloadStorage, FailingStorage, FixedClock, ScriptedStorage};
use serde_json::json;

fn fixed_handle(storage: Arc<dyn StorageStrategy>) -> RepositoryHandle {
    let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
    RepositoryHandle::with_clock(storage, Arc::new(clock))
}

fn amount(value: i64) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert("amount".to_owned(), json!(value));
    attrs
}

/// Appends 3 deposits and 2 withdrawals interleaved in time.
async fn seed_bank(handle: &RepositoryHandle) -> Vec<Event> {
    let mut appended = Vec::new();
    for (name, value) in [
        ("deposit", 100),
        ("withdraw", 40),
        ("deposit", 250),
        ("deposit", 75),
        ("withdraw", 10),
    ] {
        appended.push(handle.append(1, name, amount(value)).await.unwrap());
    }
    appended
}

// --- ordering tokens ---

#[tokio::test]
async fn test_sequential_appends_receive_strictly_increasing_times() {
    let handle = fixed_handle(Arc::new(InMemoryStorage::new()));

    let mut times = Vec::new();
    for i in 0..50 {
        times.push(handle.append(i % 3, "tick", Attrs::new()).await.unwrap().time);
    }

    assert!(times.windows(2).all(|pair| pair[0] < pair[1]));
}

// --- read by aggregate ---

#[tokio::test]
async fn test_read_by_aggregate_returns_all_events_without_internal_fields() {
    // Arrange
    let handle = fixed_handle(Arc::new(InMemoryStorage::new()));
    let opened = handle.append("acc-7", "opened", Attrs::new()).await.unwrap();
    let deposited = handle.append("acc-7", "deposit", amount(10)).await.unwrap();
    let closed = handle.append("acc-7", "closed", Attrs::new()).await.unwrap();

    // Act
    let events = handle
        .read_by_aggregate(&AggregateId::from("acc-7"))
        .await
        .unwrap();

    // Assert
    assert_eq!(events, vec![opened, deposited, closed]);
    for event in &events {
        let wire = serde_json::to_value(event).unwrap();
        assert!(wire.get("_id").is_none());
        assert!(wire.get("_rev").is_none());
    }
}

#[tokio::test]
async fn test_read_by_aggregate_for_unknown_aggregate_is_empty() {
    let handle = fixed_handle(Arc::new(InMemoryStorage::new()));
    seed_bank(&handle).await;

    let events = handle.read_by_aggregate(&AggregateId::Number(2)).await.unwrap();

    assert!(events.is_empty());
}

#[tokio::test]
async fn test_numeric_and_textual_aggregates_are_separate_streams() {
    let handle = fixed_handle(Arc::new(InMemoryStorage::new()));
    let numeric = handle.append(1, "opened", Attrs::new()).await.unwrap();
    let textual = handle.append("1", "opened", Attrs::new()).await.unwrap();

    let by_number = handle.read_by_aggregate(&AggregateId::Number(1)).await.unwrap();
    let by_text = handle.read_by_aggregate(&AggregateId::from("1")).await.unwrap();

    assert_eq!(by_number, vec![numeric]);
    assert_eq!(by_text, vec![textual]);
}

// --- read by names ---

#[tokio::test]
async fn test_read_by_names_merges_deposits_and_withdrawals_by_time() {
    // Arrange: deposits answer last.
    let storage = Arc::new(ScriptedStorage::new().with_delay("deposit", Duration::from_millis(50)));
    let handle = fixed_handle(storage.clone());
    let appended = seed_bank(&handle).await;

    // Act
    let events = handle
        .read_by_names(["deposit", "withdraw"], EventTime::MIN)
        .await
        .unwrap();

    // Assert
    assert_eq!(events, appended);
    assert_eq!(
        storage.completed_queries(),
        vec![json!("withdraw"), json!("deposit")]
    );
}

#[tokio::test]
async fn test_read_by_names_result_does_not_depend_on_which_stream_finishes_first() {
    let slow_deposits =
        Arc::new(ScriptedStorage::new().with_delay("deposit", Duration::from_millis(30)));
    let slow_withdrawals =
        Arc::new(ScriptedStorage::new().with_delay("withdraw", Duration::from_millis(30)));
    let first = fixed_handle(slow_deposits);
    let second = fixed_handle(slow_withdrawals);
    seed_bank(&first).await;
    seed_bank(&second).await;

    let a = first
        .read_by_names(["deposit", "withdraw"], EventTime::MIN)
        .await
        .unwrap();
    let b = second
        .read_by_names(["withdraw", "deposit"], EventTime::MIN)
        .await
        .unwrap();

    // Both handles start from the same fixed clock, so tokens line up.
    assert_eq!(a, b);
    assert_eq!(a.len(), 5);
}

#[tokio::test]
async fn test_read_by_name_from_excludes_earlier_events() {
    // Arrange
    let handle = fixed_handle(Arc::new(InMemoryStorage::new()));
    let appended = seed_bank(&handle).await;
    let from = appended[2].time;

    // Act
    let events = handle.read_by_names("deposit", from).await.unwrap();

    // Assert
    assert_eq!(events, vec![appended[2].clone(), appended[3].clone()]);
    assert!(events.iter().all(|event| event.time >= from));
}

#[tokio::test]
async fn test_read_by_names_from_applies_to_every_stream() {
    let handle = fixed_handle(Arc::new(InMemoryStorage::new()));
    let appended = seed_bank(&handle).await;

    let events = handle
        .read_by_names(["deposit", "withdraw"], appended[3].time)
        .await
        .unwrap();

    assert_eq!(events, appended[3..].to_vec());
}

// --- failures ---

#[tokio::test]
async fn test_fan_in_with_one_failing_stream_is_detectable() {
    // Arrange
    let storage = Arc::new(
        ScriptedStorage::new()
            .failing_on("withdraw")
            .with_delay("deposit", Duration::from_millis(20)),
    );
    let handle = fixed_handle(storage);
    seed_bank(&handle).await;

    // Act
    let result = handle
        .read_by_names(["deposit", "withdraw"], EventTime::MIN)
        .await;

    // Assert
    match result {
        Err(RepositoryError::PartialFanInFailure { name, streams, .. }) => {
            assert_eq!(name, "withdraw");
            assert_eq!(streams, 2);
        }
        other => panic!("expected PartialFanInFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_payload_is_query_failed_on_both_read_paths() {
    let handle = fixed_handle(Arc::new(ErrorPayloadStorage));

    let by_aggregate = handle.read_by_aggregate(&AggregateId::Number(1)).await;
    let by_name = handle.read_by_names("deposit", EventTime::MIN).await;
    let by_names = handle
        .read_by_names(["deposit", "withdraw"], EventTime::MIN)
        .await;

    assert!(matches!(by_aggregate, Err(RepositoryError::QueryFailed { .. })));
    assert!(matches!(by_name, Err(RepositoryError::QueryFailed { .. })));
    match by_names {
        Err(RepositoryError::PartialFanInFailure { source, .. }) => {
            assert!(matches!(*source, RepositoryError::QueryFailed { .. }));
        }
        other => panic!("expected PartialFanInFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_append_surfaces_persistence_failure() {
    let handle = fixed_handle(Arc::new(FailingStorage));

    let result = handle.append(1, "deposit", amount(5)).await;

    match result {
        Err(RepositoryError::PersistenceFailed { name, source, .. }) => {
            assert_eq!(name, "deposit");
            assert!(matches!(source, StorageError::Backend(_)));
        }
        other => panic!("expected PersistenceFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_storage_fails_reads() {
    let handle = fixed_handle(Arc::new(FailingStorage));

    let result = handle.read_by_aggregate(&AggregateId::Number(1)).await;
    let lookup = handle.read_event(EventTime::from_raw(1)).await;

    assert!(matches!(result, Err(RepositoryError::QueryFailed { .. })));
    assert!(matches!(lookup, Err(RepositoryError::QueryFailed { .. })));
}

// --- handle ---

#[tokio::test]
async fn test_handle_instances_share_strategy_and_time_sequence() {
    // Arrange
    let handle = fixed_handle(Arc::new(InMemoryStorage::new()));
    let first = handle.instance();
    let second = handle.instance();

    // Act
    let earlier = first.append(1, "deposit", Attrs::new()).await.unwrap();
    let later = second.append(1, "deposit", Attrs::new()).await.unwrap();

    // Assert
    assert!(Arc::ptr_eq(&first, &second));
    assert!(earlier.time < later.time);
    let events = second.read_by_aggregate(&AggregateId::Number(1)).await.unwrap();
    assert_eq!(events, vec![earlier, later]);
}

#[tokio::test]
async fn test_rebinding_strategy_redirects_subsequent_operations() {
    let handle = fixed_handle(Arc::new(FailingStorage));
    assert!(handle.append(1, "deposit", Attrs::new()).await.is_err());

    handle.set_strategy(Arc::new(InMemoryStorage::new()));
    let event = handle.append(1, "deposit", Attrs::new()).await.unwrap();

    assert_eq!(handle.read_event(event.time).await.unwrap(), Some(event));
}

//! Behavioral properties of the allocator against the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use medseq_allocator::{BatchEntry, ErrorCategory, ReserveResponse, ResetPeriod, SequenceAllocator};
use medseq_db_memory::InMemoryCounterStore;
use serde_json::json;
use time::OffsetDateTime;

fn allocator() -> SequenceAllocator {
    SequenceAllocator::new(Arc::new(InMemoryCounterStore::new()))
}

#[tokio::test]
async fn sequential_allocations_are_contiguous() {
    let allocator = allocator();
    let mut values = Vec::new();
    for _ in 0..25 {
        values.push(allocator.allocate("opdNumber").await.unwrap());
    }
    assert_eq!(values, (1..=25).collect::<Vec<u64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_allocations_yield_exactly_one_to_n() {
    let allocator = allocator();

    let calls = (0..100).map(|_| {
        let allocator = allocator.clone();
        tokio::spawn(async move { allocator.allocate("opdNumber").await.unwrap() })
    });
    let values: Vec<u64> = join_all(calls)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let unique: HashSet<u64> = values.iter().copied().collect();
    assert_eq!(unique.len(), 100);
    assert_eq!(unique, (1..=100).collect::<HashSet<u64>>());
    assert_eq!(allocator.current_value("opdNumber").await.unwrap(), 100);
}

#[tokio::test]
async fn reads_do_not_create_counters() {
    let allocator = allocator();

    assert_eq!(allocator.current_value("brandNewName").await.unwrap(), 0);
    assert_eq!(allocator.peek_next("brandNewName").await.unwrap(), 1);
    let name = "brandNewName".parse().unwrap();
    assert!(allocator.store().get(&name).await.unwrap().is_none());
    assert!(allocator.list().await.unwrap().is_empty());

    assert_eq!(allocator.allocate("brandNewName").await.unwrap(), 1);
    assert_eq!(allocator.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn reservation_advances_a_lagging_counter() {
    let allocator = allocator();
    for _ in 0..5 {
        allocator.allocate("opdNumber").await.unwrap();
    }
    assert_eq!(allocator.current_value("opdNumber").await.unwrap(), 5);

    allocator.reserve("opdNumber", 50).await.unwrap();
    assert_eq!(allocator.allocate("opdNumber").await.unwrap(), 51);
}

#[tokio::test]
async fn second_reservation_of_same_number_conflicts() {
    let allocator = allocator();

    let first = ReserveResponse::from_result(allocator.reserve("opdNumber", 50).await).unwrap();
    assert!(first.ok);

    let err = allocator.reserve("opdNumber", 50).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.status_code(), 409);

    let second = ReserveResponse::from_result(Err(err)).unwrap();
    assert!(!second.ok);
    assert_eq!(second.reason.as_deref(), Some("Conflict"));
}

#[tokio::test]
async fn reserving_an_allocated_number_conflicts() {
    let allocator = allocator();
    allocator.allocate("ipdNumber").await.unwrap();
    allocator.allocate("ipdNumber").await.unwrap();

    assert!(allocator.reserve("ipdNumber", 2).await.unwrap_err().is_conflict());
    assert!(allocator.reserve("ipdNumber", 3).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_reservations_admit_exactly_one() {
    let allocator = allocator();

    let calls = (0..20).map(|_| {
        let allocator = allocator.clone();
        tokio::spawn(async move { allocator.reserve("opdNumber", 77).await })
    });
    let results: Vec<_> = join_all(calls).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.is_conflict())
    );
    assert_eq!(allocator.allocate("opdNumber").await.unwrap(), 78);
}

#[tokio::test]
async fn reset_restarts_numbering_and_stamps_last_reset() {
    let allocator = allocator();
    for _ in 0..30 {
        allocator.allocate("ipdNumber").await.unwrap();
    }

    let before = OffsetDateTime::now_utc();
    let outcome = allocator.reset("ipdNumber", 0, None).await.unwrap();
    assert_eq!(outcome.value, 0);
    assert_eq!(outcome.reset_period, ResetPeriod::Never);
    assert!(outcome.last_reset >= before);

    assert_eq!(allocator.allocate("ipdNumber").await.unwrap(), 1);
}

#[tokio::test]
async fn reset_can_change_the_period() {
    let allocator = allocator();
    let outcome = allocator
        .reset("opdNumber", 1000, Some(ResetPeriod::Monthly))
        .await
        .unwrap();
    assert_eq!(outcome.value, 1000);
    assert_eq!(outcome.reset_period, ResetPeriod::Monthly);

    // Omitting the period keeps the stored one
    let outcome = allocator.reset("opdNumber", 5, None).await.unwrap();
    assert_eq!(outcome.reset_period, ResetPeriod::Monthly);
    assert_eq!(allocator.allocate("opdNumber").await.unwrap(), 6);
}

#[tokio::test]
async fn batch_failure_does_not_roll_back_other_entries() {
    let allocator = allocator();

    let outcomes = allocator
        .batch_set(&[
            BatchEntry::new("opdNumber", 10),
            BatchEntry::new("ipdNumber", -5),
            BatchEntry::new("labNumber", 3).with_reset_period(ResetPeriod::Yearly),
        ])
        .await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].ok);
    assert_eq!(outcomes[0].value, Some(10));
    assert!(!outcomes[1].ok);
    assert_eq!(outcomes[1].name, "ipdNumber");
    assert_eq!(outcomes[1].error_category(), Some(ErrorCategory::Validation));
    assert!(outcomes[2].ok);

    assert_eq!(allocator.current_value("opdNumber").await.unwrap(), 10);
    assert_eq!(allocator.current_value("ipdNumber").await.unwrap(), 0);
    assert_eq!(allocator.current_value("labNumber").await.unwrap(), 3);
}

#[tokio::test]
async fn batch_created_counters_take_the_configured_period() {
    let allocator = allocator().with_periods([
        ("opdNumber".parse().unwrap(), ResetPeriod::Yearly),
        ("ipdNumber".parse().unwrap(), ResetPeriod::Yearly),
    ]);

    let outcomes = allocator
        .batch_set(&[
            BatchEntry::new("opdNumber", 1041),
            BatchEntry::new("ipdNumber", 12).with_reset_period(ResetPeriod::Monthly),
            BatchEntry::new("labNumber", 3),
        ])
        .await;
    assert!(outcomes.iter().all(|o| o.ok));

    let periods: Vec<(String, ResetPeriod)> = allocator
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.name.into_inner(), r.reset_period))
        .collect();
    assert_eq!(
        periods,
        vec![
            ("ipdNumber".to_owned(), ResetPeriod::Monthly),
            ("labNumber".to_owned(), ResetPeriod::Never),
            ("opdNumber".to_owned(), ResetPeriod::Yearly),
        ]
    );
}

#[tokio::test]
async fn json_batch_isolates_malformed_entries() {
    let allocator = allocator();

    let outcomes = allocator
        .batch_set_json(&[
            json!({ "name": "opdNumber", "value": 10 }),
            json!({ "name": "ipdNumber", "value": "twelve" }),
            json!({ "name": "ipdNumber", "value": 2.5 }),
            json!({ "name": "", "value": 1 }),
            json!({ "name": "labNumber", "value": 7, "resetPeriod": "monthly" }),
        ])
        .await;

    let ok: Vec<bool> = outcomes.iter().map(|o| o.ok).collect();
    assert_eq!(ok, vec![true, false, false, false, true]);
    assert!(
        outcomes
            .iter()
            .filter(|o| !o.ok)
            .all(|o| o.error_category() == Some(ErrorCategory::Validation))
    );
    assert_eq!(outcomes[1].name, "ipdNumber");
    assert_eq!(allocator.current_value("labNumber").await.unwrap(), 7);
}

#[tokio::test]
async fn repeated_reads_are_stable() {
    let allocator = allocator();
    allocator.reset("opdNumber", 1041, None).await.unwrap();

    for _ in 0..5 {
        assert_eq!(allocator.current_value("opdNumber").await.unwrap(), 1041);
        assert_eq!(allocator.peek_next("opdNumber").await.unwrap(), 1042);
    }
    assert_eq!(allocator.allocate("opdNumber").await.unwrap(), 1042);
}

#[tokio::test]
async fn ledger_tracks_allocated_and_reserved_numbers() {
    let allocator = allocator();
    allocator.allocate("opdNumber").await.unwrap();
    allocator.reserve("opdNumber", 40).await.unwrap();
    allocator.allocate("opdNumber").await.unwrap();

    let issued: Vec<u64> = allocator
        .issued_numbers("opdNumber")
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.value)
        .collect();
    assert_eq!(issued, vec![1, 40, 41]);
}

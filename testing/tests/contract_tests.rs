//! Contract checks against the in-process backend

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use chrono::Duration;
use proptest::prelude::*;
use removal_desk_core::policy::can_transition;
use removal_desk_core::{
    AuditFilter, InMemoryAuditLog, InMemoryRequestRepository, RequestError, RequestId,
    RequestStatus, RequestStore, Role,
};
use removal_desk_testing::fixtures::{draft, full_draft, it_staff, registrar};
use removal_desk_testing::mocks::epoch;
use removal_desk_testing::properties::{arb_role, arb_serial, arb_status};
use removal_desk_testing::{FailingAuditLog, StepClock, contract, init_test_tracing, test_store};
use std::sync::Arc;

#[tokio::test]
async fn test_in_memory_backend_passes_contract() {
    init_test_tracing();
    let store = test_store();
    contract::run_all(&store).await.unwrap();
}

#[tokio::test]
async fn test_contract_with_stepping_clock() {
    let clock = Arc::new(StepClock::new(epoch(), Duration::seconds(1)));
    let store = RequestStore::in_memory(clock);
    contract::lifecycle(&store).await.unwrap();
    contract::concurrent_creates(&store, 16).await.unwrap();
}

#[tokio::test]
async fn test_first_ten_ids() {
    let store = test_store();
    for n in 1..=10u64 {
        let record = store
            .create(draft("p1", &format!("SN-{n}")))
            .await
            .unwrap();
        assert_eq!(record.id.as_str(), format!("{n:06}"));
    }
}

#[tokio::test]
async fn test_last_six_digit_id_keeps_listing_ordered() {
    let store = test_store();
    let last = store
        .create(draft("p1", "SN-A").with_id(RequestId::parse("999999").unwrap()))
        .await
        .unwrap();
    assert_eq!(last.id.as_str(), "999999");

    let err = store.create(draft("p1", "SN-B")).await.unwrap_err();
    assert!(matches!(err, RequestError::Storage(_)));

    let ids: Vec<String> = store
        .list()
        .await
        .unwrap()
        .iter()
        .map(|r| r.id.to_string())
        .collect();
    assert_eq!(ids, ["999999"]);
    assert_eq!(store.snapshot().await.unwrap().counter, RequestId::MAX);
}

#[tokio::test]
async fn test_full_draft_round_trips_through_store() {
    let store = test_store();
    let created = store.create(full_draft("p1", "FD-01")).await.unwrap();
    let fetched = store.get(created.id.clone()).await.unwrap().unwrap();
    assert_eq!(created, fetched);
    assert_eq!(fetched.submitted_at, epoch());
    assert_eq!(fetched.device_model.as_deref(), Some("Chromebook 11"));
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_mutation() {
    let clock = Arc::new(StepClock::new(epoch(), Duration::seconds(1)));
    let audit = Arc::new(FailingAuditLog::new());
    let store = RequestStore::new(
        Arc::new(InMemoryRequestRepository::new()),
        audit.clone(),
        clock,
    );

    let record = store.create(draft("p1", "AF-01")).await.unwrap();
    store
        .transition_status(record.id.clone(), RequestStatus::PendingIt, &registrar())
        .await
        .unwrap();
    assert_eq!(audit.attempts(), 2);

    let stored = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::PendingIt);
}

#[tokio::test]
async fn test_audit_times_follow_clock() {
    let clock = Arc::new(StepClock::new(epoch(), Duration::minutes(1)));
    let store = RequestStore::new(
        Arc::new(InMemoryRequestRepository::new()),
        Arc::new(InMemoryAuditLog::new(clock.clone())),
        clock,
    );

    let record = store.create(draft("p1", "TM-01")).await.unwrap();
    let approved = {
        store
            .transition_status(record.id.clone(), RequestStatus::PendingIt, &registrar())
            .await
            .unwrap();
        store
            .transition_status(record.id.clone(), RequestStatus::ItApproved, &it_staff())
            .await
            .unwrap()
    };

    let entries = store
        .list_audit(AuditFilter::new().request(record.id))
        .await
        .unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.windows(2).all(|w| w[0].time > w[1].time));
    assert_eq!(Some(entries[0].time), approved.updated_at);
}

#[tokio::test]
async fn test_requests_listed_newest_first() {
    let store = test_store();
    for serial in ["A", "B", "C"] {
        store.create(draft("p1", serial)).await.unwrap();
    }
    let ids: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id.to_string())
        .collect();
    assert_eq!(ids, ["000003", "000002", "000001"]);
}

proptest! {
    #[test]
    fn prop_only_two_forward_edges_change_status(
        role in arb_role(),
        from in arb_status(),
        to in arb_status(),
    ) {
        if can_transition(role, from, to) && from != to {
            let forward = matches!(
                (role, from, to),
                (Role::Registrar, RequestStatus::Submitted, RequestStatus::PendingIt)
                    | (Role::It, RequestStatus::PendingIt, RequestStatus::ItApproved)
            );
            prop_assert!(forward);
        }
        if !role.is_staff() {
            prop_assert!(!can_transition(role, from, to));
        }
    }

    #[test]
    fn prop_never_two_active_per_owner_and_device(
        serials in prop::collection::vec(arb_serial(), 1..8),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let store = test_store();
            for serial in &serials {
                let result = store.create(draft("p1", serial)).await;
                assert!(
                    matches!(result, Ok(_) | Err(RequestError::DuplicateActiveRequest { .. })),
                    "{result:?}"
                );
            }

            let records = store.list().await.unwrap();
            let mut seen = std::collections::HashSet::new();
            for record in records.iter().filter(|r| r.is_active()) {
                assert!(seen.insert(record.normalized_serial()));
            }
        });
    }
}

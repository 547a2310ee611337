//! Behavior every backend must exhibit.
//!
//! Each check drives a [`RequestStore`] through the public API and asserts on
//! the outcome. Checks use their own owner keys and only compare ids
//! relative to each other, so they can share one store. Backend crates run
//! [`run_all`] from their integration tests.
//!
//! # Panics
//!
//! Checks panic (through `assert!`) when the backend misbehaves; backend
//! failures are returned as errors.

use crate::fixtures::{draft, it_staff, parent, registrar};
use removal_desk_core::audit::actions;
use removal_desk_core::{
    AuditFilter, NewAuditEntry, RequestError, RequestId, RequestPatch, RequestStatus,
    RequestStore, Result,
};

/// Run every check in sequence.
///
/// # Errors
///
/// Returns the first backend error a check hits.
pub async fn run_all(store: &RequestStore) -> Result<()> {
    sequential_ids(store).await?;
    lifecycle(store).await?;
    duplicate_guard(store).await?;
    explicit_ids(store).await?;
    patch_semantics(store).await?;
    audit_trail(store).await?;
    snapshot_counts(store).await?;
    concurrent_creates(store, 8).await?;
    concurrent_patches(store).await?;
    Ok(())
}

/// Consecutive creates get consecutive ids.
///
/// # Errors
///
/// Backend errors.
pub async fn sequential_ids(store: &RequestStore) -> Result<()> {
    let a = store.create(draft("contract-seq", "SEQ-01")).await?;
    let b = store.create(draft("contract-seq", "SEQ-02")).await?;
    assert_eq!(b.id.value(), a.id.value() + 1);
    assert_eq!(a.id.as_str().len(), RequestId::WIDTH);
    Ok(())
}

/// The full forward path, with the denials along the way.
///
/// # Errors
///
/// Backend errors.
pub async fn lifecycle(store: &RequestStore) -> Result<()> {
    let owner = "contract-lifecycle";
    let first = store.create(draft(owner, "AB-01")).await?;
    assert_eq!(first.status, RequestStatus::Submitted);
    assert_eq!(first.updated_at, None);

    let dup = store.create(draft(owner, " ab-01 ")).await;
    assert_eq!(
        dup.err(),
        Some(RequestError::DuplicateActiveRequest {
            id: first.id.clone(),
            status: RequestStatus::Submitted,
        })
    );

    let denied = store
        .transition_status(first.id.clone(), RequestStatus::PendingIt, &parent(owner))
        .await;
    assert!(matches!(denied, Err(RequestError::AccessDenied { .. })));

    let forwarded = store
        .transition_status(first.id.clone(), RequestStatus::PendingIt, &registrar())
        .await?;
    assert_eq!(forwarded.status, RequestStatus::PendingIt);
    assert!(forwarded.updated_at.is_some());

    let skipped = store
        .transition_status(first.id.clone(), RequestStatus::ItApproved, &registrar())
        .await;
    assert!(matches!(skipped, Err(RequestError::InvalidTransition { .. })));

    let dup = store.create(draft(owner, "AB-01")).await;
    assert_eq!(
        dup.err(),
        Some(RequestError::DuplicateActiveRequest {
            id: first.id.clone(),
            status: RequestStatus::PendingIt,
        })
    );

    let approved = store
        .transition_status(first.id.clone(), RequestStatus::ItApproved, &it_staff())
        .await?;
    assert_eq!(approved.status, RequestStatus::ItApproved);

    let backwards = store
        .transition_status(first.id.clone(), RequestStatus::PendingIt, &it_staff())
        .await;
    assert!(matches!(backwards, Err(RequestError::InvalidTransition { .. })));

    let second = store.create(draft(owner, "AB-01")).await?;
    assert!(second.id > first.id);

    let actions: Vec<String> = store
        .list_audit(AuditFilter::new().request(first.id.clone()))
        .await?
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        [
            "Status -> it_approved".to_string(),
            "Status -> pending_it".to_string(),
            actions::SUBMITTED.to_string(),
        ]
    );

    let missing = store
        .transition_status(RequestId::from_counter(999_999), RequestStatus::PendingIt, &registrar())
        .await;
    assert_eq!(
        missing.err(),
        Some(RequestError::NotFound(RequestId::from_counter(999_999)))
    );
    Ok(())
}

/// The guard is scoped to owner and active statuses only.
///
/// # Errors
///
/// Backend errors.
pub async fn duplicate_guard(store: &RequestStore) -> Result<()> {
    let mine = store.create(draft("contract-guard-a", "GD 01")).await?;

    // Same device, different owner.
    store.create(draft("contract-guard-b", "gd01")).await?;

    let hit = store.find_active_conflict("contract-guard-a", "gd01").await?;
    assert_eq!(hit.map(|r| r.id), Some(mine.id.clone()));
    assert!(
        store
            .find_active_conflict("contract-guard-a", "GD-01")
            .await?
            .is_none()
    );

    let dup = store.create(draft("contract-guard-a", " Gd 0 1")).await;
    assert!(matches!(dup, Err(RequestError::DuplicateActiveRequest { .. })));
    Ok(())
}

/// Explicit ids advance the counter and may not be reused.
///
/// # Errors
///
/// Backend errors.
pub async fn explicit_ids(store: &RequestStore) -> Result<()> {
    let counter = store.snapshot().await?.counter;
    let explicit = RequestId::from_counter(counter + 100);

    let imported = store
        .create(draft("contract-explicit", "EX-01").with_id(explicit.clone()))
        .await?;
    assert_eq!(imported.id, explicit);

    let next = store.create(draft("contract-explicit", "EX-02")).await?;
    assert_eq!(next.id.value(), counter + 101);

    let reused = store
        .create(draft("contract-explicit-2", "EX-03").with_id(explicit))
        .await;
    assert!(matches!(
        reused,
        Err(RequestError::Validation { field: "id", .. })
    ));
    Ok(())
}

/// Patches merge fields, clean optionals and never touch status.
///
/// # Errors
///
/// Backend errors.
pub async fn patch_semantics(store: &RequestStore) -> Result<()> {
    let owner = "contract-patch";
    let record = store
        .create(draft(owner, "PT-01").with_email("family@example.com"))
        .await?;
    let other = store.create(draft(owner, "PT-02")).await?;

    let patched = store
        .patch_fields(
            record.id.clone(),
            RequestPatch {
                note: Some(" checked ".to_string()),
                email: Some("-".to_string()),
                ..RequestPatch::default()
            },
            &registrar(),
        )
        .await?;
    assert_eq!(patched.note.as_deref(), Some("checked"));
    assert_eq!(patched.email, None);
    assert_eq!(patched.status, RequestStatus::Submitted);
    assert_eq!(patched.owner_key, owner);

    let blank = store
        .patch_fields(
            record.id.clone(),
            RequestPatch {
                reason: Some("  ".to_string()),
                note: Some("lost".to_string()),
                ..RequestPatch::default()
            },
            &registrar(),
        )
        .await;
    assert!(matches!(blank, Err(RequestError::Validation { field: "reason", .. })));
    let unchanged = store.get(record.id.clone()).await?;
    assert_eq!(unchanged.and_then(|r| r.note), Some("checked".to_string()));

    let onto_other = store
        .patch_fields(
            record.id.clone(),
            RequestPatch {
                serial: Some("pt-02".to_string()),
                ..RequestPatch::default()
            },
            &registrar(),
        )
        .await;
    assert_eq!(
        onto_other.err(),
        Some(RequestError::DuplicateActiveRequest {
            id: other.id,
            status: RequestStatus::Submitted,
        })
    );

    let missing = store
        .patch_fields(RequestId::from_counter(999_998), RequestPatch::note("x"), &registrar())
        .await;
    assert!(matches!(missing, Err(RequestError::NotFound(_))));
    Ok(())
}

/// External entries get defaults; failed operations write nothing.
///
/// # Errors
///
/// Backend errors.
pub async fn audit_trail(store: &RequestStore) -> Result<()> {
    let external = store
        .append_audit(NewAuditEntry::new("", "").with_detail("password changed"))
        .await?;
    assert_eq!(external.user, "system");
    assert_eq!(external.action, "log");
    assert_eq!(external.request_id, None);

    let by_system = store.list_audit(AuditFilter::new().user("system")).await?;
    assert!(by_system.iter().any(|e| e.detail.as_deref() == Some("password changed")));

    let record = store.create(draft("contract-audit", "AU-01")).await?;
    let before = store.snapshot().await?.audit_entries;

    let _ = store.create(draft("contract-audit", "AU-01")).await;
    let _ = store
        .transition_status(record.id.clone(), RequestStatus::ItApproved, &registrar())
        .await;
    let _ = store
        .patch_fields(
            record.id.clone(),
            RequestPatch {
                serial: Some(String::new()),
                ..RequestPatch::default()
            },
            &registrar(),
        )
        .await;

    assert_eq!(store.snapshot().await?.audit_entries, before);

    let limited = store.list_audit(AuditFilter::new().limit(1)).await?;
    assert_eq!(limited.len(), 1);
    Ok(())
}

/// One create moves every counter by one.
///
/// # Errors
///
/// Backend errors.
pub async fn snapshot_counts(store: &RequestStore) -> Result<()> {
    let before = store.snapshot().await?;
    store.create(draft("contract-snapshot", "SN-01")).await?;
    let after = store.snapshot().await?;

    assert_eq!(after.counter, before.counter + 1);
    assert_eq!(after.requests, before.requests + 1);
    assert_eq!(after.audit_entries, before.audit_entries + 1);
    assert_eq!(after.backend, store.backend());
    Ok(())
}

/// Racing creates for one device admit exactly one.
///
/// # Errors
///
/// Backend errors, or a task that failed to join.
pub async fn concurrent_creates(store: &RequestStore, tasks: usize) -> Result<()> {
    let handles: Vec<_> = (0..tasks)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.create(draft("contract-race", "RACE-01")).await })
        })
        .collect();

    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle
            .await
            .map_err(|e| RequestError::Storage(format!("create task failed: {e}")))?
        {
            Ok(_) => created += 1,
            Err(RequestError::DuplicateActiveRequest { .. }) => duplicates += 1,
            Err(other) => return Err(other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, tasks - 1);
    Ok(())
}

/// Patches to disjoint fields of one record both survive.
///
/// # Errors
///
/// Backend errors, or a task that failed to join.
pub async fn concurrent_patches(store: &RequestStore) -> Result<()> {
    let record = store.create(draft("contract-merge", "MG-01")).await?;

    let note = {
        let store = store.clone();
        let id = record.id.clone();
        tokio::spawn(async move {
            store
                .patch_fields(id, RequestPatch::note("checked"), &registrar())
                .await
        })
    };
    let model = {
        let store = store.clone();
        let id = record.id.clone();
        tokio::spawn(async move {
            let patch = RequestPatch {
                device_model: Some("Chromebook".to_string()),
                ..RequestPatch::default()
            };
            store.patch_fields(id, patch, &it_staff()).await
        })
    };

    for handle in [note, model] {
        handle
            .await
            .map_err(|e| RequestError::Storage(format!("patch task failed: {e}")))??;
    }

    let stored = store.get(record.id.clone()).await?;
    let stored = stored.ok_or(RequestError::NotFound(record.id))?;
    assert_eq!(stored.note.as_deref(), Some("checked"));
    assert_eq!(stored.device_model.as_deref(), Some("Chromebook"));
    Ok(())
}

//! Request store: the operations callers use.
//!
//! [`RequestStore`] composes a [`RequestRepository`], an [`AuditLog`] and a
//! [`Clock`]. It validates input, delegates the atomic read-check-write to
//! the repository, and appends one audit entry per successful mutation.
//!
//! # Example
//!
//! ```
//! use removal_desk_core::environment::SystemClock;
//! use removal_desk_core::{Actor, RequestDraft, RequestStatus, RequestStore, Role};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RequestStore::in_memory(Arc::new(SystemClock));
//!
//! let record = store
//!     .create(RequestDraft::new("p1", "AB-01", "Student", "C1", "lost"))
//!     .await?;
//!
//! let forwarded = store
//!     .transition_status(
//!         record.id.clone(),
//!         RequestStatus::PendingIt,
//!         &Actor::new(Role::Registrar, "registrar"),
//!     )
//!     .await?;
//! assert_eq!(forwarded.status, RequestStatus::PendingIt);
//! # Ok(())
//! # }
//! ```

use crate::audit::{AuditEntry, AuditFilter, AuditLog, InMemoryAuditLog, NewAuditEntry, actions};
use crate::environment::Clock;
use crate::error::{RequestError, Result};
use crate::memory::InMemoryRequestRepository;
use crate::repository::{RequestMutation, RequestRepository};
use crate::types::{Actor, RequestDraft, RequestId, RequestPatch, RequestRecord, RequestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Point-in-time counters for health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Backend name
    pub backend: String,
    /// Current id counter
    pub counter: u64,
    /// Stored requests
    pub requests: usize,
    /// Stored audit entries
    pub audit_entries: usize,
    /// When the snapshot was taken
    pub time: DateTime<Utc>,
}

/// Facade over request storage and the audit log.
///
/// Cloning is cheap; clones share the same backends.
#[derive(Clone)]
pub struct RequestStore {
    requests: Arc<dyn RequestRepository>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
}

impl RequestStore {
    /// Compose a store from its backends.
    #[must_use]
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        audit: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            requests,
            audit,
            clock,
        }
    }

    /// Store backed entirely by memory.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(InMemoryRequestRepository::new()),
            Arc::new(InMemoryAuditLog::new(Arc::clone(&clock))),
            clock,
        )
    }

    /// Name of the request backend.
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.requests.backend()
    }

    /// Submit a new request.
    ///
    /// Validates the draft, then lets the repository run the duplicate guard
    /// and insert atomically. Writes a `"Submitted request"` audit entry for
    /// the owner.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Validation`] for missing fields or a taken id
    /// - [`RequestError::DuplicateActiveRequest`] if the device already has an
    ///   active request from this owner
    /// - [`RequestError::Storage`] on backend failure
    pub async fn create(&self, draft: RequestDraft) -> Result<RequestRecord> {
        draft.validate()?;

        let now = self.clock.now();
        let record = self.requests.insert(draft, now).await?;

        info!(
            request_id = %record.id,
            owner = %record.owner_key,
            serial = %record.serial,
            "Request submitted"
        );
        metrics::counter!("removal_desk.requests.created").increment(1);

        self.record_audit(
            NewAuditEntry::new(&record.owner_key, actions::SUBMITTED)
                .for_request(record.id.clone())
                .at(now),
        )
        .await;

        Ok(record)
    }

    /// Fetch one request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Storage`] on backend failure.
    pub async fn get(&self, id: RequestId) -> Result<Option<RequestRecord>> {
        debug!(request_id = %id, "Loading request");
        self.requests.get(id).await
    }

    /// All requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Storage`] on backend failure.
    pub async fn list(&self) -> Result<Vec<RequestRecord>> {
        let records = self.requests.list().await?;
        debug!(count = records.len(), "Listed requests");
        Ok(records)
    }

    /// Most recent active request for this owner and device, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Storage`] on backend failure.
    pub async fn find_active_conflict(
        &self,
        owner_key: &str,
        serial: &str,
    ) -> Result<Option<RequestRecord>> {
        self.requests
            .find_active_conflict(owner_key.to_string(), serial.to_string())
            .await
    }

    /// Edit business fields, audited as `"Updated request"`.
    ///
    /// # Errors
    ///
    /// See [`RequestStore::patch_fields_with_action`].
    pub async fn patch_fields(
        &self,
        id: RequestId,
        patch: RequestPatch,
        actor: &Actor,
    ) -> Result<RequestRecord> {
        self.patch_fields_with_action(id, patch, actor, None, None)
            .await
    }

    /// Edit business fields with a custom audit label and detail.
    ///
    /// Status, id and owner cannot be changed this way. Edits made after
    /// approval are allowed and audited like any other.
    ///
    /// # Errors
    ///
    /// - [`RequestError::NotFound`] if no request has this id
    /// - [`RequestError::Validation`] if the patch blanks a required field
    /// - [`RequestError::DuplicateActiveRequest`] if the new serial collides
    ///   with another active request of the same owner
    /// - [`RequestError::Storage`] on backend failure
    pub async fn patch_fields_with_action(
        &self,
        id: RequestId,
        patch: RequestPatch,
        actor: &Actor,
        action: Option<String>,
        detail: Option<String>,
    ) -> Result<RequestRecord> {
        let now = self.clock.now();
        let record = self
            .requests
            .update(id, RequestMutation::Patch(patch), now)
            .await?;

        info!(request_id = %record.id, user = %actor.user_key, "Request fields updated");
        metrics::counter!("removal_desk.requests.patched").increment(1);

        let action = action
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| actions::UPDATED.to_string());
        let mut entry = NewAuditEntry::new(actor.audit_user(), action)
            .for_request(record.id.clone())
            .at(now);
        if let Some(detail) = detail {
            entry = entry.with_detail(detail);
        }
        self.record_audit(entry).await;

        Ok(record)
    }

    /// Move a request to another status on behalf of `actor`.
    ///
    /// Staff re-saving the current status is allowed and still stamps
    /// `updatedAt` and writes an audit entry.
    ///
    /// # Errors
    ///
    /// - [`RequestError::NotFound`] if no request has this id
    /// - [`RequestError::AccessDenied`] for roles without transition rights
    /// - [`RequestError::InvalidTransition`] for steps outside the role's rights
    /// - [`RequestError::Storage`] on backend failure
    pub async fn transition_status(
        &self,
        id: RequestId,
        to: RequestStatus,
        actor: &Actor,
    ) -> Result<RequestRecord> {
        let now = self.clock.now();
        let mutation = RequestMutation::Transition {
            to,
            role: actor.role,
        };

        let record = match self.requests.update(id.clone(), mutation, now).await {
            Ok(record) => record,
            Err(err) => {
                if matches!(
                    err,
                    RequestError::AccessDenied { .. } | RequestError::InvalidTransition { .. }
                ) {
                    warn!(request_id = %id, role = %actor.role, to = %to, error = %err, "Transition denied");
                    metrics::counter!("removal_desk.transitions.denied").increment(1);
                }
                return Err(err);
            }
        };

        info!(
            request_id = %record.id,
            role = %actor.role,
            status = %record.status,
            "Request status changed"
        );
        metrics::counter!("removal_desk.transitions.applied").increment(1);

        self.record_audit(
            NewAuditEntry::new(actor.audit_user(), actions::status_changed(to))
                .for_request(record.id.clone())
                .at(now),
        )
        .await;

        Ok(record)
    }

    /// Append an entry on behalf of an external collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Storage`] if the log cannot persist it.
    pub async fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
        Ok(self.audit.append(entry).await?)
    }

    /// Read the audit log, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Storage`] if the log cannot be read.
    pub async fn list_audit(&self, filter: AuditFilter) -> Result<Vec<AuditEntry>> {
        Ok(self.audit.list(filter).await?)
    }

    /// Counters for health checks.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Storage`] if a backend cannot be read.
    pub async fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(StoreSnapshot {
            backend: self.requests.backend().to_string(),
            counter: self.requests.counter().await?,
            requests: self.requests.count().await?,
            audit_entries: self.audit.count().await?,
            time: self.clock.now(),
        })
    }

    // The mutation has already committed; a failed audit append is logged,
    // not surfaced.
    async fn record_audit(&self, entry: NewAuditEntry) {
        if let Err(err) = self.audit.append(entry).await {
            error!(error = %err, "Failed to append audit entry");
            metrics::counter!("removal_desk.audit.failures").increment(1);
        }
    }
}

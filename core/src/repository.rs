//! Storage seam for request records.
//!
//! A repository owns the request table and the id counter. Every method that
//! writes does its read-check-write under one lock or one transaction, so the
//! duplicate guard and the transition policy are evaluated against the state
//! the write lands on.

use crate::error::Result;
use crate::policy;
use crate::types::{RequestDraft, RequestId, RequestPatch, RequestRecord, RequestStatus, Role};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

/// A change to apply to one stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMutation {
    /// Merge business fields.
    Patch(RequestPatch),
    /// Move to another status on behalf of `role`.
    Transition {
        /// Target status
        to: RequestStatus,
        /// Acting role
        role: Role,
    },
}

impl RequestMutation {
    /// Apply to a copy of the current record.
    ///
    /// The record is only modified when the mutation is allowed; `updated_at`
    /// is stamped on success.
    ///
    /// # Errors
    ///
    /// Validation errors from the patch, or the policy denial for a transition.
    pub fn apply(&self, record: &mut RequestRecord, now: DateTime<Utc>) -> Result<()> {
        match self {
            Self::Patch(patch) => patch.apply(record)?,
            Self::Transition { to, role } => {
                policy::authorize(*role, record.status, *to)?;
                record.status = *to;
            }
        }
        record.updated_at = Some(now);
        Ok(())
    }
}

/// Request storage backend.
///
/// Uses boxed futures so the repository can live behind
/// `Arc<dyn RequestRepository>`.
pub trait RequestRepository: Send + Sync {
    /// Short backend name for diagnostics (`"memory"`, `"postgres"`).
    fn backend(&self) -> &'static str;

    /// Store a new record built from `draft`.
    ///
    /// Atomically: runs the duplicate guard, checks an explicit id is free,
    /// allocates the id when none is given, and inserts.
    ///
    /// # Errors
    ///
    /// - [`crate::RequestError::DuplicateActiveRequest`] if the guard trips
    /// - [`crate::RequestError::Validation`] if an explicit id is taken
    /// - [`crate::RequestError::Storage`] on backend failure
    fn insert(&self, draft: RequestDraft, now: DateTime<Utc>) -> BoxFuture<'_, Result<RequestRecord>>;

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RequestError::Storage`] on backend failure.
    fn get(&self, id: RequestId) -> BoxFuture<'_, Result<Option<RequestRecord>>>;

    /// All records, newest id first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RequestError::Storage`] on backend failure.
    fn list(&self) -> BoxFuture<'_, Result<Vec<RequestRecord>>>;

    /// Most recent active record for this owner and serial.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RequestError::Storage`] on backend failure.
    fn find_active_conflict(
        &self,
        owner_key: String,
        serial: String,
    ) -> BoxFuture<'_, Result<Option<RequestRecord>>>;

    /// Read, mutate and write one record atomically.
    ///
    /// If the mutation moves an active record onto another serial the
    /// duplicate guard runs, excluding the record itself.
    ///
    /// # Errors
    ///
    /// - [`crate::RequestError::NotFound`] if no record has this id
    /// - whatever [`RequestMutation::apply`] or the guard returns
    /// - [`crate::RequestError::Storage`] on backend failure
    fn update(
        &self,
        id: RequestId,
        mutation: RequestMutation,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<RequestRecord>>;

    /// Current value of the id counter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RequestError::Storage`] on backend failure.
    fn counter(&self) -> BoxFuture<'_, Result<u64>>;

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RequestError::Storage`] on backend failure.
    fn count(&self) -> BoxFuture<'_, Result<usize>>;
}

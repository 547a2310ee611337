//! Append-only audit log.
//!
//! Every successful mutation of a request appends one entry. External
//! collaborators (account screens, password changes) may append their own
//! entries through the same API. There is no update or delete.
//!
//! # Example
//!
//! ```
//! use removal_desk_core::audit::{AuditFilter, AuditLog, InMemoryAuditLog, NewAuditEntry};
//! use removal_desk_core::environment::SystemClock;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let log = InMemoryAuditLog::new(Arc::new(SystemClock));
//!
//! log.append(NewAuditEntry::new("it", "Changed password")).await?;
//!
//! let entries = log.list(AuditFilter::new().limit(10)).await?;
//! assert_eq!(entries[0].action, "Changed password");
//! # Ok(())
//! # }
//! ```

use crate::environment::Clock;
use crate::error::AuditError;
use crate::types::RequestId;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Action labels written by the request store.
pub mod actions {
    use crate::types::RequestStatus;

    /// A parent submitted a new request.
    pub const SUBMITTED: &str = "Submitted request";

    /// Staff edited fields without a more specific label.
    pub const UPDATED: &str = "Updated request";

    /// Label for a status change.
    #[must_use]
    pub fn status_changed(to: RequestStatus) -> String {
        format!("Status -> {to}")
    }
}

/// A stored audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// When the action happened
    pub time: DateTime<Utc>,
    /// Who performed it (user key, role, or `"system"`)
    pub user: String,
    /// What was done (`"Submitted request"`, `"Status -> pending_it"`, ...)
    pub action: String,
    /// Request concerned, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    /// Free-form detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Entry to append; `time` is filled in by the log when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAuditEntry {
    /// Explicit timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Acting user
    pub user: String,
    /// Action label
    pub action: String,
    /// Request concerned; blank strings on the wire mean none
    #[serde(
        deserialize_with = "crate::types::blank_request_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_id: Option<RequestId>,
    /// Free-form detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl NewAuditEntry {
    /// Entry for `user` performing `action`.
    #[must_use]
    pub fn new(user: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    /// Attach the request concerned.
    #[must_use]
    pub fn for_request(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Attach a detail string.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Pin the timestamp.
    #[must_use]
    pub const fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Complete the entry. Blank user becomes `"system"`, blank action `"log"`.
    #[must_use]
    pub fn into_entry(self, now: DateTime<Utc>) -> AuditEntry {
        let or_default = |value: String, default: &str| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                default.to_string()
            } else {
                trimmed.to_string()
            }
        };

        AuditEntry {
            time: self.time.unwrap_or(now),
            user: or_default(self.user, "system"),
            action: or_default(self.action, "log"),
            request_id: self.request_id,
            detail: self
                .detail
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }
}

/// Read-side filter over the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    /// Only entries about this request
    pub request_id: Option<RequestId>,
    /// Only entries by this user
    pub user: Option<String>,
    /// Only entries with this action label
    pub action: Option<String>,
    /// Maximum results (newest first)
    pub limit: Option<usize>,
}

impl AuditFilter {
    /// Create a new empty filter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            request_id: None,
            user: None,
            action: None,
            limit: None,
        }
    }

    /// Filter by request
    #[must_use]
    pub fn request(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Filter by user
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Filter by action label
    #[must_use]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Set result limit
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if entry matches filter
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(ref id) = self.request_id {
            if entry.request_id.as_ref() != Some(id) {
                return false;
            }
        }
        if let Some(ref user) = self.user {
            if &entry.user != user {
                return false;
            }
        }
        if let Some(ref action) = self.action {
            if &entry.action != action {
                return false;
            }
        }
        true
    }

    /// Sort newest first, filter, and truncate.
    ///
    /// The sort is stable, so entries sharing a timestamp keep the order they
    /// arrived in (callers pass them newest-insert-first).
    #[must_use]
    pub fn apply(&self, mut entries: Vec<AuditEntry>) -> Vec<AuditEntry> {
        entries.sort_by(|a, b| b.time.cmp(&a.time));
        let mut results: Vec<AuditEntry> =
            entries.into_iter().filter(|e| self.matches(e)).collect();
        if let Some(limit) = self.limit {
            results.truncate(limit);
        }
        results
    }
}

/// Audit log backend.
///
/// Uses boxed futures so the log can live behind `Arc<dyn AuditLog>`.
pub trait AuditLog: Send + Sync {
    /// Append an entry, filling `time` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] if the backend cannot persist the entry.
    fn append(&self, entry: NewAuditEntry) -> BoxFuture<'_, Result<AuditEntry, AuditError>>;

    /// Entries matching `filter`, newest first by `time`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] if the backend cannot be read.
    fn list(&self, filter: AuditFilter) -> BoxFuture<'_, Result<Vec<AuditEntry>, AuditError>>;

    /// Number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] if the backend cannot be read.
    fn count(&self) -> BoxFuture<'_, Result<usize, AuditError>>;
}

/// In-process audit log.
///
/// Entries are prepended, so the backing vector is newest-insert-first.
#[derive(Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryAuditLog {
    /// Create an empty log.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            clock,
        }
    }

    /// Drop every entry (test isolation only).
    pub async fn reset(&self) {
        self.entries.write().await.clear();
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, entry: NewAuditEntry) -> BoxFuture<'_, Result<AuditEntry, AuditError>> {
        Box::pin(async move {
            let entry = entry.into_entry(self.clock.now());
            self.entries.write().await.insert(0, entry.clone());
            Ok(entry)
        })
    }

    fn list(&self, filter: AuditFilter) -> BoxFuture<'_, Result<Vec<AuditEntry>, AuditError>> {
        Box::pin(async move {
            let entries = self.entries.read().await.clone();
            Ok(filter.apply(entries))
        })
    }

    fn count(&self) -> BoxFuture<'_, Result<usize, AuditError>> {
        Box::pin(async move { Ok(self.entries.read().await.len()) })
    }
}

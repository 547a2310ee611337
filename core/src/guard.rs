//! Duplicate-active-request guard.
//!
//! At most one request per (owner, normalized serial) may sit in the active
//! set (`submitted`, `pending_it`). Backends call [`ensure_no_active_conflict`]
//! under their write lock (in-process) or inside the create transaction
//! (Postgres, where a partial unique index backs it up).

use crate::error::{RequestError, Result};
use crate::types::{RequestId, RequestRecord};

/// Normalize a device serial for comparison.
///
/// Trims, upper-cases and removes every whitespace character. Hyphens and
/// other punctuation are kept.
///
/// ```
/// use removal_desk_core::guard::normalize_serial;
///
/// assert_eq!(normalize_serial("  ab-01 "), "AB-01");
/// assert_eq!(normalize_serial("AB 01"), "AB01");
/// ```
#[must_use]
pub fn normalize_serial(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Find the most recent active request for `owner_key` and `serial_raw`.
///
/// Only records in the active set are considered. If several match, the one
/// with the greatest id wins.
pub fn find_active_conflict<'a, I>(
    records: I,
    owner_key: &str,
    serial_raw: &str,
) -> Option<&'a RequestRecord>
where
    I: IntoIterator<Item = &'a RequestRecord>,
{
    let owner_key = owner_key.trim();
    let serial = normalize_serial(serial_raw);
    records
        .into_iter()
        .filter(|r| r.is_active() && r.owner_key == owner_key && r.normalized_serial() == serial)
        .max_by(|a, b| a.id.cmp(&b.id))
}

/// Fail with [`RequestError::DuplicateActiveRequest`] if a conflict exists.
///
/// `exclude` skips the record being edited, so re-saving a request never
/// conflicts with itself.
///
/// # Errors
///
/// Returns [`RequestError::DuplicateActiveRequest`] carrying the conflicting
/// id and status.
pub fn ensure_no_active_conflict<'a, I>(
    records: I,
    owner_key: &str,
    serial_raw: &str,
    exclude: Option<&RequestId>,
) -> Result<()>
where
    I: IntoIterator<Item = &'a RequestRecord>,
{
    let candidates = records
        .into_iter()
        .filter(|r| exclude.is_none_or(|id| &r.id != id));

    match find_active_conflict(candidates, owner_key, serial_raw) {
        Some(existing) => {
            tracing::warn!(
                conflicting_id = %existing.id,
                status = %existing.status,
                owner = owner_key,
                "Duplicate active request rejected"
            );
            Err(RequestError::DuplicateActiveRequest {
                id: existing.id.clone(),
                status: existing.status,
            })
        }
        None => Ok(()),
    }
}

/// Whether an edit moved an active record onto a different serial.
#[must_use]
pub fn serial_changed_while_active(before: &RequestRecord, after: &RequestRecord) -> bool {
    after.is_active() && before.normalized_serial() != after.normalized_serial()
}

//! In-process request repository.
//!
//! One `tokio::sync::Mutex` guards the counter and the table together, so
//! the duplicate guard and the insert it protects can never interleave with
//! another writer. Intended for tests and single-instance deployments; state
//! is lost on restart.

use crate::error::{RequestError, Result};
use crate::guard;
use crate::id::IdAllocator;
use crate::repository::{RequestMutation, RequestRepository};
use crate::types::{RequestDraft, RequestId, RequestRecord};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Table {
    ids: IdAllocator,
    records: BTreeMap<RequestId, RequestRecord>,
}

/// Request repository held entirely in memory.
///
/// Cloning shares the same table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRequestRepository {
    table: Arc<Mutex<Table>>,
}

impl InMemoryRequestRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all records and restart the counter (test isolation only).
    pub async fn reset(&self) {
        let mut table = self.table.lock().await;
        *table = Table::default();
    }
}

impl RequestRepository for InMemoryRequestRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn insert(&self, draft: RequestDraft, now: DateTime<Utc>) -> BoxFuture<'_, Result<RequestRecord>> {
        Box::pin(async move {
            let mut table = self.table.lock().await;

            guard::ensure_no_active_conflict(
                table.records.values(),
                &draft.owner_key,
                &draft.serial,
                None,
            )?;

            let id = match draft.id.clone() {
                Some(id) => {
                    if table.records.contains_key(&id) {
                        return Err(RequestError::validation(
                            "id",
                            format!("request {id} already exists"),
                        ));
                    }
                    table.ids.observe(&id);
                    id
                }
                None => table.ids.next_id()?,
            };

            let record = draft.into_record(id, now);
            table.records.insert(record.id.clone(), record.clone());
            Ok(record)
        })
    }

    fn get(&self, id: RequestId) -> BoxFuture<'_, Result<Option<RequestRecord>>> {
        Box::pin(async move { Ok(self.table.lock().await.records.get(&id).cloned()) })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<RequestRecord>>> {
        Box::pin(async move {
            let table = self.table.lock().await;
            Ok(table.records.values().rev().cloned().collect())
        })
    }

    fn find_active_conflict(
        &self,
        owner_key: String,
        serial: String,
    ) -> BoxFuture<'_, Result<Option<RequestRecord>>> {
        Box::pin(async move {
            let table = self.table.lock().await;
            Ok(guard::find_active_conflict(table.records.values(), &owner_key, &serial).cloned())
        })
    }

    fn update(
        &self,
        id: RequestId,
        mutation: RequestMutation,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<RequestRecord>> {
        Box::pin(async move {
            let mut table = self.table.lock().await;
            let records = &mut table.records;

            let current = records
                .get(&id)
                .ok_or_else(|| RequestError::NotFound(id.clone()))?;

            let mut updated = current.clone();
            mutation.apply(&mut updated, now)?;

            if guard::serial_changed_while_active(current, &updated) {
                guard::ensure_no_active_conflict(
                    records.values(),
                    &updated.owner_key,
                    &updated.serial,
                    Some(&id),
                )?;
            }

            records.insert(id, updated.clone());
            Ok(updated)
        })
    }

    fn counter(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move { Ok(self.table.lock().await.ids.current()) })
    }

    fn count(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move { Ok(self.table.lock().await.records.len()) })
    }
}

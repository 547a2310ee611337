//! `PostgreSQL` audit log.
//!
//! Entries are JSONB documents in `audit_log`; `time` and `request_id` are
//! copied into columns for ordering and lookup. `seq` breaks ties between
//! entries sharing a timestamp.

use futures::future::BoxFuture;
use removal_desk_core::environment::Clock;
use removal_desk_core::{AuditEntry, AuditError, AuditFilter, AuditLog, NewAuditEntry};
use sqlx::PgPool;
use std::sync::Arc;

fn storage(context: &'static str) -> impl FnOnce(sqlx::Error) -> AuditError {
    move |e| AuditError::Storage(format!("Failed to {context}: {e}"))
}

/// `PostgreSQL`-backed [`AuditLog`].
#[derive(Clone)]
pub struct PostgresAuditLog {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PostgresAuditLog {
    /// Create a log over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Delete every entry (test isolation only).
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Storage`] if the statement fails.
    pub async fn reset(&self) -> Result<(), AuditError> {
        sqlx::query("TRUNCATE audit_log")
            .execute(&self.pool)
            .await
            .map_err(storage("truncate audit log"))?;
        Ok(())
    }
}

impl AuditLog for PostgresAuditLog {
    fn append(&self, entry: NewAuditEntry) -> BoxFuture<'_, Result<AuditEntry, AuditError>> {
        Box::pin(async move {
            let entry = entry.into_entry(self.clock.now());
            let data = serde_json::to_value(&entry)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;

            sqlx::query("INSERT INTO audit_log (time, request_id, data) VALUES ($1, $2, $3)")
                .bind(entry.time)
                .bind(entry.request_id.as_ref().map(ToString::to_string))
                .bind(data)
                .execute(&self.pool)
                .await
                .map_err(storage("append audit entry"))?;

            tracing::debug!(user = %entry.user, action = %entry.action, "Audit entry appended");
            Ok(entry)
        })
    }

    fn list(&self, filter: AuditFilter) -> BoxFuture<'_, Result<Vec<AuditEntry>, AuditError>> {
        Box::pin(async move {
            let limit = filter
                .limit
                .map(|l| i64::try_from(l).unwrap_or(i64::MAX));

            let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
                r"
                SELECT data
                FROM audit_log
                WHERE ($1::text IS NULL OR request_id = $1)
                  AND ($2::text IS NULL OR data->>'user' = $2)
                  AND ($3::text IS NULL OR data->>'action' = $3)
                ORDER BY time DESC, seq DESC
                LIMIT $4
                ",
            )
            .bind(filter.request_id.as_ref().map(ToString::to_string))
            .bind(filter.user.as_deref())
            .bind(filter.action.as_deref())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("list audit entries"))?;

            rows.into_iter()
                .map(|(data,)| {
                    serde_json::from_value(data)
                        .map_err(|e| AuditError::Serialization(e.to_string()))
                })
                .collect()
        })
    }

    fn count(&self) -> BoxFuture<'_, Result<usize, AuditError>> {
        Box::pin(async move {
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_log")
                .fetch_one(&self.pool)
                .await
                .map_err(storage("count audit entries"))?;
            usize::try_from(count)
                .map_err(|_| AuditError::Storage(format!("Invalid audit count {count}")))
        })
    }
}

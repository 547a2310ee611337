//! `PostgreSQL` request repository.
//!
//! Records are stored as JSONB documents. `owner_key`, `norm_serial` and
//! `status` are copied into columns so the partial unique index
//! [`ACTIVE_OWNER_SERIAL_INDEX`] can back the duplicate guard.
//!
//! Creates serialize on the `request_counter` row (`SELECT ... FOR UPDATE`).
//! Updates lock the target row and bump its `version`.

use crate::schema::{ACTIVE_OWNER_SERIAL_INDEX, REQUESTS_PKEY};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use removal_desk_core::guard::{self, normalize_serial};
use removal_desk_core::{
    RequestDraft, RequestError, RequestId, RequestMutation, RequestRecord, RequestRepository,
    Result,
};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

fn storage(context: &'static str) -> impl FnOnce(sqlx::Error) -> RequestError {
    move |e| RequestError::Storage(format!("Failed to {context}: {e}"))
}

fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            db_err.constraint().map(ToString::to_string)
        }
        _ => None,
    }
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| RequestError::Storage(format!("Counter value {value} exceeds i64::MAX")))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| RequestError::Storage(format!("Negative counter value {value} in database")))
}

/// `PostgreSQL`-backed [`RequestRepository`].
///
/// # Example
///
/// ```no_run
/// use removal_desk_postgres::{PostgresRequestRepository, ensure_schema};
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// ensure_schema(&pool).await?;
/// let repo = PostgresRequestRepository::new(pool);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresRequestRepository {
    pool: PgPool,
}

impl PostgresRequestRepository {
    /// Create a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Delete every request and restart the counter (test isolation only).
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Storage`] if the statements fail.
    pub async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(storage("start transaction"))?;
        sqlx::query("TRUNCATE requests")
            .execute(&mut *tx)
            .await
            .map_err(storage("truncate requests"))?;
        sqlx::query("UPDATE request_counter SET value = 0 WHERE id = 1")
            .execute(&mut *tx)
            .await
            .map_err(storage("reset counter"))?;
        tx.commit().await.map_err(storage("commit transaction"))?;
        tracing::warn!("Request table reset");
        Ok(())
    }

    /// Most recent active record for owner and serial, optionally skipping one id.
    async fn active_conflict(
        conn: &mut PgConnection,
        owner_key: &str,
        serial: &str,
        exclude: Option<&RequestId>,
    ) -> Result<Option<RequestRecord>> {
        let row: Option<(Json<RequestRecord>,)> = sqlx::query_as(
            r"
            SELECT data
            FROM requests
            WHERE owner_key = $1
              AND norm_serial = $2
              AND status IN ('submitted', 'pending_it')
              AND ($3::text IS NULL OR id <> $3)
            ORDER BY id DESC
            LIMIT 1
            ",
        )
        .bind(owner_key.trim())
        .bind(normalize_serial(serial))
        .bind(exclude.map(RequestId::as_str))
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage("query active requests"))?;

        Ok(row.map(|(Json(record),)| record))
    }

    fn duplicate(existing: &RequestRecord, owner_key: &str) -> RequestError {
        tracing::warn!(
            conflicting_id = %existing.id,
            status = %existing.status,
            owner = owner_key,
            "Duplicate active request rejected"
        );
        metrics::counter!("removal_desk.requests.duplicates").increment(1);
        RequestError::DuplicateActiveRequest {
            id: existing.id.clone(),
            status: existing.status,
        }
    }

    /// Translate a unique violation raised by a write that lost a race.
    ///
    /// The failed transaction is gone, so the conflict is re-read from the
    /// pool.
    async fn unique_violation(
        &self,
        err: sqlx::Error,
        record: &RequestRecord,
        context: &'static str,
    ) -> RequestError {
        match violated_constraint(&err).as_deref() {
            Some(ACTIVE_OWNER_SERIAL_INDEX) => {
                let found = match self.pool.acquire().await {
                    Ok(mut conn) => {
                        Self::active_conflict(
                            &mut *conn,
                            &record.owner_key,
                            &record.serial,
                            Some(&record.id),
                        )
                        .await
                    }
                    Err(e) => Err(storage("acquire connection")(e)),
                };
                match found {
                    Ok(Some(existing)) => Self::duplicate(&existing, &record.owner_key),
                    Ok(None) => RequestError::Storage(format!(
                        "Failed to {context}: active request conflict is no longer visible"
                    )),
                    Err(e) => e,
                }
            }
            Some(REQUESTS_PKEY) => {
                RequestError::validation("id", format!("request {} already exists", record.id))
            }
            _ => storage(context)(err),
        }
    }
}

impl RequestRepository for PostgresRequestRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn insert(&self, draft: RequestDraft, now: DateTime<Utc>) -> BoxFuture<'_, Result<RequestRecord>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(storage("start transaction"))?;

            // Serializes creators for the rest of the transaction.
            let (counter,): (i64,) =
                sqlx::query_as("SELECT value FROM request_counter WHERE id = 1 FOR UPDATE")
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(storage("lock request counter"))?;
            let counter = to_u64(counter)?;

            if let Some(existing) =
                Self::active_conflict(&mut *tx, &draft.owner_key, &draft.serial, None).await?
            {
                return Err(Self::duplicate(&existing, &draft.owner_key));
            }

            let id = match draft.id.clone() {
                Some(id) => {
                    let taken: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM requests WHERE id = $1")
                        .bind(id.as_str())
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(storage("check request id"))?;
                    if taken.is_some() {
                        return Err(RequestError::validation(
                            "id",
                            format!("request {id} already exists"),
                        ));
                    }
                    id
                }
                None => RequestId::after(counter)?,
            };
            let next_counter = counter.max(id.value());

            let record = draft.into_record(id, now);
            let inserted = sqlx::query(
                r"
                INSERT INTO requests (id, owner_key, norm_serial, status, created_at, data)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(record.id.as_str())
            .bind(&record.owner_key)
            .bind(record.normalized_serial())
            .bind(record.status.as_str())
            .bind(record.submitted_at)
            .bind(Json(&record))
            .execute(&mut *tx)
            .await;
            if let Err(e) = inserted {
                drop(tx);
                return Err(self.unique_violation(e, &record, "insert request").await);
            }

            sqlx::query("UPDATE request_counter SET value = $1 WHERE id = 1")
                .bind(to_i64(next_counter)?)
                .execute(&mut *tx)
                .await
                .map_err(storage("advance request counter"))?;

            tx.commit().await.map_err(storage("commit transaction"))?;
            Ok(record)
        })
    }

    fn get(&self, id: RequestId) -> BoxFuture<'_, Result<Option<RequestRecord>>> {
        Box::pin(async move {
            let row: Option<(Json<RequestRecord>,)> =
                sqlx::query_as("SELECT data FROM requests WHERE id = $1")
                    .bind(id.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(storage("load request"))?;
            Ok(row.map(|(Json(record),)| record))
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<RequestRecord>>> {
        Box::pin(async move {
            let rows: Vec<(Json<RequestRecord>,)> =
                sqlx::query_as("SELECT data FROM requests ORDER BY id DESC")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(storage("list requests"))?;
            Ok(rows.into_iter().map(|(Json(record),)| record).collect())
        })
    }

    fn find_active_conflict(
        &self,
        owner_key: String,
        serial: String,
    ) -> BoxFuture<'_, Result<Option<RequestRecord>>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(storage("acquire connection"))?;
            Self::active_conflict(&mut *conn, &owner_key, &serial, None).await
        })
    }

    fn update(
        &self,
        id: RequestId,
        mutation: RequestMutation,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<RequestRecord>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(storage("start transaction"))?;

            let row: Option<(Json<RequestRecord>, i64)> =
                sqlx::query_as("SELECT data, version FROM requests WHERE id = $1 FOR UPDATE")
                    .bind(id.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(storage("lock request"))?;
            let Some((Json(current), version)) = row else {
                return Err(RequestError::NotFound(id));
            };

            let mut updated = current.clone();
            mutation.apply(&mut updated, now)?;

            if guard::serial_changed_while_active(&current, &updated) {
                if let Some(existing) = Self::active_conflict(
                    &mut *tx,
                    &updated.owner_key,
                    &updated.serial,
                    Some(&id),
                )
                .await?
                {
                    return Err(Self::duplicate(&existing, &updated.owner_key));
                }
            }

            let written = sqlx::query(
                r"
                UPDATE requests
                SET data = $1,
                    status = $2,
                    norm_serial = $3,
                    version = version + 1
                WHERE id = $4 AND version = $5
                ",
            )
            .bind(Json(&updated))
            .bind(updated.status.as_str())
            .bind(updated.normalized_serial())
            .bind(id.as_str())
            .bind(version)
            .execute(&mut *tx)
            .await;

            let written = match written {
                Ok(result) => result,
                Err(e) => {
                    drop(tx);
                    return Err(self.unique_violation(e, &updated, "update request").await);
                }
            };
            if written.rows_affected() == 0 {
                return Err(RequestError::Storage(format!(
                    "Request {id} changed concurrently (expected version {version})"
                )));
            }

            tx.commit().await.map_err(storage("commit transaction"))?;

            tracing::debug!(request_id = %id, version = version + 1, "Request row updated");
            Ok(updated)
        })
    }

    fn counter(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let (value,): (i64,) = sqlx::query_as("SELECT value FROM request_counter WHERE id = 1")
                .fetch_one(&self.pool)
                .await
                .map_err(storage("read request counter"))?;
            to_u64(value)
        })
    }

    fn count(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move {
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM requests")
                .fetch_one(&self.pool)
                .await
                .map_err(storage("count requests"))?;
            usize::try_from(count)
                .map_err(|_| RequestError::Storage(format!("Invalid request count {count}")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_conversions() {
        assert_eq!(to_i64(42), Ok(42));
        assert!(to_i64(u64::MAX).is_err());
        assert_eq!(to_u64(7), Ok(7));
        assert!(to_u64(-1).is_err());
    }

    #[test]
    fn test_non_database_errors_have_no_constraint() {
        assert_eq!(violated_constraint(&sqlx::Error::RowNotFound), None);
    }

    #[test]
    fn test_storage_error_names_context() {
        let err = storage("load request")(sqlx::Error::RowNotFound);
        assert!(matches!(err, RequestError::Storage(ref m) if m.starts_with("Failed to load request")));
    }
}

//! `PostgreSQL` backend for the removal desk.
//!
//! Implements [`RequestRepository`] and [`AuditLog`] from
//! `removal-desk-core` on top of sqlx:
//!
//! - Requests as JSONB documents with denormalized guard columns
//! - A partial unique index enforcing one active request per owner and device
//! - Row-locked counter for sequential ids
//! - Append-only audit table
//!
//! # Example
//!
//! ```no_run
//! use removal_desk_core::environment::SystemClock;
//! use removal_desk_postgres::{connect, ensure_schema, request_store};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect("postgres://localhost/removal_desk", 10, Duration::from_secs(30)).await?;
//! ensure_schema(&pool).await?;
//! let store = request_store(pool, Arc::new(SystemClock));
//! # Ok(())
//! # }
//! ```
//!
//! [`RequestRepository`]: removal_desk_core::RequestRepository
//! [`AuditLog`]: removal_desk_core::AuditLog

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod requests;
pub mod schema;

pub use audit::PostgresAuditLog;
pub use requests::PostgresRequestRepository;
pub use schema::ensure_schema;

use removal_desk_core::RequestStore;
use removal_desk_core::environment::Clock;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// Open a connection pool.
///
/// # Errors
///
/// Returns the `sqlx::Error` if no connection can be established within
/// `connect_timeout`.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    connect_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(connect_timeout)
        .connect(database_url)
        .await?;
    tracing::info!(max_connections, "Connected to PostgreSQL");
    Ok(pool)
}

/// Store with both the requests and the audit log in `pool`.
#[must_use]
pub fn request_store(pool: PgPool, clock: Arc<dyn Clock>) -> RequestStore {
    RequestStore::new(
        Arc::new(PostgresRequestRepository::new(pool.clone())),
        Arc::new(PostgresAuditLog::new(pool, Arc::clone(&clock))),
        clock,
    )
}

//! Idempotent schema bootstrap.
//!
//! Every statement is `IF NOT EXISTS` / `ON CONFLICT DO NOTHING`, so running
//! it against an existing database is a no-op.

use sqlx::PgPool;

/// Name of the partial unique index backing the duplicate guard.
pub const ACTIVE_OWNER_SERIAL_INDEX: &str = "requests_active_owner_serial";

/// Name of the primary key constraint on `requests`.
pub const REQUESTS_PKEY: &str = "requests_pkey";

const STATEMENTS: &[(&str, &str)] = &[
    (
        "requests table",
        r"
        CREATE TABLE IF NOT EXISTS requests (
            id TEXT PRIMARY KEY,
            owner_key TEXT NOT NULL,
            norm_serial TEXT NOT NULL,
            status TEXT NOT NULL,
            version BIGINT NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            data JSONB NOT NULL
        )
        ",
    ),
    (
        "active owner/serial index",
        r"
        CREATE UNIQUE INDEX IF NOT EXISTS requests_active_owner_serial
            ON requests (owner_key, norm_serial)
            WHERE status IN ('submitted', 'pending_it')
        ",
    ),
    (
        "request counter table",
        r"
        CREATE TABLE IF NOT EXISTS request_counter (
            id SMALLINT PRIMARY KEY,
            value BIGINT NOT NULL
        )
        ",
    ),
    (
        "request counter row",
        "INSERT INTO request_counter (id, value) VALUES (1, 0) ON CONFLICT (id) DO NOTHING",
    ),
    (
        "audit log table",
        r"
        CREATE TABLE IF NOT EXISTS audit_log (
            seq BIGSERIAL PRIMARY KEY,
            time TIMESTAMPTZ NOT NULL,
            request_id TEXT,
            data JSONB NOT NULL
        )
        ",
    ),
    (
        "audit time index",
        "CREATE INDEX IF NOT EXISTS idx_audit_log_time ON audit_log (time DESC, seq DESC)",
    ),
    (
        "audit request index",
        "CREATE INDEX IF NOT EXISTS idx_audit_log_request ON audit_log (request_id)",
    ),
];

/// Create tables, indexes and the counter row if they are missing.
///
/// # Errors
///
/// Returns the first `sqlx::Error` hit; earlier statements stay applied.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for (what, sql) in STATEMENTS {
        sqlx::query(sql).execute(pool).await.inspect_err(|e| {
            tracing::error!(step = what, error = %e, "Schema bootstrap failed");
        })?;
    }
    tracing::info!(statements = STATEMENTS.len(), "Schema ready");
    Ok(())
}

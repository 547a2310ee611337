//! Health check endpoint.
//!
//! Used by load balancers and the front-end status badge to verify the
//! service and its storage backend.

use crate::error::AppError;
use crate::state::AppState;
use axum::{Json, extract::State};
use removal_desk_core::{DateTime, StoreSnapshot, Utc};
use serde::Serialize;

/// Health response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `true` when the store answered
    pub ok: bool,
    /// Server time
    pub time: DateTime<Utc>,
    /// Store counters
    pub store: StoreSnapshot,
}

/// Health check with store diagnostics (for readiness).
///
/// # Endpoint
///
/// ```text
/// GET /api/health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "ok": true,
///   "time": "2025-01-01T00:00:00Z",
///   "store": { "backend": "memory", "counter": 3, "requests": 3, "auditEntries": 7, "time": "..." }
/// }
/// ```
///
/// # Errors
///
/// Returns 500 if the backend cannot be read.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let store = state.store.snapshot().await?;
    Ok(Json(HealthResponse {
        ok: true,
        time: store.time,
        store,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use removal_desk_core::{RequestStore, SystemClock};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_check_reports_memory_backend() {
        let state = AppState::new(RequestStore::in_memory(Arc::new(SystemClock)));

        let Json(health) = health_check(State(state)).await.unwrap();

        assert!(health.ok);
        assert_eq!(health.store.backend, "memory");
        assert_eq!(health.store.requests, 0);
    }
}

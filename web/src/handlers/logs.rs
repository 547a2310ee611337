//! Audit log endpoints.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use removal_desk_core::{AuditEntry, AuditFilter, NewAuditEntry, RequestId};
use serde::{Deserialize, Serialize};

/// Query string for `GET /api/logs`. Blank values are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogQuery {
    /// Only entries about this request
    pub request_id: Option<String>,
    /// Only entries by this user
    pub user: Option<String>,
    /// Only entries with this action label
    pub action: Option<String>,
    /// Maximum entries returned
    pub limit: Option<usize>,
}

impl LogQuery {
    fn into_filter(self) -> Result<AuditFilter, AppError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let mut filter = AuditFilter::new();
        if let Some(id) = present(self.request_id) {
            filter = filter.request(RequestId::parse(&id)?);
        }
        if let Some(user) = present(self.user) {
            filter = filter.user(user);
        }
        if let Some(action) = present(self.action) {
            filter = filter.action(action);
        }
        if let Some(limit) = self.limit {
            filter = filter.limit(limit);
        }
        Ok(filter)
    }
}

/// Body of a successful append.
#[derive(Debug, Serialize)]
pub struct LogResponse {
    /// Always `true`
    pub ok: bool,
    /// The stored entry
    pub log: AuditEntry,
}

/// Read the audit log, newest first.
///
/// # Errors
///
/// Returns 400 for a malformed query, 500 if the log cannot be read.
pub async fn list_logs(
    State(state): State<AppState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let Query(query) = query?;
    let entries = state.store.list_audit(query.into_filter()?).await?;
    Ok(Json(entries))
}

/// Append an entry for an external collaborator (account screens, password
/// changes). Blank `user` becomes `"system"`, blank `action` becomes `"log"`.
///
/// # Errors
///
/// Returns 400 for a malformed body, 500 if the log cannot persist it.
pub async fn append_log(
    State(state): State<AppState>,
    payload: Result<Json<NewAuditEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<LogResponse>), AppError> {
    let Json(entry) = payload?;
    let log = state.store.append_audit(entry).await?;
    tracing::debug!(user = %log.user, action = %log.action, "Audit entry appended");
    Ok((StatusCode::CREATED, Json(LogResponse { ok: true, log })))
}

//! Export in the legacy vocabulary for older consumers.

use crate::error::AppError;
use crate::state::AppState;
use axum::{Json, extract::State};
use removal_desk_core::LegacyRemovalRequest;

/// Every request in the legacy shape, newest first.
///
/// `pending_it` is reported as `Submitted`.
///
/// # Errors
///
/// Returns 500 on backend failure.
pub async fn list_legacy_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<LegacyRemovalRequest>>, AppError> {
    let records = state.store.list().await?;
    Ok(Json(records.iter().map(LegacyRemovalRequest::from).collect()))
}

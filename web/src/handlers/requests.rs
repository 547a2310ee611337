//! Device-removal request endpoints.
//!
//! | Method | Path | Success |
//! |---|---|---|
//! | `GET` | `/api/requests` | array, newest first |
//! | `GET` | `/api/requests/:id` | record |
//! | `POST` | `/api/requests` | 201 `{ ok, request }` |
//! | `PATCH` | `/api/requests/:id` | `{ ok, request }` |
//! | `POST` | `/api/requests/:id/status` | `{ ok, request }` |

use crate::error::AppError;
use crate::extractors::ActorContext;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use removal_desk_core::{RequestDraft, RequestId, RequestPatch, RequestRecord, RequestStatus};
use serde::{Deserialize, Serialize};

/// Body of a successful mutation.
#[derive(Debug, Serialize)]
pub struct RequestResponse {
    /// Always `true`
    pub ok: bool,
    /// The stored record after the mutation
    pub request: RequestRecord,
}

impl RequestResponse {
    fn json(request: RequestRecord) -> Json<Self> {
        Json(Self { ok: true, request })
    }
}

/// `PATCH` body: the fields to change plus optional audit labelling.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PatchRequestBody {
    /// Fields to change
    #[serde(flatten)]
    pub patch: RequestPatch,
    /// Audit action label (defaults to `"Updated request"`)
    pub action: Option<String>,
    /// Audit detail
    pub detail: Option<String>,
}

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    /// Target status, canonical vocabulary
    pub status: String,
}

/// List every request, newest first.
///
/// # Errors
///
/// Returns 500 on backend failure.
pub async fn list_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<RequestRecord>>, AppError> {
    Ok(Json(state.store.list().await?))
}

/// Fetch one request.
///
/// # Errors
///
/// Returns 400 for a malformed id, 404 if absent.
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RequestRecord>, AppError> {
    let id = RequestId::parse(&id)?;
    state
        .store
        .get(id.clone())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Request", id))
}

/// Submit a new request.
///
/// A blank `ownerKey` is filled from the `X-Actor-Key` header.
///
/// # Errors
///
/// Returns 400 for missing fields, 409 with the existing request when the
/// device already has an active one.
pub async fn create_request(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    payload: Result<Json<RequestDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<RequestResponse>), AppError> {
    let Json(mut draft) = payload?;
    if draft.owner_key.trim().is_empty() {
        draft.owner_key.clone_from(&actor.user_key);
    }

    let record = state.store.create(draft).await?;
    Ok((StatusCode::CREATED, RequestResponse::json(record)))
}

/// Edit business fields. `status`, `id` and `ownerKey` in the body are ignored.
///
/// # Errors
///
/// Returns 400 for a blanked required field, 404 if absent, 409 when a new
/// serial collides with another active request.
pub async fn patch_request(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<String>,
    payload: Result<Json<PatchRequestBody>, JsonRejection>,
) -> Result<Json<RequestResponse>, AppError> {
    let id = RequestId::parse(&id)?;
    let Json(body) = payload?;

    let record = state
        .store
        .patch_fields_with_action(id, body.patch, &actor, body.action, body.detail)
        .await?;
    Ok(RequestResponse::json(record))
}

/// Move a request to another status as the header actor.
///
/// # Errors
///
/// Returns 400 for an unknown status, 403 for roles without rights, 404 if
/// absent, 409 for a step outside the role's rights.
pub async fn change_status(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<String>,
    payload: Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<RequestResponse>, AppError> {
    let id = RequestId::parse(&id)?;
    let Json(body) = payload?;
    let to: RequestStatus = body.status.parse()?;

    let record = state.store.transition_status(id, to, &actor).await?;
    Ok(RequestResponse::json(record))
}

//! Error types for web handlers.
//!
//! Bridges [`RequestError`] and HTTP responses through Axum's
//! `IntoResponse` trait. Every error body carries `ok: false` so clients can
//! branch on a single field.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use removal_desk_core::RequestError;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>, Path(id): Path<String>)
///     -> Result<Json<RequestRecord>, AppError>
/// {
///     let id = RequestId::parse(&id)?;
///     state.store.get(id.clone()).await?
///         .map(Json)
///         .ok_or_else(|| AppError::not_found("Request", id))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Structured context for the client (conflicting id, field name)
    details: Option<Value>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            details: None,
            source: None,
        }
    }

    /// Attach structured details to the response body.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach an internal error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} {id} not found"),
            "NOT_FOUND",
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    ok: bool,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        metrics::counter!("removal_desk.http.errors", "code" => self.code).increment(1);

        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                source = ?self.source,
                "Server error"
            );
        } else {
            tracing::debug!(status = %self.status, code = self.code, message = %self.message, "Client error");
        }

        let body = ErrorResponse {
            ok: false,
            code: self.code,
            message: &self.message,
            details: self.details.as_ref(),
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<RequestError> for AppError {
    fn from(err: RequestError) -> Self {
        let message = err.to_string();
        match err {
            RequestError::Validation { field, .. } => {
                Self::new(StatusCode::BAD_REQUEST, message, "VALIDATION_ERROR")
                    .with_details(json!({ "field": field }))
            }
            RequestError::DuplicateActiveRequest { id, status } => {
                Self::new(StatusCode::CONFLICT, message, "DUPLICATE_ACTIVE_REQUEST")
                    .with_details(json!({ "existingId": id, "status": status }))
            }
            RequestError::AccessDenied { .. } => {
                Self::new(StatusCode::FORBIDDEN, message, "ACCESS_DENIED")
            }
            RequestError::InvalidTransition { from, to, .. } => {
                Self::new(StatusCode::CONFLICT, message, "INVALID_TRANSITION")
                    .with_details(json!({ "from": from, "to": to }))
            }
            RequestError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND"),
            RequestError::Storage(_) => {
                Self::internal("Storage backend failure").with_source(anyhow::anyhow!(message))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use removal_desk_core::{RequestId, RequestStatus, Role};

    #[test]
    fn test_request_errors_map_to_statuses() {
        let cases = [
            (RequestError::validation("serial", "is required"), 400, "VALIDATION_ERROR"),
            (
                RequestError::DuplicateActiveRequest {
                    id: RequestId::from_counter(3),
                    status: RequestStatus::PendingIt,
                },
                409,
                "DUPLICATE_ACTIVE_REQUEST",
            ),
            (
                RequestError::AccessDenied {
                    role: Role::Parent,
                    to: RequestStatus::ItApproved,
                },
                403,
                "ACCESS_DENIED",
            ),
            (
                RequestError::InvalidTransition {
                    role: Role::Registrar,
                    from: RequestStatus::Submitted,
                    to: RequestStatus::ItApproved,
                },
                409,
                "INVALID_TRANSITION",
            ),
            (RequestError::NotFound(RequestId::from_counter(9)), 404, "NOT_FOUND"),
            (RequestError::Storage("down".into()), 500, "INTERNAL_SERVER_ERROR"),
        ];

        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status().as_u16(), status);
            assert_eq!(app.code(), code);
        }
    }

    #[test]
    fn test_duplicate_carries_existing_request() {
        let app: AppError = RequestError::DuplicateActiveRequest {
            id: RequestId::from_counter(3),
            status: RequestStatus::Submitted,
        }
        .into();

        assert_eq!(
            app.details,
            Some(json!({ "existingId": "000003", "status": "submitted" }))
        );
    }

    #[test]
    fn test_storage_message_is_not_leaked() {
        let app: AppError = RequestError::Storage("password=hunter2".into()).into();
        assert!(!app.to_string().contains("hunter2"));
        assert!(app.source.is_some());
    }
}

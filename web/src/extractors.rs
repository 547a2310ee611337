//! Custom Axum extractors.
//!
//! - `ActorContext`: the acting role and user key from request headers
//!
//! Sessions are handled upstream; the headers are trusted as-is.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use removal_desk_core::{Actor, Role};

/// Header carrying the acting role (`parent`, `registrar`, `it`).
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Header carrying the acting user's key.
pub const ACTOR_KEY_HEADER: &str = "x-actor-key";

/// The actor on whose behalf a request runs.
///
/// A missing or unrecognized role header yields [`Role::Unknown`], which
/// has no transition rights.
///
/// # Example
///
/// ```ignore
/// async fn handler(ActorContext(actor): ActorContext) -> String {
///     format!("acting as {}", actor.role)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext(pub Actor);

impl ActorContext {
    /// Read the actor from `headers`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .unwrap_or_default()
        };

        Self(Actor::new(
            Role::from_label(header(ACTOR_ROLE_HEADER)),
            header(ACTOR_KEY_HEADER),
        ))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

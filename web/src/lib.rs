//! JSON API for the removal desk.
//!
//! A thin axum shell over [`RequestStore`]: handlers parse the request,
//! read the actor from headers, call one store operation and map the result
//! (or [`RequestError`]) to a response.
//!
//! ```text
//! HTTP ──▶ extractors (JSON, ActorContext) ──▶ RequestStore ──▶ backend
//!   ▲                                              │
//!   └──────────── AppError / JSON body ◀───────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use removal_desk_core::{RequestStore, SystemClock};
//! use removal_desk_web::{AppState, build_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(RequestStore::in_memory(Arc::new(SystemClock)));
//! let app = build_router(state, &["http://localhost:5173".to_string()]);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:1337").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`RequestStore`]: removal_desk_core::RequestStore
//! [`RequestError`]: removal_desk_core::RequestError

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::{Config, ConfigError, StorageBackend};
pub use error::AppError;
pub use extractors::{ACTOR_KEY_HEADER, ACTOR_ROLE_HEADER, ActorContext};
pub use routes::build_router;
pub use state::{AppState, build_store};

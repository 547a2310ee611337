//! Application state for Axum handlers.

use crate::config::{Config, StorageBackend};
use anyhow::Context;
use removal_desk_core::{Clock, RequestStore};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloning is cheap; clones share the same store.
#[derive(Clone)]
pub struct AppState {
    /// Request store (either backend)
    pub store: RequestStore,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(store: RequestStore) -> Self {
        Self { store }
    }
}

/// Build the store selected by `config`.
///
/// The Postgres backend connects eagerly and, when enabled, bootstraps the
/// schema before the server starts accepting requests.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the schema cannot be
/// created.
pub async fn build_store(config: &Config, clock: Arc<dyn Clock>) -> anyhow::Result<RequestStore> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(RequestStore::in_memory(clock))
        }
        StorageBackend::Postgres => {
            let url = config
                .storage
                .database_url
                .as_deref()
                .context("DATABASE_URL is not set")?;

            let pool = removal_desk_postgres::connect(
                url,
                config.storage.max_connections,
                config.storage.connect_timeout(),
            )
            .await
            .context("Failed to connect to PostgreSQL")?;

            if config.storage.init_schema {
                removal_desk_postgres::ensure_schema(&pool)
                    .await
                    .context("Failed to bootstrap database schema")?;
                tracing::info!("Database schema ready");
            }

            Ok(removal_desk_postgres::request_store(pool, clock))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use removal_desk_core::SystemClock;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_memory_backend_needs_no_database() {
        let config = Config::from_lookup(|_| None).unwrap();
        let store = build_store(&config, Arc::new(SystemClock)).await.unwrap();
        assert_eq!(store.backend(), "memory");
    }
}

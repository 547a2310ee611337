//! # Removal Desk Testing
//!
//! Testing utilities for the removal desk engine.
//!
//! This crate provides:
//! - Mock implementations of injected dependencies (clocks, a failing audit log)
//! - Draft and actor fixtures
//! - proptest strategies for domain values
//! - Backend contract checks every [`RequestRepository`] must pass
//!
//! ## Example
//!
//! ```
//! use removal_desk_testing::{contract, test_store};
//!
//! # #[tokio::main]
//! # async fn main() -> removal_desk_core::Result<()> {
//! let store = test_store();
//! contract::run_all(&store).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`RequestRepository`]: removal_desk_core::RequestRepository

use chrono::{DateTime, Utc};
use removal_desk_core::environment::Clock;
use removal_desk_core::RequestStore;
use std::sync::Arc;

pub mod contract;
pub mod fixtures;

/// Mock implementations of injected dependencies.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use futures::future::BoxFuture;
    use removal_desk_core::{AuditEntry, AuditError, AuditFilter, AuditLog, NewAuditEntry};
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use removal_desk_testing::mocks::FixedClock;
    /// use removal_desk_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step on every read.
    ///
    /// Gives each mutation a distinct, predictable timestamp so newest-first
    /// orderings are observable without sleeping.
    #[derive(Debug)]
    pub struct StepClock {
        start: DateTime<Utc>,
        step_ms: i64,
        ticks: AtomicI64,
    }

    impl StepClock {
        /// Start at `start`, advancing `step` per call.
        #[must_use]
        pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                start,
                step_ms: step.num_milliseconds(),
                ticks: AtomicI64::new(0),
            }
        }

        /// Number of reads so far.
        #[must_use]
        pub fn reads(&self) -> i64 {
            self.ticks.load(Ordering::SeqCst)
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            self.start + Duration::milliseconds(tick.saturating_mul(self.step_ms))
        }
    }

    /// Audit log whose appends always fail.
    ///
    /// Reads return nothing. Counts attempted appends.
    #[derive(Debug, Default)]
    pub struct FailingAuditLog {
        attempts: AtomicUsize,
    }

    impl FailingAuditLog {
        /// Create a new failing log
        #[must_use]
        pub const fn new() -> Self {
            Self {
                attempts: AtomicUsize::new(0),
            }
        }

        /// Appends attempted so far.
        #[must_use]
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl AuditLog for FailingAuditLog {
        fn append(&self, _entry: NewAuditEntry) -> BoxFuture<'_, Result<AuditEntry, AuditError>> {
            Box::pin(async move {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                Err(AuditError::Storage("audit backend unavailable".to_string()))
            })
        }

        fn list(&self, _filter: AuditFilter) -> BoxFuture<'_, Result<Vec<AuditEntry>, AuditError>> {
            Box::pin(async move { Ok(Vec::new()) })
        }

        fn count(&self) -> BoxFuture<'_, Result<usize, AuditError>> {
            Box::pin(async move { Ok(0) })
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }

    /// 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default()
    }
}

/// proptest strategies for domain values.
pub mod properties {
    use proptest::prelude::*;
    use removal_desk_core::{RequestStatus, Role};

    /// Any canonical status.
    pub fn arb_status() -> impl Strategy<Value = RequestStatus> {
        prop::sample::select(RequestStatus::ALL.to_vec())
    }

    /// Any role, including the unrecognized one.
    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop::sample::select(vec![Role::Parent, Role::Registrar, Role::It, Role::Unknown])
    }

    /// Serial-like strings with optional padding, spaces and mixed case.
    pub fn arb_serial() -> impl Strategy<Value = String> {
        ("[ ]{0,2}", "[a-zA-Z0-9]{1,4}", "[ -]?", "[a-zA-Z0-9]{1,4}", "[ ]{0,2}")
            .prop_map(|(lead, a, sep, b, trail)| format!("{lead}{a}{sep}{b}{trail}"))
    }
}

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; output goes through the test harness writer.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory store driven by [`mocks::test_clock`].
#[must_use]
pub fn test_store() -> RequestStore {
    RequestStore::in_memory(Arc::new(mocks::test_clock()))
}

// Re-export commonly used items
pub use mocks::{FailingAuditLog, FixedClock, StepClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now(), mocks::epoch());
    }

    #[test]
    fn test_step_clock_advances() {
        let clock = StepClock::new(mocks::epoch(), Duration::seconds(1));
        let a = clock.now();
        let b = clock.now();
        assert_eq!(b - a, Duration::seconds(1));
        assert_eq!(clock.reads(), 2);
    }
}

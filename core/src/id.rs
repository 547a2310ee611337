//! Sequential request id allocator.

use crate::error::Result;
use crate::types::RequestId;

/// Monotonic counter behind request ids.
///
/// The in-process backend owns one of these under its table lock. The
/// Postgres backend keeps the same counter in the `request_counter` row and
/// follows the same rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdAllocator {
    counter: u64,
}

impl IdAllocator {
    /// Start from zero; the first id is `"000001"`.
    #[must_use]
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Resume from a persisted counter value.
    #[must_use]
    pub const fn starting_at(counter: u64) -> Self {
        Self { counter }
    }

    /// Last value handed out (or observed).
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.counter
    }

    /// Advance the counter and return the new id.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Storage`](crate::RequestError::Storage) when
    /// the counter is already at [`RequestId::MAX`]; the counter is left
    /// unchanged.
    pub fn next_id(&mut self) -> Result<RequestId> {
        let id = RequestId::after(self.counter)?;
        self.counter = id.value();
        Ok(id)
    }

    /// Account for an externally supplied id.
    ///
    /// Moves the counter up to the id's value so later allocations never
    /// collide with it. Smaller ids leave the counter alone.
    pub fn observe(&mut self, id: &RequestId) {
        self.counter = self.counter.max(id.value());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::RequestError;

    #[test]
    fn test_ten_sequential_ids() {
        let mut ids = IdAllocator::new();
        let got: Vec<String> = (0..10).map(|_| ids.next_id().unwrap().to_string()).collect();
        let want: Vec<String> = (1..=10).map(|n| format!("{n:06}")).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn test_external_id_advances_counter() {
        let mut ids = IdAllocator::new();
        for n in 1..=5 {
            assert_eq!(ids.next_id().unwrap(), RequestId::from_counter(n));
        }

        ids.observe(&RequestId::from_counter(50));
        assert_eq!(ids.current(), 50);
        assert_eq!(ids.next_id().unwrap().as_str(), "000051");
    }

    #[test]
    fn test_smaller_external_id_is_ignored() {
        let mut ids = IdAllocator::starting_at(20);
        ids.observe(&RequestId::from_counter(3));
        assert_eq!(ids.next_id().unwrap().as_str(), "000021");
    }

    #[test]
    fn test_last_id_then_exhausted() {
        let mut ids = IdAllocator::starting_at(RequestId::MAX - 1);
        assert_eq!(ids.next_id().unwrap().as_str(), "999999");

        let err = ids.next_id().unwrap_err();
        assert!(matches!(err, RequestError::Storage(_)));
        assert_eq!(ids.current(), RequestId::MAX);
    }
}

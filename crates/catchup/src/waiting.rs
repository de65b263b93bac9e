//! Heights with an outstanding block request.

use dirchain_common::Height;
use std::time::{Duration, Instant};

/// One in-flight request.
#[derive(Debug, Clone, Copy)]
struct WaitingBlock {
    height: Height,
    requested_at: Instant,
}

/// Heights that have been requested from peers, with request timestamps.
///
/// A height appears at most once. Timestamps are monotonic so timeout
/// arithmetic is immune to wall-clock adjustments.
#[derive(Debug, Default)]
pub struct WaitingBlocks {
    entries: Vec<WaitingBlock>,
}

impl WaitingBlocks {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request for `height` made now.
    ///
    /// If the height is already present the original timestamp is kept: the
    /// age of the oldest outstanding request is what the timeout sweep must
    /// see, and a second dispatch for an in-flight height is a caller bug.
    pub fn add(&mut self, height: Height) {
        if self.contains(height) {
            return;
        }
        self.entries.push(WaitingBlock {
            height,
            requested_at: Instant::now(),
        });
    }

    /// Remove every entry at `height`. No-op if absent.
    pub fn remove(&mut self, height: Height) {
        self.entries.retain(|e| e.height != height);
    }

    /// Drop every entry with height less than or equal to `bound`.
    pub fn purge_through(&mut self, bound: Height) {
        self.entries.retain(|e| e.height > bound);
    }

    /// Whether a request for `height` is outstanding.
    pub fn contains(&self, height: Height) -> bool {
        self.entries.iter().any(|e| e.height == height)
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no requests are outstanding.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Heights whose request is older than `timeout`.
    pub fn expired(&self, timeout: Duration) -> Vec<Height> {
        self.entries
            .iter()
            .filter(|e| e.requested_at.elapsed() > timeout)
            .map(|e| e.height)
            .collect()
    }

    /// Snapshot of the outstanding heights, in request order.
    pub fn snapshot(&self) -> Vec<Height> {
        self.entries.iter().map(|e| e.height).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_contains() {
        let mut waiting = WaitingBlocks::new();
        waiting.add(5);
        assert!(waiting.contains(5));
        assert!(!waiting.contains(6));
        assert_eq!(waiting.len(), 1);
    }

    #[test]
    fn test_add_keeps_first_timestamp() {
        let mut waiting = WaitingBlocks::new();
        waiting.add(5);
        let first = waiting.entries[0].requested_at;
        std::thread::sleep(Duration::from_millis(5));
        waiting.add(5);
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting.entries[0].requested_at, first);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut waiting = WaitingBlocks::new();
        waiting.add(5);
        waiting.remove(5);
        waiting.remove(5);
        assert!(waiting.is_empty());
    }

    #[test]
    fn test_purge_through() {
        let mut waiting = WaitingBlocks::new();
        waiting.add(3);
        waiting.add(6);
        waiting.purge_through(5);
        assert_eq!(waiting.snapshot(), vec![6]);
    }

    #[test]
    fn test_expired_after_timeout() {
        let mut waiting = WaitingBlocks::new();
        waiting.add(7);
        assert!(waiting.expired(Duration::from_secs(60)).is_empty());

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(waiting.expired(Duration::from_millis(1)), vec![7]);
    }
}

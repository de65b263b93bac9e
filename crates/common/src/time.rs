//! Time utilities for dirchain.
//!
//! Directory-block headers carry plain Unix timestamps. These helpers read
//! the system clock once and saturate at zero if the clock is somehow set
//! before the Unix epoch.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Returns the current Unix timestamp in milliseconds.
///
/// Higher precision than [`current_timestamp`] for use cases that need
/// sub-second accuracy.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_timestamp() {
        let ts = current_timestamp();
        // Should be after 2024
        assert!(ts > 1704067200);
    }

    #[test]
    fn test_timestamp_ms_precision() {
        let secs = current_timestamp();
        let ms = current_timestamp_ms();
        assert!(ms / 1000 >= secs);
    }
}

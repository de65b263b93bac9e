//! Directory-block catch-up for dirchain.
//!
//! A node that falls behind the chain — after a restart, a partition, or a
//! late join — has to work out which directory-block heights it is missing,
//! request them from peers, accept the responses in whatever order they
//! arrive, and hand the blocks to the applier in strict height order. This
//! crate implements that reconciliation machinery.
//!
//! # Architecture
//!
//! Three height-keyed collections track each block's progress, coordinated
//! by four cooperative loops inside [`CatchupEngine`]:
//!
//! ```text
//!              scan loop                    sweep loop
//!          (gaps + frontier)            (request timeouts)
//!                  │                            │
//!                  ▼                            ▼
//!           ┌────────────────── mailbox ──────────────────┐
//!           │        (single admission point)             │
//!           ▼                                             ▼
//!     MissingBlocks ──dispatch──▶ WaitingBlocks ──payload──▶ ReceivedBlocks
//!      (to request)    loop        (in flight)    arrives     (buffered)
//!                        │                                        │
//!                        ▼                                        ▼
//!                  RequestSender                          try_apply_next()
//!                  (host network)                       (in-order applier)
//! ```
//!
//! A height moves `missing → waiting` when its request goes out, `waiting →
//! received` when a payload arrives, and back to `missing` if the request
//! times out. The received set's `base` watermark only ever advances, and
//! the applier observes heights `base + 1, base + 2, …` with no gaps or
//! duplicates.
//!
//! The engine trusts its peers to describe a single canonical chain: no
//! fork choice, no payload verification, and no persistence of its own —
//! after a restart it rebuilds from the host's saved-height watermark.
//!
//! # Host integration
//!
//! The host node supplies two seams and consumes two:
//!
//! - implement [`ChainHeights`] over its ledger state,
//! - implement [`RequestSender`] over its peer connections,
//! - forward inbound block payloads into
//!   [`CatchupEngine::payload_sender`],
//! - drain [`CatchupEngine::try_apply_next`] from its block applier.

mod engine;
mod error;
mod missing;
mod oracle;
mod received;
mod transport;
mod waiting;

pub use engine::{CatchupEngine, CatchupStats, DispatchOutcome};
pub use error::CatchupError;
pub use missing::MissingBlocks;
pub use oracle::ChainHeights;
pub use received::ReceivedBlocks;
pub use transport::RequestSender;
pub use waiting::WaitingBlocks;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result type for catch-up operations.
pub type Result<T> = std::result::Result<T, CatchupError>;

/// Configuration for the catch-up engine.
///
/// The defaults suit a production node; tests shrink the periods. All
/// fields are optional in configuration files:
///
/// ```toml
/// [catchup]
/// request_timeout_secs = 10
/// request_limit = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchupConfig {
    /// How long a block request may stay unanswered before it is requeued.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of requests in flight at once. The sole throttle on
    /// outbound catch-up traffic.
    #[serde(default = "default_request_limit")]
    pub request_limit: usize,

    /// Period of the scan loop.
    #[serde(default = "default_scan_period_secs")]
    pub scan_period_secs: u64,

    /// Period of the timeout sweep loop.
    #[serde(default = "default_sweep_period_secs")]
    pub sweep_period_secs: u64,

    /// How long the dispatch loop sleeps when nothing is queued.
    #[serde(default = "default_dispatch_idle_ms")]
    pub dispatch_idle_ms: u64,

    /// How long the dispatch loop sleeps when the in-flight cap is reached.
    #[serde(default = "default_dispatch_backoff_secs")]
    pub dispatch_backoff_secs: u64,

    /// Capacity of each notification channel. Overflow drops are safe: the
    /// periodic loops re-emit on their next cycle.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for CatchupConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            request_limit: default_request_limit(),
            scan_period_secs: default_scan_period_secs(),
            sweep_period_secs: default_sweep_period_secs(),
            dispatch_idle_ms: default_dispatch_idle_ms(),
            dispatch_backoff_secs: default_dispatch_backoff_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl CatchupConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> dirchain_common::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| dirchain_common::Error::Config(e.to_string()))
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Scan period as a [`Duration`].
    pub fn scan_period(&self) -> Duration {
        Duration::from_secs(self.scan_period_secs)
    }

    /// Sweep period as a [`Duration`].
    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_period_secs)
    }

    /// Dispatch idle sleep as a [`Duration`].
    pub fn dispatch_idle(&self) -> Duration {
        Duration::from_millis(self.dispatch_idle_ms)
    }

    /// Dispatch backoff sleep as a [`Duration`].
    pub fn dispatch_backoff(&self) -> Duration {
        Duration::from_secs(self.dispatch_backoff_secs)
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_request_limit() -> usize {
    10
}

fn default_scan_period_secs() -> u64 {
    5
}

fn default_sweep_period_secs() -> u64 {
    1
}

fn default_dispatch_idle_ms() -> u64 {
    20
}

fn default_dispatch_backoff_secs() -> u64 {
    5
}

fn default_channel_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CatchupConfig::default();
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.request_limit, 10);
        assert_eq!(config.scan_period_secs, 5);
        assert_eq!(config.sweep_period_secs, 1);
    }

    #[test]
    fn test_config_partial_toml_fills_defaults() {
        let config: CatchupConfig = toml::from_str("request_limit = 4").unwrap();
        assert_eq!(config.request_limit, 4);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.channel_capacity, 256);
    }

    #[test]
    fn test_config_durations() {
        let config = CatchupConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.dispatch_idle(), Duration::from_millis(20));
    }
}

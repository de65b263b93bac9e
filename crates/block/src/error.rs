//! Error types for the directory-block wire format.

use dirchain_common::Height;
use thiserror::Error;

/// Errors raised while decoding or linking directory blocks.
#[derive(Error, Debug)]
pub enum BlockError {
    /// Input ended before a complete field could be read.
    #[error("truncated {context}: need {needed} bytes, have {have}")]
    Truncated {
        /// Which structure was being decoded.
        context: &'static str,
        /// Bytes required to continue.
        needed: usize,
        /// Bytes actually available.
        have: usize,
    },

    /// The body's entry count does not fit in the remaining payload.
    #[error("entry count {count} exceeds remaining payload ({have} bytes)")]
    EntryCountTooLarge {
        /// Declared number of entries.
        count: u32,
        /// Bytes available for entries.
        have: usize,
    },

    /// A block does not extend the block it claims as its parent.
    #[error("block at height {height} does not extend parent at height {parent}: {reason}")]
    BrokenLinkage {
        /// Height of the child block.
        height: Height,
        /// Height of the claimed parent.
        parent: Height,
        /// Which link check failed.
        reason: &'static str,
    },
}

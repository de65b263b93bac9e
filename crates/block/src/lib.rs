//! Directory-block wire format for dirchain.
//!
//! A directory block is one entry of the chain's replicated log. Each block
//! carries a fixed-size header and a body listing `(chain_id, merkle_root)`
//! pairs, one per sub-chain anchored at this height. All integers on the
//! wire are big-endian.
//!
//! # Wire Layout
//!
//! ```text
//! Header (117 bytes)
//! +---------+------------+---------+-------------+-----------------+--------+------------+-------------+
//! | version | network id | body MR | prev key MR | prev block hash | height | start time | entry count |
//! |   u8    |   u32 BE   |  32 B   |    32 B     |      32 B       | u32 BE |   u64 BE   |   u32 BE    |
//! +---------+------------+---------+-------------+-----------------+--------+------------+-------------+
//!
//! Body
//! +--------+----------------------------------------+
//! | count  | count x (chain_id 32 B, merkle 32 B)   |
//! | u32 BE |                                        |
//! +--------+----------------------------------------+
//! ```
//!
//! # Hashes
//!
//! Three hashes identify a block:
//!
//! - the **body Merkle root**, a Merkle root over the SHA-256 of each encoded
//!   entry (an empty body hashes a single `SHA256("")` leaf)
//! - the **key Merkle root**, the Merkle root of the two leaves
//!   `(SHA256(header), body_mr)` — this is the identifier that successor
//!   blocks link to via `prev_key_mr`
//! - the **block hash**, the SHA-256 of the fully encoded block, linked via
//!   `prev_block_hash`
//!
//! # Example
//!
//! ```rust
//! use dirchain_block::{BlockEntry, DirectoryBlock};
//! use dirchain_common::Hash256;
//!
//! let mut genesis = DirectoryBlock::genesis(0xFA92E5A2);
//! genesis.add_entry(BlockEntry::new(Hash256::hash(b"chain"), Hash256::hash(b"root")));
//! genesis.seal();
//!
//! let child = genesis.successor();
//! assert_eq!(child.header.height, 1);
//! assert!(child.verify_linkage(&genesis).is_ok());
//! ```

mod block;
mod error;
mod header;
mod merkle;
mod messages;

pub use block::{BlockEntry, DirectoryBlock, ENTRY_LEN};
pub use error::BlockError;
pub use header::{BlockHeader, BLOCK_VERSION, HEADER_LEN};
pub use merkle::merkle_root;
pub use messages::{BlockRequest, BlockState};

/// Result type for block operations.
pub type Result<T> = std::result::Result<T, BlockError>;

//! Wire messages exchanged during block catch-up.
//!
//! Two message bodies matter to the catch-up machinery: [`BlockRequest`],
//! asking peers for a contiguous range of directory blocks, and
//! [`BlockState`], carrying one directory block in response. Transport
//! framing (message type tags, length prefixes, peer addressing) is the
//! host's concern; these types cover only the bodies.

use bytes::{Buf, BufMut};
use dirchain_common::Height;

use crate::{BlockError, DirectoryBlock, Result};

/// Encoded size of a block request: two heights.
const REQUEST_LEN: usize = 8;

/// Request for the directory blocks in the inclusive height range
/// `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRequest {
    /// First height requested.
    pub start: Height,
    /// Last height requested.
    pub end: Height,
}

impl BlockRequest {
    /// Request a range of heights.
    pub fn new(start: Height, end: Height) -> Self {
        Self { start, end }
    }

    /// Request a single height.
    pub fn single(height: Height) -> Self {
        Self {
            start: height,
            end: height,
        }
    }

    /// Encode as two big-endian heights.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(REQUEST_LEN);
        buf.put_u32(self.start);
        buf.put_u32(self.end);
        buf
    }

    /// Decode a request.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        if buf.remaining() < REQUEST_LEN {
            return Err(BlockError::Truncated {
                context: "block request",
                needed: REQUEST_LEN,
                have: buf.remaining(),
            });
        }
        Ok(Self {
            start: buf.get_u32(),
            end: buf.get_u32(),
        })
    }
}

impl std::fmt::Display for BlockRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// A directory block received from a peer.
///
/// The catch-up machinery treats the block as opaque apart from its height;
/// validation happens downstream when the block is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockState {
    block: DirectoryBlock,
}

impl BlockState {
    /// Wrap a decoded directory block.
    pub fn new(block: DirectoryBlock) -> Self {
        Self { block }
    }

    /// Decode a block-state payload from the wire.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Ok(Self {
            block: DirectoryBlock::decode(data)?,
        })
    }

    /// Encode the payload.
    pub fn encode(&self) -> Vec<u8> {
        self.block.encode()
    }

    /// Height of the carried block, read from its header.
    pub fn height(&self) -> Height {
        self.block.header.height
    }

    /// Borrow the carried block.
    pub fn block(&self) -> &DirectoryBlock {
        &self.block
    }

    /// Take the carried block.
    pub fn into_block(self) -> DirectoryBlock {
        self.block
    }
}

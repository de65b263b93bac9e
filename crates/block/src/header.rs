//! Directory-block header codec.

use bytes::{Buf, BufMut};
use dirchain_common::{Hash256, Height};

use crate::{BlockError, Result};

/// Current directory-block format version.
pub const BLOCK_VERSION: u8 = 0;

/// Encoded header size: 1 + 4 + 32 + 32 + 32 + 4 + 8 + 4.
pub const HEADER_LEN: usize = 117;

/// Fixed-size header of a directory block.
///
/// `body_mr` and `entry_count` describe the body and are filled in by
/// [`DirectoryBlock::seal`](crate::DirectoryBlock::seal); the two `prev_*`
/// fields link the block to its parent and are zero for the genesis block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Format version.
    pub version: u8,
    /// Identifier of the network this block belongs to.
    pub network_id: u32,
    /// Merkle root of the body entries.
    pub body_mr: Hash256,
    /// Key Merkle root of the parent block.
    pub prev_key_mr: Hash256,
    /// Hash of the parent block's encoded bytes.
    pub prev_block_hash: Hash256,
    /// Height of this block.
    pub height: Height,
    /// Unix timestamp at which the block period started.
    pub start_time: u64,
    /// Number of entries in the body.
    pub entry_count: u32,
}

impl BlockHeader {
    /// Append the encoded header to `buf`.
    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.version);
        buf.put_u32(self.network_id);
        buf.put_slice(self.body_mr.as_bytes());
        buf.put_slice(self.prev_key_mr.as_bytes());
        buf.put_slice(self.prev_block_hash.as_bytes());
        buf.put_u32(self.height);
        buf.put_u64(self.start_time);
        buf.put_u32(self.entry_count);
    }

    /// Encode the header to a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN);
        self.encode_into(&mut buf);
        buf
    }

    /// Decode a header, consuming [`HEADER_LEN`] bytes from `buf`.
    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < HEADER_LEN {
            return Err(BlockError::Truncated {
                context: "block header",
                needed: HEADER_LEN,
                have: buf.remaining(),
            });
        }

        let version = buf.get_u8();
        let network_id = buf.get_u32();
        let mut hash = [0u8; 32];
        buf.copy_to_slice(&mut hash);
        let body_mr = Hash256::from_bytes(hash);
        buf.copy_to_slice(&mut hash);
        let prev_key_mr = Hash256::from_bytes(hash);
        buf.copy_to_slice(&mut hash);
        let prev_block_hash = Hash256::from_bytes(hash);
        let height = buf.get_u32();
        let start_time = buf.get_u64();
        let entry_count = buf.get_u32();

        Ok(Self {
            version,
            network_id,
            body_mr,
            prev_key_mr,
            prev_block_hash,
            height,
            start_time,
            entry_count,
        })
    }

    /// SHA-256 of the encoded header. One of the two leaves of the key
    /// Merkle root.
    pub fn hash(&self) -> Hash256 {
        Hash256::hash(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_header() -> BlockHeader {
        BlockHeader {
            version: BLOCK_VERSION,
            network_id: 0xFA92E5A2,
            body_mr: Hash256::hash(b"body"),
            prev_key_mr: Hash256::hash(b"key"),
            prev_block_hash: Hash256::hash(b"block"),
            height: 42,
            start_time: 1_700_000_000,
            entry_count: 3,
        }
    }

    #[test]
    fn test_encoded_len() {
        assert_eq!(make_header().encode().len(), HEADER_LEN);
    }

    #[test]
    fn test_decode_matches_encode() {
        let header = make_header();
        let bytes = header.encode();
        let decoded = BlockHeader::decode(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_field_layout() {
        let bytes = make_header().encode();
        // version, then network id big-endian
        assert_eq!(bytes[0], BLOCK_VERSION);
        assert_eq!(&bytes[1..5], &[0xFA, 0x92, 0xE5, 0xA2]);
        // height lands after the three 32-byte hashes
        assert_eq!(&bytes[101..105], &42u32.to_be_bytes());
    }

    #[test]
    fn test_decode_truncated() {
        let bytes = make_header().encode();
        let err = BlockHeader::decode(&mut &bytes[..HEADER_LEN - 1]).unwrap_err();
        assert!(matches!(err, BlockError::Truncated { .. }));
    }
}

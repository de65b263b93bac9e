//! Directory block: body entries, codec, hashes, and chain linkage.

use bytes::{Buf, BufMut};
use dirchain_common::{time, Hash256};

use crate::{merkle_root, BlockError, BlockHeader, Result, BLOCK_VERSION, HEADER_LEN};

/// Encoded size of one body entry: two 32-byte hashes.
pub const ENTRY_LEN: usize = 64;

/// One body entry: the anchor of a sub-chain at this height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// Identifier of the anchored sub-chain.
    pub chain_id: Hash256,
    /// Merkle root of that sub-chain's block at this height.
    pub merkle_root: Hash256,
}

impl BlockEntry {
    /// Create an entry.
    pub fn new(chain_id: Hash256, merkle_root: Hash256) -> Self {
        Self {
            chain_id,
            merkle_root,
        }
    }

    /// Append the encoded entry to `buf`.
    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_slice(self.chain_id.as_bytes());
        buf.put_slice(self.merkle_root.as_bytes());
    }

    /// Decode one entry, consuming [`ENTRY_LEN`] bytes from `buf`.
    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < ENTRY_LEN {
            return Err(BlockError::Truncated {
                context: "block entry",
                needed: ENTRY_LEN,
                have: buf.remaining(),
            });
        }
        let mut hash = [0u8; 32];
        buf.copy_to_slice(&mut hash);
        let chain_id = Hash256::from_bytes(hash);
        buf.copy_to_slice(&mut hash);
        let merkle_root = Hash256::from_bytes(hash);
        Ok(Self {
            chain_id,
            merkle_root,
        })
    }

    /// SHA-256 of the encoded entry. The entry's leaf in the body Merkle
    /// tree.
    pub fn leaf_hash(&self) -> Hash256 {
        let mut buf = Vec::with_capacity(ENTRY_LEN);
        self.encode_into(&mut buf);
        Hash256::hash(&buf)
    }
}

/// A complete directory block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBlock {
    /// Fixed-size header.
    pub header: BlockHeader,
    /// Body entries, in anchoring order.
    pub entries: Vec<BlockEntry>,
}

impl DirectoryBlock {
    /// Create the genesis block for a network.
    ///
    /// The genesis block has height 0 and zero parent links. It starts
    /// unsealed; add entries and call [`seal`](Self::seal) before encoding.
    pub fn genesis(network_id: u32) -> Self {
        Self {
            header: BlockHeader {
                version: BLOCK_VERSION,
                network_id,
                body_mr: Hash256::ZERO,
                prev_key_mr: Hash256::ZERO,
                prev_block_hash: Hash256::ZERO,
                height: 0,
                start_time: time::current_timestamp(),
                entry_count: 0,
            },
            entries: Vec::new(),
        }
    }

    /// Create the (unsealed) successor of this block.
    ///
    /// The child takes `prev_key_mr` from this block's key Merkle root,
    /// `prev_block_hash` from this block's hash, and height one greater.
    pub fn successor(&self) -> Self {
        Self {
            header: BlockHeader {
                version: BLOCK_VERSION,
                network_id: self.header.network_id,
                body_mr: Hash256::ZERO,
                prev_key_mr: self.key_merkle_root(),
                prev_block_hash: self.block_hash(),
                height: self.header.height + 1,
                start_time: time::current_timestamp(),
                entry_count: 0,
            },
            entries: Vec::new(),
        }
    }

    /// Append a body entry. The header is not updated until
    /// [`seal`](Self::seal).
    pub fn add_entry(&mut self, entry: BlockEntry) {
        self.entries.push(entry);
    }

    /// Fix the header's `body_mr` and `entry_count` to match the body.
    pub fn seal(&mut self) {
        self.header.entry_count = self.entries.len() as u32;
        self.header.body_mr = self.body_merkle_root();
    }

    /// Merkle root over the body entries' leaf hashes.
    pub fn body_merkle_root(&self) -> Hash256 {
        let leaves: Vec<Hash256> = self.entries.iter().map(BlockEntry::leaf_hash).collect();
        merkle_root(&leaves)
    }

    /// Key Merkle root: the Merkle root of `(SHA256(header), body_mr)`.
    ///
    /// This is the identifier successor blocks link to.
    pub fn key_merkle_root(&self) -> Hash256 {
        merkle_root(&[self.header.hash(), self.header.body_mr])
    }

    /// SHA-256 over the fully encoded block.
    pub fn block_hash(&self) -> Hash256 {
        Hash256::hash(&self.encode())
    }

    /// Encode the block: header, body count, then each entry.
    ///
    /// The body count always reflects `entries.len()`; the header's
    /// `entry_count` is written as-is, so encode sealed blocks.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + 4 + self.entries.len() * ENTRY_LEN);
        self.header.encode_into(&mut buf);
        buf.put_u32(self.entries.len() as u32);
        for entry in &self.entries {
            entry.encode_into(&mut buf);
        }
        buf
    }

    /// Decode a block from `data`.
    ///
    /// The body count is authoritative for how many entries are read.
    /// Trailing bytes after the last entry are ignored.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let header = BlockHeader::decode(&mut buf)?;

        if buf.remaining() < 4 {
            return Err(BlockError::Truncated {
                context: "body count",
                needed: 4,
                have: buf.remaining(),
            });
        }
        let count = buf.get_u32();
        if count as usize > buf.remaining() / ENTRY_LEN {
            return Err(BlockError::EntryCountTooLarge {
                count,
                have: buf.remaining(),
            });
        }

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(BlockEntry::decode(&mut buf)?);
        }

        Ok(Self { header, entries })
    }

    /// Check that this block extends `parent`.
    ///
    /// Verifies the height step, the key Merkle root link, and the block
    /// hash link.
    pub fn verify_linkage(&self, parent: &DirectoryBlock) -> Result<()> {
        let broken = |reason| BlockError::BrokenLinkage {
            height: self.header.height,
            parent: parent.header.height,
            reason,
        };

        if self.header.height != parent.header.height + 1 {
            return Err(broken("height is not parent + 1"));
        }
        if self.header.prev_key_mr != parent.key_merkle_root() {
            return Err(broken("prev_key_mr does not match parent key Merkle root"));
        }
        if self.header.prev_block_hash != parent.block_hash() {
            return Err(broken("prev_block_hash does not match parent hash"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORK_ID: u32 = 0xFA92E5A2;

    fn make_entry(seed: u8) -> BlockEntry {
        BlockEntry::new(Hash256::from_bytes([seed; 32]), Hash256::hash(&[seed]))
    }

    fn sealed_genesis() -> DirectoryBlock {
        let mut block = DirectoryBlock::genesis(NETWORK_ID);
        block.add_entry(make_entry(1));
        block.add_entry(make_entry(2));
        block.seal();
        block
    }

    #[test]
    fn test_genesis_shape() {
        let genesis = DirectoryBlock::genesis(NETWORK_ID);
        assert_eq!(genesis.header.height, 0);
        assert!(genesis.header.prev_key_mr.is_zero());
        assert!(genesis.header.prev_block_hash.is_zero());
    }

    #[test]
    fn test_seal_fixes_header() {
        let block = sealed_genesis();
        assert_eq!(block.header.entry_count, 2);
        assert_eq!(block.header.body_mr, block.body_merkle_root());
    }

    #[test]
    fn test_body_merkle_root_over_leaf_hashes() {
        let block = sealed_genesis();
        let leaves: Vec<Hash256> = block.entries.iter().map(BlockEntry::leaf_hash).collect();
        assert_eq!(block.body_merkle_root(), merkle_root(&leaves));
    }

    #[test]
    fn test_key_merkle_root_is_two_leaf_tree() {
        let block = sealed_genesis();
        let expected = Hash256::hash_pair(&block.header.hash(), &block.header.body_mr);
        assert_eq!(block.key_merkle_root(), expected);
    }

    #[test]
    fn test_decode_matches_encode() {
        let block = sealed_genesis();
        let decoded = DirectoryBlock::decode(&block.encode()).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_decode_honors_body_count() {
        // Body count of 1 with two entries on the wire: the second entry is
        // trailing data and is ignored.
        let block = sealed_genesis();
        let mut bytes = block.encode();
        bytes[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&1u32.to_be_bytes());
        let decoded = DirectoryBlock::decode(&bytes).unwrap();
        assert_eq!(decoded.entries.len(), 1);
        assert_eq!(decoded.entries[0], block.entries[0]);
    }

    #[test]
    fn test_decode_rejects_overlong_count() {
        let block = sealed_genesis();
        let mut bytes = block.encode();
        bytes[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&1000u32.to_be_bytes());
        let err = DirectoryBlock::decode(&bytes).unwrap_err();
        assert!(matches!(err, BlockError::EntryCountTooLarge { .. }));
    }

    #[test]
    fn test_successor_links_to_parent() {
        let genesis = sealed_genesis();
        let mut child = genesis.successor();
        child.add_entry(make_entry(3));
        child.seal();

        assert_eq!(child.header.height, 1);
        assert_eq!(child.header.network_id, NETWORK_ID);
        child.verify_linkage(&genesis).unwrap();
    }

    #[test]
    fn test_verify_linkage_rejects_wrong_parent() {
        let genesis = sealed_genesis();
        let child = genesis.successor();

        let mut other = DirectoryBlock::genesis(NETWORK_ID);
        other.add_entry(make_entry(9));
        other.seal();

        let err = child.verify_linkage(&other).unwrap_err();
        assert!(matches!(err, BlockError::BrokenLinkage { .. }));

        let grandchild = child.successor();
        let err = grandchild.verify_linkage(&genesis).unwrap_err();
        assert!(matches!(
            err,
            BlockError::BrokenLinkage {
                reason: "height is not parent + 1",
                ..
            }
        ));
    }
}

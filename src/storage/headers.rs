//! # On-Disk Record Definitions
//!
//! Type-safe, zerocopy-based layouts for the binary persistence format: one
//! shared header shape plus the packed node and leaf records.
//!
//! ## Zerocopy Safety
//!
//! Every struct here derives the full zerocopy trait set:
//! - `FromBytes`: safe to read from arbitrary bytes
//! - `IntoBytes`: safe to write as bytes
//! - `Immutable`: no interior mutability
//! - `KnownLayout`: compile-time size verification
//! - `Unaligned`: works at any offset in a mapped file
//!
//! Multi-byte fields use explicit little-endian wrappers, so the files are
//! byte-identical across platforms and cost a no-op conversion on every
//! target this crate supports.
//!
//! ## Header Layout (64 bytes)
//!
//! ```text
//! Offset  Size  Field
//! 0       16    magic        file-kind discriminator
//! 16      4     version      format version (currently 1)
//! 20      4     record_size  bytes per record after the header
//! 24      8     count        number of records
//! 32      8     root         signed root reference (same in all three files)
//! 40      24    reserved
//! ```
//!
//! The root is serialized explicitly rather than reconstructed from the
//! record count; post-order emission keeps `count - 1` equal to it, and the
//! loader checks that as a corruption tripwire.

use eyre::{ensure, Result};
use zerocopy::little_endian::{F64, I32, I64, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::FILE_HEADER_SIZE;
use crate::tree::{Leaf, Node};

pub const NODES_MAGIC: &[u8; 16] = b"kdbox nodes\x00\x00\x00\x00\x00";
pub const LEAVES_MAGIC: &[u8; 16] = b"kdbox leaves\x00\x00\x00\x00";
pub const ITEMS_MAGIC: &[u8; 16] = b"kdbox items\x00\x00\x00\x00\x00";

pub const CURRENT_VERSION: u32 = 1;

pub const NODE_RECORD_SIZE: usize = 24;
pub const LEAF_RECORD_SIZE: usize = 8;
pub const ITEM_RECORD_SIZE: usize = 4;

/// Shared header at the start of every binary array file.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ArenaFileHeader {
    magic: [u8; 16],
    version: U32,
    record_size: U32,
    count: U64,
    root: I64,
    reserved: [u8; 24],
}

const _: () = assert!(std::mem::size_of::<ArenaFileHeader>() == FILE_HEADER_SIZE);

impl ArenaFileHeader {
    pub fn new(magic: &[u8; 16], record_size: usize, count: usize, root: i32) -> Self {
        Self {
            magic: *magic,
            version: U32::new(CURRENT_VERSION),
            record_size: U32::new(record_size as u32),
            count: U64::new(count as u64),
            root: I64::new(root as i64),
            reserved: [0u8; 24],
        }
    }

    /// Parses and validates a header against the expected file kind.
    pub fn from_bytes<'a>(
        bytes: &'a [u8],
        magic: &[u8; 16],
        record_size: usize,
        file_name: &str,
    ) -> Result<&'a Self> {
        ensure!(
            bytes.len() >= FILE_HEADER_SIZE,
            "'{}' is too short for a header: {} < {}",
            file_name,
            bytes.len(),
            FILE_HEADER_SIZE
        );

        let header = Self::ref_from_bytes(&bytes[..FILE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse header of '{}': {:?}", file_name, e))?;

        ensure!(
            &header.magic == magic,
            "invalid magic bytes in '{}'",
            file_name
        );

        ensure!(
            header.version.get() == CURRENT_VERSION,
            "unsupported version {} in '{}' (expected {})",
            header.version.get(),
            file_name,
            CURRENT_VERSION
        );

        ensure!(
            header.record_size.get() as usize == record_size,
            "record size mismatch in '{}': {} (expected {})",
            file_name,
            header.record_size.get(),
            record_size
        );

        Ok(header)
    }

    pub fn count(&self) -> usize {
        self.count.get() as usize
    }

    pub fn root(&self) -> i32 {
        self.root.get() as i32
    }
}

/// Packed internal node: axis, split plane, three signed child references.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct NodeRecord {
    axis: U32,
    split: F64,
    low: I32,
    mid: I32,
    high: I32,
}

const _: () = assert!(std::mem::size_of::<NodeRecord>() == NODE_RECORD_SIZE);

impl NodeRecord {
    pub fn encode(node: Node) -> Self {
        Self {
            axis: U32::new(node.axis),
            split: F64::new(node.split),
            low: I32::new(node.low),
            mid: I32::new(node.mid),
            high: I32::new(node.high),
        }
    }

    pub fn decode(&self) -> Node {
        Node {
            axis: self.axis.get(),
            split: self.split.get(),
            low: self.low.get(),
            mid: self.mid.get(),
            high: self.high.get(),
        }
    }
}

/// Packed leaf: inclusive item-run range.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct LeafRecord {
    first_item: I32,
    last_item: I32,
}

const _: () = assert!(std::mem::size_of::<LeafRecord>() == LEAF_RECORD_SIZE);

impl LeafRecord {
    pub fn encode(leaf: Leaf) -> Self {
        Self {
            first_item: I32::new(leaf.first_item),
            last_item: I32::new(leaf.last_item),
        }
    }

    pub fn decode(&self) -> Leaf {
        Leaf {
            first_item: self.first_item.get(),
            last_item: self.last_item.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_64() {
        assert_eq!(std::mem::size_of::<ArenaFileHeader>(), 64);
    }

    #[test]
    fn header_roundtrip() {
        let header = ArenaFileHeader::new(NODES_MAGIC, NODE_RECORD_SIZE, 42, 41);
        let bytes = header.as_bytes();

        let parsed =
            ArenaFileHeader::from_bytes(bytes, NODES_MAGIC, NODE_RECORD_SIZE, "nodes").unwrap();

        assert_eq!(parsed.count(), 42);
        assert_eq!(parsed.root(), 41);
    }

    #[test]
    fn header_rejects_wrong_magic() {
        let header = ArenaFileHeader::new(NODES_MAGIC, NODE_RECORD_SIZE, 1, 0);
        let bytes = header.as_bytes();

        assert!(
            ArenaFileHeader::from_bytes(bytes, LEAVES_MAGIC, NODE_RECORD_SIZE, "nodes").is_err()
        );
    }

    #[test]
    fn header_rejects_wrong_record_size() {
        let header = ArenaFileHeader::new(NODES_MAGIC, NODE_RECORD_SIZE, 1, 0);
        let bytes = header.as_bytes();

        assert!(
            ArenaFileHeader::from_bytes(bytes, NODES_MAGIC, LEAF_RECORD_SIZE, "nodes").is_err()
        );
    }

    #[test]
    fn header_rejects_truncation() {
        let header = ArenaFileHeader::new(ITEMS_MAGIC, ITEM_RECORD_SIZE, 1, -1);
        let bytes = header.as_bytes();

        assert!(
            ArenaFileHeader::from_bytes(&bytes[..32], ITEMS_MAGIC, ITEM_RECORD_SIZE, "items")
                .is_err()
        );
    }

    #[test]
    fn node_record_roundtrip() {
        let node = Node {
            axis: 3,
            split: -12.5,
            low: 7,
            mid: -2,
            high: -9,
        };

        let record = NodeRecord::encode(node);
        assert_eq!(record.as_bytes().len(), NODE_RECORD_SIZE);
        assert_eq!(record.decode(), node);
    }

    #[test]
    fn leaf_record_roundtrip() {
        let leaf = Leaf {
            first_item: 10,
            last_item: 9,
        };

        let record = LeafRecord::encode(leaf);
        assert_eq!(record.decode(), leaf);
    }

    #[test]
    fn magics_are_distinct() {
        assert_ne!(NODES_MAGIC, LEAVES_MAGIC);
        assert_ne!(NODES_MAGIC, ITEMS_MAGIC);
        assert_ne!(LEAVES_MAGIC, ITEMS_MAGIC);
    }
}

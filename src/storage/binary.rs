//! # Binary Format
//!
//! A directory of three raw array files that reload by memory-mapping. The
//! write path serializes each store through its zerocopy record type; the
//! read path maps the files and reads records in place, so reload time is
//! independent of tree size and the OS page cache is shared across
//! processes holding the same index.
//!
//! ## Validation
//!
//! Opening is the trust boundary. After the three headers check out, one
//! pass over the node and leaf records verifies structural integrity:
//!
//! - node children reference strictly earlier nodes (post-order implies
//!   every cycle or forward edge is corruption) or in-range leaves
//! - node axes fit the tree's dimensionality
//! - leaf runs lie inside the item store
//! - the stored root matches the post-order invariant `node_count - 1`
//!
//! After that pass the record accessors are infallible: every offset they
//! can compute has been proven in bounds.

use std::fs;
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use zerocopy::little_endian::I32;
use zerocopy::{FromBytes, IntoBytes};

use super::headers::{
    ArenaFileHeader, LeafRecord, NodeRecord, ITEMS_MAGIC, ITEM_RECORD_SIZE, LEAVES_MAGIC,
    LEAF_RECORD_SIZE, NODES_MAGIC, NODE_RECORD_SIZE,
};
use super::mmap::MappedFile;
use super::FILE_HEADER_SIZE;
use crate::tree::{leaf_index, leaf_ref, ArenaStore, Leaf, Node};

pub const NODES_FILE: &str = "nodes";
pub const LEAVES_FILE: &str = "leaves";
pub const ITEMS_FILE: &str = "items";

/// Writes the three array files into `dir`, creating it if needed.
pub fn write_binary(dir: &Path, store: &ArenaStore, root: i32) -> Result<()> {
    fs::create_dir_all(dir)
        .wrap_err_with(|| format!("failed to create index directory '{}'", dir.display()))?;

    let node_count = store.node_count();
    let mut nodes = file_buffer(NODES_MAGIC, NODE_RECORD_SIZE, node_count, root);
    for index in 0..node_count {
        let record = NodeRecord::encode(store.node(index as i32));
        nodes.extend_from_slice(record.as_bytes());
    }
    write_file(dir, NODES_FILE, &nodes)?;

    let leaf_count = store.leaf_count();
    let mut leaves = file_buffer(LEAVES_MAGIC, LEAF_RECORD_SIZE, leaf_count, root);
    for index in 0..leaf_count {
        let record = LeafRecord::encode(store.leaf_at(index));
        leaves.extend_from_slice(record.as_bytes());
    }
    write_file(dir, LEAVES_FILE, &leaves)?;

    let item_count = store.item_count();
    let mut items = file_buffer(ITEMS_MAGIC, ITEM_RECORD_SIZE, item_count, root);
    for index in 0..item_count {
        items.extend_from_slice(I32::new(store.item(index as i32)).as_bytes());
    }
    write_file(dir, ITEMS_FILE, &items)?;

    Ok(())
}

fn file_buffer(magic: &[u8; 16], record_size: usize, count: usize, root: i32) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(FILE_HEADER_SIZE + count * record_size);
    let header = ArenaFileHeader::new(magic, record_size, count, root);
    buffer.extend_from_slice(header.as_bytes());
    buffer
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let path = dir.join(name);
    fs::write(&path, bytes)
        .wrap_err_with(|| format!("failed to write index file '{}'", path.display()))
}

/// Maps and validates the three array files of a persisted tree.
pub fn read_binary(dir: &Path, dims: usize) -> Result<MappedArena> {
    let arena = MappedArena::open(dir)?;
    arena.validate(dims)?;
    Ok(arena)
}

/// A frozen arena backed by three memory-mapped files.
///
/// The maps live as long as this value; dropping the tree handle unmaps
/// them. Record accessors mirror the heap arena exactly.
#[derive(Debug)]
pub struct MappedArena {
    nodes: MappedFile,
    leaves: MappedFile,
    items: MappedFile,
    node_count: usize,
    leaf_count: usize,
    item_count: usize,
    root: i32,
}

impl MappedArena {
    fn open(dir: &Path) -> Result<Self> {
        let nodes = MappedFile::open(dir.join(NODES_FILE))?;
        let leaves = MappedFile::open(dir.join(LEAVES_FILE))?;
        let items = MappedFile::open(dir.join(ITEMS_FILE))?;

        let node_count =
            checked_count(&nodes, NODES_MAGIC, NODE_RECORD_SIZE, NODES_FILE)?;
        let leaf_count =
            checked_count(&leaves, LEAVES_MAGIC, LEAF_RECORD_SIZE, LEAVES_FILE)?;
        let item_count =
            checked_count(&items, ITEMS_MAGIC, ITEM_RECORD_SIZE, ITEMS_FILE)?;

        let header = ArenaFileHeader::from_bytes(
            nodes.bytes(),
            NODES_MAGIC,
            NODE_RECORD_SIZE,
            NODES_FILE,
        )?;
        let root = header.root();

        nodes.prefetch();
        leaves.prefetch();
        items.prefetch();

        Ok(Self {
            nodes,
            leaves,
            items,
            node_count,
            leaf_count,
            item_count,
            root,
        })
    }

    /// Structural integrity pass; see the module docs for the checks.
    fn validate(&self, dims: usize) -> Result<()> {
        ensure!(
            self.leaf_count >= 1,
            "index has no leaves; even an empty tree stores one"
        );

        // Post-order: the last node written is the root, or leaf 0 when
        // there are no nodes at all.
        let expected_root = if self.node_count == 0 {
            leaf_ref(0)
        } else {
            self.node_count as i32 - 1
        };
        ensure!(
            self.root == expected_root,
            "stored root {} disagrees with post-order layout (expected {})",
            self.root,
            expected_root
        );

        for index in 0..self.node_count {
            let node = self.node(index as i32);

            ensure!(
                (node.axis as usize) < dims,
                "node {} splits axis {} but the tree has {} dimensions",
                index,
                node.axis,
                dims
            );

            for child in [node.low, node.mid, node.high] {
                if child >= 0 {
                    ensure!(
                        (child as usize) < index,
                        "node {} references node {} out of post-order",
                        index,
                        child
                    );
                } else {
                    ensure!(
                        leaf_index(child) < self.leaf_count,
                        "node {} references leaf {} of {}",
                        index,
                        leaf_index(child),
                        self.leaf_count
                    );
                }
            }
        }

        for index in 0..self.leaf_count {
            let leaf = self.leaf_at(index);
            ensure!(
                leaf.first_item >= 0
                    && leaf.last_item >= leaf.first_item - 1
                    && (leaf.last_item as i64) < self.item_count as i64,
                "leaf {} spans items {}..={} outside the {}-item store",
                index,
                leaf.first_item,
                leaf.last_item,
                self.item_count
            );
        }

        Ok(())
    }

    pub fn root(&self) -> i32 {
        self.root
    }

    pub fn node(&self, index: i32) -> Node {
        let bytes = record_bytes(&self.nodes, index as usize, NODE_RECORD_SIZE);
        match NodeRecord::ref_from_bytes(bytes) {
            Ok(record) => record.decode(),
            // Exact-size slice of an Unaligned record: the cast cannot fail.
            Err(_) => unreachable!("node record cast after header validation"),
        }
    }

    pub fn leaf_at(&self, index: usize) -> Leaf {
        let bytes = record_bytes(&self.leaves, index, LEAF_RECORD_SIZE);
        match LeafRecord::ref_from_bytes(bytes) {
            Ok(record) => record.decode(),
            Err(_) => unreachable!("leaf record cast after header validation"),
        }
    }

    pub fn item(&self, index: i32) -> i32 {
        let bytes = record_bytes(&self.items, index as usize, ITEM_RECORD_SIZE);
        match I32::ref_from_bytes(bytes) {
            Ok(record) => record.get(),
            Err(_) => unreachable!("item record cast after header validation"),
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }
}

fn checked_count(
    file: &MappedFile,
    magic: &[u8; 16],
    record_size: usize,
    file_name: &str,
) -> Result<usize> {
    let header = ArenaFileHeader::from_bytes(file.bytes(), magic, record_size, file_name)?;
    let count = header.count();

    // Checked math: the count is untrusted and could be chosen to wrap.
    let expected_len = count
        .checked_mul(record_size)
        .and_then(|body| body.checked_add(FILE_HEADER_SIZE));
    ensure!(
        expected_len == Some(file.len()),
        "'{}' declares {} records but is {} bytes",
        file_name,
        count,
        file.len()
    );

    Ok(count)
}

fn record_bytes(file: &MappedFile, index: usize, record_size: usize) -> &[u8] {
    let offset = FILE_HEADER_SIZE + index * record_size;
    &file.bytes()[offset..offset + record_size]
}

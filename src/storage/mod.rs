//! # Persistence Layer
//!
//! Serializes the frozen arena so subsequent processes can share one build
//! cost. Only the structural tree goes to disk — nodes, leaves, and the
//! item-id run; objects and the bounds callback are re-supplied by whoever
//! reloads the index.
//!
//! ## Two Encodings
//!
//! - **Text** (`text`): a line-based, human-inspectable pre-order dump.
//!   Portable and diffable; parsed back record by record.
//! - **Binary** (`binary`): a directory of three raw little-endian array
//!   files that reload by memory-mapping, so a reload costs three `mmap`
//!   calls regardless of tree size.
//!
//! ## Binary Directory Layout
//!
//! ```text
//! index_dir/
//! ├── nodes     64B header + node_count  x 24B NodeRecord
//! ├── leaves    64B header + leaf_count  x  8B LeafRecord
//! └── items     64B header + item_count  x  4B i32
//! ```
//!
//! Every file starts with the same 64-byte header shape: magic bytes,
//! format version, record size, record count, and the signed root
//! reference. The header is the unit of validation — wrong magic, wrong
//! version, wrong record size, or a byte length that disagrees with the
//! declared count all fail the load before any record is read.
//!
//! ## Mapped Lifetime
//!
//! A binary reload keeps the three maps alive inside [`MappedArena`] for
//! the lifetime of the tree handle; unmapping happens at drop. The files
//! must not be mutated while mapped.

mod binary;
mod headers;
mod mmap;
mod text;

pub use binary::{read_binary, write_binary, MappedArena, ITEMS_FILE, LEAVES_FILE, NODES_FILE};
pub use headers::{
    ArenaFileHeader, LeafRecord, NodeRecord, CURRENT_VERSION, ITEMS_MAGIC, ITEM_RECORD_SIZE,
    LEAVES_MAGIC, LEAF_RECORD_SIZE, NODES_MAGIC, NODE_RECORD_SIZE,
};
pub use mmap::MappedFile;
pub use text::{read_text, write_text, ParseError};

/// Size of the fixed header at the start of every binary array file.
pub const FILE_HEADER_SIZE: usize = 64;

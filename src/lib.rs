//! # kdbox - Static K-D Tree Over Axis-Aligned Boxes
//!
//! kdbox is a build-once, query-many n-dimensional spatial index: it finds
//! every stored axis-aligned bounding box (including degenerate point boxes)
//! that intersects a query box. This implementation prioritizes:
//!
//! - **Flat, relocatable storage**: the whole tree is three integer-indexed
//!   arrays, written to disk and memory-mapped back without fixups
//! - **Zero allocation on the hot paths**: bump-allocated build events,
//!   stack-inlined coordinate scratch, reusable bounds buffers
//! - **Lock-free reads**: after construction the tree is immutable, so any
//!   number of threads query one handle concurrently
//!
//! ## Quick Start
//!
//! ```ignore
//! use kdbox::{builder, Extent, FnSource};
//!
//! let source = FnSource::new(|id, min, max| {
//!     let b = &boxes[(id - 1) as usize];
//!     min.copy_from_slice(&b.lo);
//!     max.copy_from_slice(&b.hi);
//!     Ok(Extent::Region)
//! });
//!
//! let index = builder().dims(2).build(source, 1..=boxes.len() as i32)?;
//!
//! for id in index.query(&[0.4, 0.4], &[0.6, 0.6])? {
//!     println!("hit: {}", id?);
//! }
//!
//! index.write_binary("./index_dir")?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Facade (BoxIndex / builder)      │
//! ├─────────────────────────────────────┤
//! │  Bounds Seam (BoxSource callbacks)   │
//! ├───────────────────┬─────────────────┤
//! │   Sweep Splitter  │  Query Engine    │
//! ├───────────────────┴─────────────────┤
//! │   Arena (nodes / leaves / items)     │
//! ├─────────────────────────────────────┤
//! │  Persistence (text / mmap binary)    │
//! └─────────────────────────────────────┘
//! ```
//!
//! Construction lowers every item into per-axis boundary events, then a
//! recursive sweep picks the cheapest split plane per node and partitions
//! items three ways: strictly below, straddling, strictly above. Straddlers
//! get their own `mid` child instead of being duplicated, so every item
//! lives in exactly one leaf and storage stays linear in the item count.
//!
//! ## File Layout
//!
//! ```text
//! index_dir/            (binary encoding, see `storage`)
//! ├── nodes             packed 24-byte node records
//! ├── leaves            packed 8-byte leaf records
//! └── items             packed item ids
//!
//! index.txt             (text encoding: counts line + pre-order body)
//! ```
//!
//! ## Module Overview
//!
//! - [`index`]: the `BoxIndex` handle, fluent builder, object mode
//! - [`tree`]: arena, build events, sweep splitter, query engine
//! - [`storage`]: text and memory-mapped binary persistence
//! - [`bounds`]: the bounds-callback seam and AABB overlap test
//! - [`config`]: tuning constants
//!
//! ## What kdbox Is Not
//!
//! No incremental insertion or deletion (rebuild instead), no
//! nearest-neighbor search (overlap queries only), and no internal
//! locking — immutability is the concurrency story.

pub mod bounds;
pub mod config;
pub mod index;
pub mod storage;
pub mod tree;

pub use bounds::{boxes_overlap, BoxSource, DimensionError, Extent, FnSource};
pub use index::{builder, BoxIndex, IndexBuilder, ObjectHits, ObjectIndex, ObjectSource};
pub use storage::ParseError;
pub use tree::{CapacityError, QueryIter};

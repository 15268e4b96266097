//! # Static Three-Way K-D Tree
//!
//! The core of kdbox: a build-once, query-many spatial tree over axis-aligned
//! boxes, stored entirely in flat arrays and navigated by signed integer
//! references.
//!
//! ## Shape
//!
//! Every internal node carries one split plane and *three* children:
//!
//! ```text
//!                 (axis 0, split 4.0)
//!                /         |         \
//!             low         mid         high
//!        max <= 4.0   straddles    min > 4.0
//! ```
//!
//! Items crossing the plane live in the dedicated `mid` child instead of
//! being duplicated into both halves. That keeps every item in exactly one
//! leaf, bounds storage by `O(n · depth)`, and costs queries one extra
//! mandatory descent per node.
//!
//! ## Arena Layout
//!
//! ```text
//! nodes:   [Node 0][Node 1]...[Node k-1]      root is Node k-1 (post-order)
//! leaves:  [Leaf 0][Leaf 1]...[Leaf m-1]      inclusive ranges into items
//! items:   [id][id][id]...                    one entry per stored item
//! ```
//!
//! Child references are `i32`: non-negative for nodes, `-(leaf + 1)` for
//! leaves. The same encoding goes to disk unchanged.
//!
//! ## Build Pipeline
//!
//! ```text
//! ids ──bounds──> per-axis event streams ──sweep──> split choice
//!                        │                              │
//!                        └──────── partition ───────────┘
//!                                     │
//!                          low / mid / high recursion
//!                                     │
//!                              arena emission
//! ```
//!
//! Events are transient: they live in a bump arena owned by the build and
//! are released wholesale once the root is emitted.
//!
//! ## Concurrency
//!
//! Construction mutates the arena through `&mut`; after the root reference
//! is returned the tree is immutable and queries are pure reads, so any
//! number of threads may query one tree concurrently with no locking.

mod arena;
mod build;
mod event;
mod query;

pub use arena::{leaf_index, leaf_ref, Arena, ArenaStore, CapacityError, Leaf, Node, StoreKind};
pub use build::TreeBuilder;
pub use event::{generate, Event, EventKind, EventStreams};
pub use query::{visit, QueryIter};

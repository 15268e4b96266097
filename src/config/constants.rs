//! # kdbox Configuration Constants
//!
//! This module centralizes tuning constants, grouping interdependent values
//! together and documenting their relationships. Constants that depend on
//! each other are co-located to prevent mismatch bugs.
//!
//! ## Dependency Graph
//!
//! ```text
//! DEFAULT_LEAF_SIZE (100)
//!       │
//!       └─> Arena limits: node/leaf stores are sized as
//!           ARENA_OVERCOMMIT * ceil(item_count / leaf_size).
//!           Shrinking DEFAULT_LEAF_SIZE grows the limits and deepens
//!           the tree; both effects are linear.
//!
//! ARENA_OVERCOMMIT (4)
//!       │
//!       ├─> node_limit  = ARENA_OVERCOMMIT * ceil(n / leaf_size)
//!       ├─> leaf_limit  = ARENA_OVERCOMMIT * ceil(n / leaf_size)
//!       └─> item_limit  = max(n, leaf_limit * leaf_size)
//!             The sweep splitter usually emits far fewer leaves than the
//!             limit; adversarial inputs that fragment into tiny leaves
//!             exhaust it and the build fails with CapacityError instead
//!             of growing unboundedly.
//!
//! INLINE_DIMS (4)
//!       │
//!       └─> Query corners and bounds scratch use SmallVec<[f64; INLINE_DIMS]>.
//!           Trees with dims <= INLINE_DIMS never heap-allocate per query.
//! ```
//!
//! ## Critical Invariants
//!
//! These invariants are enforced by compile-time assertions:
//!
//! 1. `DEFAULT_LEAF_SIZE >= 1` (a zero leaf size never terminates a branch)
//! 2. `ARENA_OVERCOMMIT >= 1` (store limits must cover at least one chunk)
//! 3. `INLINE_DIMS >= 1` (scratch vectors hold at least one coordinate)
//!
//! ## Modifying Constants
//!
//! Before changing any constant:
//! 1. Check the dependency graph above
//! 2. Run `cargo build` to verify compile-time assertions
//! 3. Run the full test suite (the oracle tests exercise dims 2..=5)
//! 4. Benchmark build and query throughput

/// Default maximum item count below which the splitter emits a leaf.
///
/// Construction terminates a branch when fewer than this many items remain,
/// so leaves hold at most `DEFAULT_LEAF_SIZE - 1` items.
pub const DEFAULT_LEAF_SIZE: usize = 100;

/// Overcommit factor for the node and leaf stores.
///
/// A perfectly balanced build needs roughly `ceil(n / leaf_size)` leaves and
/// one fewer internal node. The factor of 4 absorbs the imbalance the cost
/// heuristic produces on real data without letting a pathological build
/// allocate without bound.
pub const ARENA_OVERCOMMIT: usize = 4;

/// Inline capacity of coordinate scratch vectors.
///
/// Bounds callbacks and query corners stay on the stack for trees of up to
/// this many dimensions.
pub const INLINE_DIMS: usize = 4;

/// Upper bound on per-store preallocation during deserialization.
///
/// The counts line of a text file (or a binary header) is untrusted input.
/// Deserialization reserves at most this many records per store up front;
/// stores with larger declared counts grow on demand while the declared
/// limits are still enforced record by record.
pub const READ_PREALLOC_CAP: usize = 1 << 16;

const _: () = assert!(
    DEFAULT_LEAF_SIZE >= 1,
    "DEFAULT_LEAF_SIZE must be >= 1 or no branch ever terminates in a leaf"
);

const _: () = assert!(
    ARENA_OVERCOMMIT >= 1,
    "ARENA_OVERCOMMIT must be >= 1 or every arena limit collapses to zero"
);

const _: () = assert!(
    INLINE_DIMS >= 1,
    "INLINE_DIMS must be >= 1 to hold a coordinate"
);

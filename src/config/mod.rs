//! # kdbox Configuration Module
//!
//! This module centralizes tuning constants. Constants are grouped by their
//! functional area and interdependencies are documented and enforced through
//! compile-time assertions.
//!
//! ## Why Centralization?
//!
//! The arena sizing formulas combine three values (`DEFAULT_LEAF_SIZE`,
//! `ARENA_OVERCOMMIT`, the item count) that must stay mutually consistent:
//! a zero leaf size or overcommit factor would collapse every store limit to
//! nothing and fail all builds. Co-locating the constants and asserting the
//! invariants at compile time keeps a stray edit from shipping.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency
//!   documentation

pub mod constants;
pub use constants::*;

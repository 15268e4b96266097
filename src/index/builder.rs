//! # Index Builder
//!
//! Fluent configuration for building or reloading a [`BoxIndex`].
//!
//! ## Configuration Options
//!
//! | Option      | Default | Constraint | Description                        |
//! |-------------|---------|------------|------------------------------------|
//! | `dims`      | —       | `>= 1`     | Dimensionality; required           |
//! | `leaf_size` | 100     | `>= 1`     | Item count below which a branch    |
//! |             |         |            | terminates in a leaf               |
//!
//! ## Entry Points
//!
//! - [`IndexBuilder::build`] — construct from scratch over an inclusive id
//!   range.
//! - [`IndexBuilder::load_text`] — reload a text serialization into a
//!   heap-backed arena.
//! - [`IndexBuilder::load_binary`] — reload a binary directory into a
//!   memory-mapped arena.
//!
//! The loads take the same bounds source a build does: the file stores only
//! the structural tree, and queries need the source to resolve ids back to
//! boxes.

use std::fs::File;
use std::io::BufReader;
use std::ops::RangeInclusive;
use std::path::Path;

use bumpalo::Bump;
use eyre::{ensure, Result, WrapErr};

use crate::bounds::BoxSource;
use crate::config::DEFAULT_LEAF_SIZE;
use crate::tree::{generate, Arena, ArenaStore, TreeBuilder};

use super::BoxIndex;

/// Builder for configuring and opening a kdbox index.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    dims: Option<usize>,
    leaf_size: usize,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self {
            dims: None,
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }

    /// Sets the dimensionality. Required; must be at least 1.
    pub fn dims(mut self, dims: usize) -> Self {
        self.dims = Some(dims);
        self
    }

    /// Sets the leaf-size threshold. Defaults to
    /// [`DEFAULT_LEAF_SIZE`]; must be at least 1.
    pub fn leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    fn checked_config(&self) -> Result<(usize, usize)> {
        let dims = match self.dims {
            Some(dims) => dims,
            None => eyre::bail!("index dimensionality was not configured; call .dims(n)"),
        };
        ensure!(dims >= 1, "index needs at least 1 dimension, got {}", dims);
        ensure!(
            self.leaf_size >= 1,
            "leaf size must be at least 1, got {}",
            self.leaf_size
        );
        Ok((dims, self.leaf_size))
    }

    /// Builds a fresh index over the ids of an inclusive integer range.
    ///
    /// Resolves every id through `source` exactly once, then the event
    /// sweep takes over; the transient event storage is released before
    /// this returns.
    pub fn build<S: BoxSource>(self, source: S, ids: RangeInclusive<i32>) -> Result<BoxIndex<S>> {
        let (dims, leaf_size) = self.checked_config()?;

        let bump = Bump::new();
        let streams = generate(&bump, &source, dims, ids)?;

        let mut arena = Arena::for_build(streams.item_count, leaf_size);
        let root = TreeBuilder::new(&mut arena, &bump, leaf_size).build(streams)?;

        Ok(BoxIndex::from_parts(
            dims,
            leaf_size,
            source,
            ArenaStore::Heap(arena),
            root,
        ))
    }

    /// Reloads a text serialization written by
    /// [`BoxIndex::write_text`].
    pub fn load_text<S: BoxSource, P: AsRef<Path>>(
        self,
        path: P,
        source: S,
    ) -> Result<BoxIndex<S>> {
        let (dims, leaf_size) = self.checked_config()?;

        let path = path.as_ref();
        let file = File::open(path)
            .wrap_err_with(|| format!("failed to open index text '{}'", path.display()))?;

        let (arena, root) = crate::storage::read_text(BufReader::new(file), dims)
            .wrap_err_with(|| format!("failed to parse index text '{}'", path.display()))?;

        Ok(BoxIndex::from_parts(
            dims,
            leaf_size,
            source,
            ArenaStore::Heap(arena),
            root,
        ))
    }

    /// Memory-maps a binary directory written by
    /// [`BoxIndex::write_binary`]. The maps stay alive for the life of the
    /// returned handle.
    pub fn load_binary<S: BoxSource, P: AsRef<Path>>(
        self,
        dir: P,
        source: S,
    ) -> Result<BoxIndex<S>> {
        let (dims, leaf_size) = self.checked_config()?;

        let mapped = crate::storage::read_binary(dir.as_ref(), dims)?;
        let root = mapped.root();

        Ok(BoxIndex::from_parts(
            dims,
            leaf_size,
            source,
            ArenaStore::Mapped(mapped),
            root,
        ))
    }
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{Extent, FnSource};

    fn points() -> FnSource<impl Fn(i32, &mut [f64], &mut [f64]) -> Result<Extent>> {
        FnSource::new(|id, min: &mut [f64], _: &mut [f64]| {
            min[0] = id as f64;
            Ok(Extent::Point)
        })
    }

    #[test]
    fn dims_are_required() {
        let err = IndexBuilder::new().build(points(), 1..=4).unwrap_err();
        assert!(err.to_string().contains("dims"));
    }

    #[test]
    fn zero_dims_are_rejected() {
        let err = IndexBuilder::new()
            .dims(0)
            .build(points(), 1..=4)
            .unwrap_err();
        assert!(err.to_string().contains("at least 1 dimension"));
    }

    #[test]
    fn zero_leaf_size_is_rejected() {
        let err = IndexBuilder::new()
            .dims(1)
            .leaf_size(0)
            .build(points(), 1..=4)
            .unwrap_err();
        assert!(err.to_string().contains("leaf size"));
    }

    #[test]
    fn default_leaf_size_applies() {
        let index = IndexBuilder::new().dims(1).build(points(), 1..=4).unwrap();
        assert_eq!(index.leaf_size(), DEFAULT_LEAF_SIZE);
    }
}

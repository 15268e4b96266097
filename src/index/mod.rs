//! # Index Facade
//!
//! The public face of kdbox: the [`BoxIndex`] tree handle, the fluent
//! [`IndexBuilder`], and the object-mode wrapper [`ObjectIndex`].
//!
//! ## Two Item Modes
//!
//! - **Index mode**: items are the integers of an inclusive range; the
//!   stored id is the integer itself and the caller's [`BoxSource`] maps it
//!   to a box. This is the zero-overhead path for callers that already key
//!   their objects by integer.
//! - **Object mode**: [`ObjectIndex`] owns an ordered `Vec<T>` and a
//!   per-object bounds closure; stored ids are 1-based positions and query
//!   results resolve back to `&T`.
//!
//! ## Handle Lifecycle
//!
//! ```text
//! builder().dims(2).build(source, 1..=n)     fresh build
//! builder().dims(2).load_text(path, source)  reload, heap-backed
//! builder().dims(2).load_binary(dir, source) reload, mmap-backed
//! ```
//!
//! Whatever the origin, the handle is frozen: queries are pure reads and a
//! `&BoxIndex` can be shared across threads freely. Persisting writes only
//! the structural tree; reloads re-supply the source, which is why the
//! load methods take one.

mod builder;
mod objects;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use eyre::{Result, WrapErr};

use crate::bounds::{check_dims, BoxSource};
use crate::tree::{ArenaStore, QueryIter};

pub use builder::IndexBuilder;
pub use objects::{ObjectHits, ObjectIndex, ObjectSource};

/// Starts configuring an index. Equivalent to [`IndexBuilder::new`].
pub fn builder() -> IndexBuilder {
    IndexBuilder::new()
}

/// A frozen spatial index over axis-aligned boxes.
///
/// Holds the structural tree and the caller's bounds source; the objects
/// themselves stay wherever the caller keeps them.
#[derive(Debug)]
pub struct BoxIndex<S: BoxSource> {
    dims: usize,
    leaf_size: usize,
    source: S,
    store: ArenaStore,
    root: i32,
}

impl<S: BoxSource> BoxIndex<S> {
    pub(crate) fn from_parts(
        dims: usize,
        leaf_size: usize,
        source: S,
        store: ArenaStore,
        root: i32,
    ) -> Self {
        Self {
            dims,
            leaf_size,
            source,
            store,
            root,
        }
    }

    /// Streams the ids of every stored item whose box overlaps the query box.
    pub fn query(&self, q_min: &[f64], q_max: &[f64]) -> Result<QueryIter<'_, S>> {
        check_dims(self.dims, q_min)?;
        check_dims(self.dims, q_max)?;

        Ok(QueryIter::new(
            &self.store,
            &self.source,
            self.root,
            q_min,
            q_max,
        ))
    }

    /// Point query: `max == min`.
    pub fn query_point(&self, point: &[f64]) -> Result<QueryIter<'_, S>> {
        self.query(point, point)
    }

    /// Push-style query: invokes `action` for every hit instead of
    /// returning an iterator.
    pub fn visit<F: FnMut(i32)>(&self, q_min: &[f64], q_max: &[f64], action: F) -> Result<()> {
        check_dims(self.dims, q_min)?;
        check_dims(self.dims, q_max)?;

        crate::tree::visit(&self.store, &self.source, self.root, q_min, q_max, action)
    }

    /// Serializes the structural tree to the line-based text format.
    pub fn write_text<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .wrap_err_with(|| format!("failed to create '{}'", path.display()))?;

        let mut out = BufWriter::new(file);
        crate::storage::write_text(&mut out, &self.store, self.root)?;
        out.flush()
            .wrap_err_with(|| format!("failed to flush '{}'", path.display()))
    }

    /// Serializes the structural tree to the mmap-ready binary directory.
    pub fn write_binary<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        crate::storage::write_binary(dir.as_ref(), &self.store, self.root)
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    pub fn leaf_count(&self) -> usize {
        self.store.leaf_count()
    }

    /// Number of stored item ids.
    pub fn item_count(&self) -> usize {
        self.store.item_count()
    }

    pub fn is_empty(&self) -> bool {
        self.store.item_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{DimensionError, Extent, FnSource};

    fn unit_segments() -> FnSource<impl Fn(i32, &mut [f64], &mut [f64]) -> Result<Extent>> {
        // Item i covers [i, i+1] x [0, 1].
        FnSource::new(|id, min: &mut [f64], max: &mut [f64]| {
            min[0] = id as f64;
            min[1] = 0.0;
            max[0] = id as f64 + 1.0;
            max[1] = 1.0;
            Ok(Extent::Region)
        })
    }

    #[test]
    fn build_and_query_index_mode() {
        let index = builder()
            .dims(2)
            .leaf_size(4)
            .build(unit_segments(), 1..=64)
            .unwrap();

        assert_eq!(index.item_count(), 64);

        let mut hits: Vec<i32> = index
            .query(&[10.5, 0.2], &[12.5, 0.3])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        hits.sort_unstable();

        // Segments 9..=12 touch [10.5, 12.5] on the first axis.
        assert_eq!(hits, vec![9, 10, 11, 12]);
    }

    #[test]
    fn wrong_query_dimension_is_a_typed_error() {
        let index = builder()
            .dims(2)
            .build(unit_segments(), 1..=8)
            .unwrap();

        let err = index.query(&[0.0], &[1.0]).unwrap_err();
        assert!(err.downcast_ref::<DimensionError>().is_some());
    }

    #[test]
    fn empty_range_builds_empty_index() {
        let index = builder()
            .dims(2)
            .build(unit_segments(), 1..=0)
            .unwrap();

        assert!(index.is_empty());
        let hits: Vec<i32> = index
            .query(&[-100.0, -100.0], &[100.0, 100.0])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn visit_and_iterator_agree() {
        let index = builder()
            .dims(2)
            .leaf_size(3)
            .build(unit_segments(), 1..=32)
            .unwrap();

        let mut visited = Vec::new();
        index
            .visit(&[4.5, 0.0], &[8.5, 1.0], |id| visited.push(id))
            .unwrap();
        visited.sort_unstable();

        let mut iterated: Vec<i32> = index
            .query(&[4.5, 0.0], &[8.5, 1.0])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        iterated.sort_unstable();

        assert_eq!(visited, iterated);
        assert!(!visited.is_empty());
    }
}

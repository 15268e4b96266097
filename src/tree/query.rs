//! # Query Engine
//!
//! Descends the frozen arena against a query box, yielding the ids of every
//! stored item whose box overlaps it.
//!
//! ## Descent Rule
//!
//! At a node splitting axis `a` at `s`:
//!
//! ```text
//! q_min[a] <= s   the low child can hold overlapping items
//! q_max[a] >= s   the high child can hold overlapping items
//! always          the mid child holds straddlers reachable from either side
//! ```
//!
//! At a leaf, every id in the run is resolved through the bounds source and
//! tested for full `dims`-axis overlap; pruning only ever skips subtrees, it
//! never admits an item without the final test.
//!
//! ## Iterator Shape
//!
//! [`QueryIter`] holds an explicit stack of signed child references plus a
//! cursor over the current leaf run. All state lives in the iterator value:
//! dropping it mid-iteration abandons the query with no cleanup, and two
//! iterators over the same tree never observe each other. Yields follow
//! low, high, mid depth-first order, stable for a given tree but not a
//! documented contract.
//!
//! ## Duplicate Suppression
//!
//! A per-query seen-set guarantees each id is yielded at most once, however
//! many leaves happen to contain it.

use eyre::Result;
use hashbrown::HashSet;
use smallvec::{smallvec, SmallVec};

use crate::bounds::{boxes_overlap, BoxSource, Extent};
use crate::config::INLINE_DIMS;

use super::arena::{leaf_index, ArenaStore};

/// Lazy stream of item ids intersecting one query box.
pub struct QueryIter<'a, S: BoxSource> {
    store: &'a ArenaStore,
    source: &'a S,
    q_min: SmallVec<[f64; INLINE_DIMS]>,
    q_max: SmallVec<[f64; INLINE_DIMS]>,
    stack: Vec<i32>,
    cursor: i32,
    cursor_end: i32,
    seen: HashSet<i32>,
    min_scratch: SmallVec<[f64; INLINE_DIMS]>,
    max_scratch: SmallVec<[f64; INLINE_DIMS]>,
}

impl<'a, S: BoxSource> std::fmt::Debug for QueryIter<'a, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryIter").finish_non_exhaustive()
    }
}

impl<'a, S: BoxSource> QueryIter<'a, S> {
    /// Starts a query at `root`. Corner slices must already be validated
    /// against the tree's dimensionality.
    pub(crate) fn new(
        store: &'a ArenaStore,
        source: &'a S,
        root: i32,
        q_min: &[f64],
        q_max: &[f64],
    ) -> Self {
        let dims = q_min.len();
        debug_assert_eq!(dims, q_max.len());

        Self {
            store,
            source,
            q_min: SmallVec::from_slice(q_min),
            q_max: SmallVec::from_slice(q_max),
            stack: vec![root],
            cursor: 0,
            cursor_end: -1,
            seen: HashSet::new(),
            min_scratch: smallvec![0.0; dims],
            max_scratch: smallvec![0.0; dims],
        }
    }

    /// Resolves one id and tests it against the query box.
    fn hits(&mut self, item: i32) -> Result<bool> {
        let extent = self
            .source
            .bounds(item, &mut self.min_scratch, &mut self.max_scratch)?;

        let item_max: &[f64] = match extent {
            Extent::Point => &self.min_scratch,
            Extent::Region => &self.max_scratch,
        };

        Ok(boxes_overlap(
            &self.min_scratch,
            item_max,
            &self.q_min,
            &self.q_max,
        ))
    }
}

impl<S: BoxSource> Iterator for QueryIter<'_, S> {
    type Item = Result<i32>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            while self.cursor <= self.cursor_end {
                let position = self.cursor;
                self.cursor += 1;

                let item = self.store.item(position);
                match self.hits(item) {
                    Ok(true) => {
                        if self.seen.insert(item) {
                            return Some(Ok(item));
                        }
                    }
                    Ok(false) => {}
                    Err(err) => return Some(Err(err)),
                }
            }

            let child_ref = self.stack.pop()?;
            if child_ref >= 0 {
                let node = self.store.node(child_ref);
                let axis = node.axis as usize;

                // Push order is the reverse of visit order: low pops first.
                self.stack.push(node.mid);
                if self.q_max[axis] >= node.split {
                    self.stack.push(node.high);
                }
                if self.q_min[axis] <= node.split {
                    self.stack.push(node.low);
                }
            } else {
                let leaf = self.store.leaf_at(leaf_index(child_ref));
                self.cursor = leaf.first_item;
                self.cursor_end = leaf.last_item;
            }
        }
    }
}

/// Push-style traversal: drives the same descent through a callback.
pub fn visit<S, F>(
    store: &ArenaStore,
    source: &S,
    root: i32,
    q_min: &[f64],
    q_max: &[f64],
    mut action: F,
) -> Result<()>
where
    S: BoxSource,
    F: FnMut(i32),
{
    for id in QueryIter::new(store, source, root, q_min, q_max) {
        action(id?);
    }
    Ok(())
}

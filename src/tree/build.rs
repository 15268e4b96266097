//! # Sweep Splitter
//!
//! The construction core. Each call receives the sorted per-axis event
//! streams for one item set and either emits a leaf or picks a split plane,
//! partitions the streams three ways, and recurses.
//!
//! ## Candidate Sweep
//!
//! For one axis, walk the sorted events left to right keeping three running
//! counters:
//!
//! ```text
//! low   items whose extent ends at or before the sweep position
//! mid   items whose extent straddles the sweep position
//! high  items whose extent begins after the sweep position
//! ```
//!
//! Starting from `(0, 0, n)`, an open event moves one item `high -> mid`, a
//! close event moves one `mid -> low`, and a point event does both, moving
//! one `high -> low`. Events sharing a coordinate form a tie group that is
//! applied atomically; the counters are only read between groups, so no
//! candidate plane can ever land in the middle of a tie.
//!
//! After each group the candidate `(axis, coord)` is scored:
//!
//! ```text
//! cost = ((low+mid)*ln(low+mid) + (mid+high)*ln(mid+high)) / ((low+mid) + (mid+high))
//! ```
//!
//! with `0*ln(0) = 0`. Straddlers are charged to both halves deliberately:
//! the mid child is descended by every query that reaches this node, so its
//! items contribute to the expected work on both sides of the plane.
//!
//! ## Partition
//!
//! The winning plane classifies every item by its extent on the winning
//! axis — `max <= split` goes low, `min > split` goes high, the rest
//! straddle — and each axis stream is filtered into three child streams by
//! table lookup. Filtering preserves relative order, so the children's
//! streams stay sorted and no re-sort happens below the root.
//!
//! ## Emission
//!
//! Children are built low, high, mid, then the parent node is appended, so
//! the arena is in post-order and the root is always the last node written.
//! The persistence layer depends on that order.

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use eyre::{ensure, Result};
use hashbrown::HashMap;

use super::arena::Arena;
use super::event::{Event, EventKind, EventStreams};

/// The winning candidate of one sweep: plane plus predicted child sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SplitChoice {
    axis: usize,
    coord: f64,
    cost: f64,
    low: usize,
    mid: usize,
    high: usize,
}

/// Which child an item falls into relative to a chosen plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Low,
    Mid,
    High,
}

/// Recursive tree construction over bump-allocated event streams.
///
/// Borrows the arena it emits into and the bump every event list lives in;
/// dropping the bump after `build` returns releases all transient storage.
pub struct TreeBuilder<'a, 'b> {
    arena: &'a mut Arena,
    bump: &'b Bump,
    leaf_size: usize,
}

impl<'a, 'b> TreeBuilder<'a, 'b> {
    pub fn new(arena: &'a mut Arena, bump: &'b Bump, leaf_size: usize) -> Self {
        debug_assert!(leaf_size >= 1);
        Self {
            arena,
            bump,
            leaf_size,
        }
    }

    /// Builds the whole tree, returning the signed root reference.
    pub fn build(&mut self, streams: EventStreams<'b>) -> Result<i32> {
        self.split(&streams.axes, streams.item_count)
    }

    fn split(&mut self, axes: &[BumpVec<'b, Event>], n: usize) -> Result<i32> {
        if n < self.leaf_size {
            return self.emit_leaf(&axes[0]);
        }

        let Some(choice) = best_split(axes, n) else {
            return self.emit_leaf(&axes[0]);
        };

        // All items on one side of the best plane: splitting cannot shrink
        // the problem, so stop here. The mid case matters as much as the
        // outer two; a child handed the full straddler set would see the
        // identical streams again.
        if choice.low == n || choice.mid == n || choice.high == n {
            return self.emit_leaf(&axes[0]);
        }

        let sides = classify(&axes[choice.axis], choice.coord);
        let counted = side_counts(&sides);
        ensure!(
            counted == (choice.low, choice.mid, choice.high),
            "split accounting diverged on axis {} at {}: sweep predicted {:?}, partition found {:?}",
            choice.axis,
            choice.coord,
            (choice.low, choice.mid, choice.high),
            counted
        );

        let (low_axes, mid_axes, high_axes) = self.partition(axes, &sides);

        let low = self.split(&low_axes, choice.low)?;
        let high = self.split(&high_axes, choice.high)?;
        let mid = self.split(&mid_axes, choice.mid)?;

        self.arena
            .push_node(choice.axis as u32, choice.coord, low, mid, high)
    }

    /// Emits a leaf for the item set behind one axis stream.
    ///
    /// Exactly one event per item begins an extent (the open, or the point),
    /// so those events enumerate the leaf's ids without duplicates.
    fn emit_leaf(&mut self, events: &[Event]) -> Result<i32> {
        let mut ids = BumpVec::new_in(self.bump);
        ids.extend(
            events
                .iter()
                .filter(|ev| ev.kind.begins_extent())
                .map(|ev| ev.item),
        );
        self.arena.push_leaf(&ids)
    }

    /// Filters every axis stream into low/mid/high child streams.
    fn partition(
        &self,
        axes: &[BumpVec<'b, Event>],
        sides: &HashMap<i32, Side>,
    ) -> (
        Vec<BumpVec<'b, Event>>,
        Vec<BumpVec<'b, Event>>,
        Vec<BumpVec<'b, Event>>,
    ) {
        let mut low_axes = Vec::with_capacity(axes.len());
        let mut mid_axes = Vec::with_capacity(axes.len());
        let mut high_axes = Vec::with_capacity(axes.len());

        for events in axes {
            let mut low = BumpVec::new_in(self.bump);
            let mut mid = BumpVec::new_in(self.bump);
            let mut high = BumpVec::new_in(self.bump);

            for ev in events.iter() {
                match sides[&ev.item] {
                    Side::Low => low.push(*ev),
                    Side::Mid => mid.push(*ev),
                    Side::High => high.push(*ev),
                }
            }

            low_axes.push(low);
            mid_axes.push(mid);
            high_axes.push(high);
        }

        (low_axes, mid_axes, high_axes)
    }
}

/// `x * ln(x)` over a count, with the `0 * ln(0) = 0` convention.
#[inline]
fn weighted_log(count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let x = count as f64;
    x * x.ln()
}

fn split_cost(below: usize, above: usize) -> f64 {
    (weighted_log(below) + weighted_log(above)) / (below + above) as f64
}

/// Sweeps every axis and returns the cheapest candidate plane.
///
/// Returns `None` only for an empty event set, which the callers have
/// already filtered out through the leaf-size check.
fn best_split(axes: &[BumpVec<'_, Event>], n: usize) -> Option<SplitChoice> {
    let mut best: Option<SplitChoice> = None;

    for (axis, events) in axes.iter().enumerate() {
        let mut low = 0usize;
        let mut mid = 0usize;
        let mut high = n;

        let mut i = 0;
        while i < events.len() {
            let coord = events[i].coord;

            // Apply the whole tie group before reading the counters.
            let mut j = i;
            while j < events.len() && events[j].coord == coord {
                let kind = events[j].kind;
                if kind.begins_extent() {
                    mid += 1;
                    high -= 1;
                }
                if kind.ends_extent() {
                    mid -= 1;
                    low += 1;
                }
                j += 1;
            }
            i = j;

            let cost = split_cost(low + mid, mid + high);
            if best.as_ref().map_or(true, |b| cost < b.cost) {
                best = Some(SplitChoice {
                    axis,
                    coord,
                    cost,
                    low,
                    mid,
                    high,
                });
            }
        }
    }

    best
}

/// Derives each item's side from the winning axis's own event stream.
///
/// An open at or below the plane provisionally marks the item as straddling;
/// its close refines that to `Low` when the extent ends at or below the
/// plane. Items opening above the plane are `High` outright, and a point is
/// decided by its single coordinate.
fn classify(events: &[Event], split: f64) -> HashMap<i32, Side> {
    let mut sides = HashMap::with_capacity(events.len());

    for ev in events {
        match ev.kind {
            EventKind::Point => {
                let side = if ev.coord <= split { Side::Low } else { Side::High };
                sides.insert(ev.item, side);
            }
            EventKind::Open => {
                let side = if ev.coord > split { Side::High } else { Side::Mid };
                sides.insert(ev.item, side);
            }
            EventKind::Close => {
                if ev.coord <= split {
                    sides.insert(ev.item, Side::Low);
                }
            }
        }
    }

    sides
}

fn side_counts(sides: &HashMap<i32, Side>) -> (usize, usize, usize) {
    let mut counts = (0usize, 0usize, 0usize);
    for side in sides.values() {
        match side {
            Side::Low => counts.0 += 1,
            Side::Mid => counts.1 += 1,
            Side::High => counts.2 += 1,
        }
    }
    counts
}

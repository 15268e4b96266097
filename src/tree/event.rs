//! # Build Events
//!
//! Construction never looks at boxes directly. Each item is lowered into
//! per-axis *events* once, up front, and the splitter works exclusively on
//! sorted event streams from then on:
//!
//! ```text
//! item 7, axis a, min 1.0, max 3.0   ->   (1.0, Open, 7), (3.0, Close, 7)
//! item 9, axis a, min 2.0, max 2.0   ->   (2.0, Point, 9)
//! ```
//!
//! A point contributes one event per axis instead of two, so an all-points
//! build carries half the event volume of an all-regions build.
//!
//! ## Allocation
//!
//! Event lists are bump-allocated. Construction produces one initial list
//! per axis here, and the splitter produces three filtered child lists per
//! split; all of them die together when the build's [`bumpalo::Bump`] is
//! dropped, which is how the transient event storage is released after the
//! root is emitted.
//!
//! ## Ordering
//!
//! Lists are sorted ascending by coordinate with `f64::total_cmp`. Equal
//! coordinates form a *tie group* that the sweep advances over atomically;
//! relative order inside a group is irrelevant and not preserved.

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use eyre::{ensure, Result};
use smallvec::{smallvec, SmallVec};

use crate::bounds::{BoxSource, Extent};
use crate::config::INLINE_DIMS;

/// Event kind, ordered so that `kind >= Point` means "begins an extent"
/// and `kind <= Point` means "ends one". A point does both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i8)]
pub enum EventKind {
    Close = -1,
    Point = 0,
    Open = 1,
}

impl EventKind {
    /// Open or point: the sweep transfers the item from `high` into `mid`.
    #[inline]
    pub fn begins_extent(self) -> bool {
        self >= EventKind::Point
    }

    /// Close or point: the sweep transfers the item from `mid` into `low`.
    #[inline]
    pub fn ends_extent(self) -> bool {
        self <= EventKind::Point
    }
}

/// One boundary of one item's extent on one axis. Build-time only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub coord: f64,
    pub kind: EventKind,
    pub item: i32,
}

/// The sorted per-axis event streams for one item set.
pub struct EventStreams<'b> {
    pub axes: Vec<BumpVec<'b, Event>>,
    pub item_count: usize,
}

/// Lowers every item into sorted per-axis event streams.
///
/// Resolves each id through `source` exactly once, into reusable scratch
/// vectors. Rejects boxes that violate `min[a] <= max[a]`.
pub fn generate<'b, S, I>(
    bump: &'b Bump,
    source: &S,
    dims: usize,
    ids: I,
) -> Result<EventStreams<'b>>
where
    S: BoxSource,
    I: IntoIterator<Item = i32>,
{
    debug_assert!(dims >= 1);

    let mut min: SmallVec<[f64; INLINE_DIMS]> = smallvec![0.0; dims];
    let mut max: SmallVec<[f64; INLINE_DIMS]> = smallvec![0.0; dims];

    let mut axes: Vec<BumpVec<'b, Event>> = (0..dims).map(|_| BumpVec::new_in(bump)).collect();
    let mut item_count = 0usize;

    for item in ids {
        let extent = source.bounds(item, &mut min, &mut max)?;
        item_count += 1;

        for (axis, events) in axes.iter_mut().enumerate() {
            let lo = min[axis];
            let hi = match extent {
                Extent::Point => lo,
                Extent::Region => max[axis],
            };

            ensure!(
                lo <= hi,
                "item {} has inverted bounds on axis {}: min {} > max {}",
                item,
                axis,
                lo,
                hi
            );

            if lo == hi {
                events.push(Event {
                    coord: lo,
                    kind: EventKind::Point,
                    item,
                });
            } else {
                events.push(Event {
                    coord: lo,
                    kind: EventKind::Open,
                    item,
                });
                events.push(Event {
                    coord: hi,
                    kind: EventKind::Close,
                    item,
                });
            }
        }
    }

    for events in &mut axes {
        events.sort_unstable_by(|a, b| a.coord.total_cmp(&b.coord));
    }

    Ok(EventStreams { axes, item_count })
}

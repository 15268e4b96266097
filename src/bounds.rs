//! # Bounds Callback Seam
//!
//! The tree never stores geometry. It stores 32-bit item ids and asks a
//! caller-supplied [`BoxSource`] to translate an id back into its
//! axis-aligned bounding box whenever one is needed: once per item during
//! construction, and once per candidate item during a query.
//!
//! ## Scratch Discipline
//!
//! `bounds` receives two mutable slices of exactly `dims` elements owned by
//! the caller. The callback fills them in place and reports through
//! [`Extent`] whether the item is a point (only `min` filled, `max := min`)
//! or a full region (both filled). No allocation happens per call, and the
//! callback must not retain the slices past its return.
//!
//! ## Purity
//!
//! The callback must be pure: same id, same box, no external mutation during
//! a query. The query engine may resolve the same id any number of times and
//! in any order.
//!
//! ## Errors
//!
//! A callback failure propagates unchanged to whoever called `build` or
//! drove the query iterator. Dimension mismatches on query corners surface
//! as a typed [`DimensionError`].

use eyre::{bail, Result};

/// Whether a bounds callback produced a degenerate (point) box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// Only `min` was filled; `max` is taken to equal `min` on every axis.
    Point,
    /// Both `min` and `max` were filled, with `min[a] <= max[a]` per axis.
    Region,
}

/// Translates an item id into its bounding box via caller-owned scratch.
pub trait BoxSource {
    /// Fill `min` (and, for region items, `max`) with the bounds of `id`.
    ///
    /// Both slices are exactly `dims` long. Returning [`Extent::Point`]
    /// leaves `max` unread and the item is treated as `max == min`.
    fn bounds(&self, id: i32, min: &mut [f64], max: &mut [f64]) -> Result<Extent>;
}

/// Lifts a closure into a [`BoxSource`].
///
/// ```ignore
/// let source = FnSource::new(|id, min, max| {
///     min.copy_from_slice(&centers[id as usize]);
///     Ok(Extent::Point)
/// });
/// ```
#[derive(Clone)]
pub struct FnSource<F>(F);

impl<F> std::fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSource").finish_non_exhaustive()
    }
}

impl<F> FnSource<F>
where
    F: Fn(i32, &mut [f64], &mut [f64]) -> Result<Extent>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> BoxSource for FnSource<F>
where
    F: Fn(i32, &mut [f64], &mut [f64]) -> Result<Extent>,
{
    fn bounds(&self, id: i32, min: &mut [f64], max: &mut [f64]) -> Result<Extent> {
        (self.0)(id, min, max)
    }
}

/// A coordinate vector of the wrong length was passed across the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionError {
    pub expected: usize,
    pub got: usize,
}

impl std::fmt::Display for DimensionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "dimension mismatch: expected {} coordinates, got {}",
            self.expected, self.got
        )
    }
}

impl std::error::Error for DimensionError {}

/// Validates a coordinate slice against the tree's dimensionality.
pub fn check_dims(expected: usize, coords: &[f64]) -> Result<()> {
    if coords.len() != expected {
        bail!(DimensionError {
            expected,
            got: coords.len(),
        });
    }
    Ok(())
}

/// AABB overlap on every axis: `a.min <= b.max && a.max >= b.min`.
///
/// Closed boxes, so shared faces and shared corners count as overlap.
#[inline]
pub fn boxes_overlap(a_min: &[f64], a_max: &[f64], b_min: &[f64], b_max: &[f64]) -> bool {
    debug_assert_eq!(a_min.len(), b_min.len());

    a_min
        .iter()
        .zip(a_max)
        .zip(b_min.iter().zip(b_max))
        .all(|((amin, amax), (bmin, bmax))| amin <= bmax && amax >= bmin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_boxes_overlap() {
        assert!(boxes_overlap(
            &[0.0, 0.0],
            &[2.0, 2.0],
            &[1.0, 1.0],
            &[3.0, 3.0]
        ));
    }

    #[test]
    fn disjoint_on_one_axis_is_enough() {
        assert!(!boxes_overlap(
            &[0.0, 0.0],
            &[1.0, 1.0],
            &[0.5, 2.0],
            &[0.6, 3.0]
        ));
    }

    #[test]
    fn touching_faces_overlap() {
        assert!(boxes_overlap(
            &[0.0, 0.0],
            &[1.0, 1.0],
            &[1.0, 0.0],
            &[2.0, 1.0]
        ));
    }

    #[test]
    fn point_against_containing_box() {
        assert!(boxes_overlap(
            &[0.5, 0.5],
            &[0.5, 0.5],
            &[0.0, 0.0],
            &[1.0, 1.0]
        ));
    }

    #[test]
    fn check_dims_rejects_wrong_length() {
        let err = check_dims(3, &[1.0, 2.0]).unwrap_err();
        let typed = err.downcast_ref::<DimensionError>().unwrap();
        assert_eq!(typed.expected, 3);
        assert_eq!(typed.got, 2);
    }

    #[test]
    fn fn_source_forwards_to_closure() {
        let source = FnSource::new(|id, min: &mut [f64], _max: &mut [f64]| {
            min[0] = id as f64;
            Ok(Extent::Point)
        });

        let mut min = [0.0];
        let mut max = [0.0];
        let extent = source.bounds(7, &mut min, &mut max).unwrap();

        assert_eq!(extent, Extent::Point);
        assert_eq!(min[0], 7.0);
    }
}

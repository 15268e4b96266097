//! # Object Mode
//!
//! [`ObjectIndex`] owns an ordered list of opaque objects and indexes them
//! by 1-based position. The stored ids never leak: queries resolve straight
//! back to `&T`.
//!
//! The bounds closure receives the object, not an id, so callers write
//! geometry extraction once and never touch the id scheme:
//!
//! ```ignore
//! let index = ObjectIndex::build(shapes, 2, |shape, min, max| {
//!     min.copy_from_slice(&shape.lo);
//!     max.copy_from_slice(&shape.hi);
//!     Ok(Extent::Region)
//! })?;
//!
//! for shape in index.query(&[0.0, 0.0], &[1.0, 1.0])? {
//!     println!("{:?}", shape?);
//! }
//! ```

use std::path::Path;

use eyre::{ensure, Result};

use crate::bounds::{BoxSource, Extent};
use crate::config::DEFAULT_LEAF_SIZE;
use crate::tree::QueryIter;

use super::{builder, BoxIndex};

/// Adapts an ordered object list plus a bounds closure into a [`BoxSource`]
/// keyed by 1-based position.
#[derive(Debug)]
pub struct ObjectSource<T, F> {
    objects: Vec<T>,
    bounds: F,
}

impl<T, F> ObjectSource<T, F>
where
    F: Fn(&T, &mut [f64], &mut [f64]) -> Result<Extent>,
{
    pub fn new(objects: Vec<T>, bounds: F) -> Self {
        Self { objects, bounds }
    }

    pub fn objects(&self) -> &[T] {
        &self.objects
    }
}

impl<T, F> BoxSource for ObjectSource<T, F>
where
    F: Fn(&T, &mut [f64], &mut [f64]) -> Result<Extent>,
{
    fn bounds(&self, id: i32, min: &mut [f64], max: &mut [f64]) -> Result<Extent> {
        let position = id as i64 - 1;
        ensure!(
            position >= 0 && (position as usize) < self.objects.len(),
            "object id {} out of range 1..={}",
            id,
            self.objects.len()
        );
        (self.bounds)(&self.objects[position as usize], min, max)
    }
}

/// A frozen spatial index that owns its objects.
#[derive(Debug)]
pub struct ObjectIndex<T, F>
where
    F: Fn(&T, &mut [f64], &mut [f64]) -> Result<Extent>,
{
    inner: BoxIndex<ObjectSource<T, F>>,
}

impl<T, F> ObjectIndex<T, F>
where
    F: Fn(&T, &mut [f64], &mut [f64]) -> Result<Extent>,
{
    /// Builds over the objects in order, with the default leaf size.
    pub fn build(objects: Vec<T>, dims: usize, bounds: F) -> Result<Self> {
        Self::build_with_leaf_size(objects, dims, DEFAULT_LEAF_SIZE, bounds)
    }

    pub fn build_with_leaf_size(
        objects: Vec<T>,
        dims: usize,
        leaf_size: usize,
        bounds: F,
    ) -> Result<Self> {
        let count = objects.len() as i32;
        let source = ObjectSource::new(objects, bounds);
        let inner = builder()
            .dims(dims)
            .leaf_size(leaf_size)
            .build(source, 1..=count)?;
        Ok(Self { inner })
    }

    /// Reloads a text serialization over the same object list that built it.
    pub fn load_text<P: AsRef<Path>>(
        path: P,
        objects: Vec<T>,
        dims: usize,
        bounds: F,
    ) -> Result<Self> {
        let source = ObjectSource::new(objects, bounds);
        let inner = builder().dims(dims).load_text(path, source)?;
        Ok(Self { inner })
    }

    /// Memory-maps a binary directory over the same object list that built it.
    pub fn load_binary<P: AsRef<Path>>(
        dir: P,
        objects: Vec<T>,
        dims: usize,
        bounds: F,
    ) -> Result<Self> {
        let source = ObjectSource::new(objects, bounds);
        let inner = builder().dims(dims).load_binary(dir, source)?;
        Ok(Self { inner })
    }

    /// Streams the objects whose boxes overlap the query box.
    pub fn query(&self, q_min: &[f64], q_max: &[f64]) -> Result<ObjectHits<'_, T, F>> {
        Ok(ObjectHits {
            iter: self.inner.query(q_min, q_max)?,
            objects: self.inner.source().objects(),
        })
    }

    /// Point query: `max == min`.
    pub fn query_point(&self, point: &[f64]) -> Result<ObjectHits<'_, T, F>> {
        self.query(point, point)
    }

    /// Resolves a stored id back to its object.
    pub fn get(&self, id: i32) -> Option<&T> {
        let position = id as i64 - 1;
        if position < 0 {
            return None;
        }
        self.inner.source().objects().get(position as usize)
    }

    pub fn len(&self) -> usize {
        self.inner.source().objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_text<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.inner.write_text(path)
    }

    pub fn write_binary<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        self.inner.write_binary(dir)
    }
}

/// Lazy stream of `&T` hits for one object-mode query.
pub struct ObjectHits<'a, T, F>
where
    F: Fn(&T, &mut [f64], &mut [f64]) -> Result<Extent>,
{
    iter: QueryIter<'a, ObjectSource<T, F>>,
    objects: &'a [T],
}

impl<'a, T, F> Iterator for ObjectHits<'a, T, F>
where
    F: Fn(&T, &mut [f64], &mut [f64]) -> Result<Extent>,
{
    type Item = Result<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.iter.next()?;
        // Ids came out of the source, so the position is always in range.
        Some(id.map(|id| &self.objects[(id - 1) as usize]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Shape {
        name: &'static str,
        lo: [f64; 2],
        hi: [f64; 2],
    }

    fn shapes() -> Vec<Shape> {
        vec![
            Shape {
                name: "unit",
                lo: [0.0, 0.0],
                hi: [1.0, 1.0],
            },
            Shape {
                name: "far",
                lo: [2.0, 2.0],
                hi: [3.0, 3.0],
            },
            Shape {
                name: "wide",
                lo: [0.5, 0.5],
                hi: [2.5, 2.5],
            },
        ]
    }

    fn shape_bounds(shape: &Shape, min: &mut [f64], max: &mut [f64]) -> Result<Extent> {
        min.copy_from_slice(&shape.lo);
        max.copy_from_slice(&shape.hi);
        Ok(Extent::Region)
    }

    #[test]
    fn object_query_resolves_references() {
        let index = ObjectIndex::build(shapes(), 2, shape_bounds).unwrap();

        let mut names: Vec<&str> = index
            .query(&[0.6, 0.6], &[0.9, 0.9])
            .unwrap()
            .map(|shape| shape.map(|s| s.name))
            .collect::<Result<_>>()
            .unwrap();
        names.sort_unstable();

        assert_eq!(names, vec!["unit", "wide"]);
    }

    #[test]
    fn get_uses_one_based_ids() {
        let index = ObjectIndex::build(shapes(), 2, shape_bounds).unwrap();

        assert_eq!(index.get(1).map(|s| s.name), Some("unit"));
        assert_eq!(index.get(3).map(|s| s.name), Some("wide"));
        assert_eq!(index.get(0), None);
        assert_eq!(index.get(4), None);
    }

    #[test]
    fn out_of_range_id_is_rejected_by_the_source() {
        let source = ObjectSource::new(shapes(), shape_bounds);
        let mut min = [0.0; 2];
        let mut max = [0.0; 2];

        assert!(source.bounds(0, &mut min, &mut max).is_err());
        assert!(source.bounds(4, &mut min, &mut max).is_err());
        assert!(source.bounds(2, &mut min, &mut max).is_ok());
    }

    #[test]
    fn empty_object_list_builds() {
        let index = ObjectIndex::build(Vec::<Shape>::new(), 2, shape_bounds).unwrap();
        assert!(index.is_empty());

        let hits: Vec<&Shape> = index
            .query(&[0.0, 0.0], &[10.0, 10.0])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert!(hits.is_empty());
    }
}

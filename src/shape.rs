//! Extents, coordinates and rectangular coordinate enumeration
//!
//! Every tensor in this crate has exactly three axes. A [`Shape`] gives the
//! extent along each of them, an [`Index`] addresses a cell (or an offset
//! between cells) and an [`IndexIter`] walks a closed rectangular region.

use std::fmt;
use std::ops::Add;

/// One of the three tensor axes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

/// Extent along each of the three axes
///
/// The buffer layout is x fastest, then y, then z:
/// `index(x, y, z) = x + y*X + z*X*Y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: [usize; 3],
}

impl Shape {
    #[must_use]
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { dims: [x, y, z] }
    }

    /// Row vector of `size` elements
    #[must_use]
    pub const fn row(size: usize) -> Self {
        Self::new(size, 1, 1)
    }

    /// Matrix with `height` rows and `width` columns (stored as `(width, height, 1)`)
    #[must_use]
    pub const fn matrix(height: usize, width: usize) -> Self {
        Self::new(width, height, 1)
    }

    #[must_use]
    pub const fn x(&self) -> usize {
        self.dims[0]
    }

    #[must_use]
    pub const fn y(&self) -> usize {
        self.dims[1]
    }

    #[must_use]
    pub const fn z(&self) -> usize {
        self.dims[2]
    }

    #[must_use]
    pub const fn extent(&self, axis: Axis) -> usize {
        self.dims[axis as usize]
    }

    #[must_use]
    pub const fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Number of axes with extent greater than one
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dims.iter().filter(|&&d| d > 1).count()
    }

    /// Total number of cells
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Linear buffer offset of `(x, y, z)`
    #[must_use]
    pub const fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.dims[0] + z * self.dims[0] * self.dims[1]
    }

    /// Whether `index` addresses a cell of this shape
    #[must_use]
    pub fn contains(&self, index: &Index) -> bool {
        index
            .components()
            .iter()
            .zip(self.dims.iter())
            .all(|(&c, &d)| c >= 0 && (c as usize) < d)
    }

    /// Linear offset of `index`, or `None` when it falls outside the shape
    #[must_use]
    pub fn offset_of(&self, index: &Index) -> Option<usize> {
        if self.contains(index) {
            Some(self.index(index.x() as usize, index.y() as usize, index.z() as usize))
        } else {
            None
        }
    }

    /// Inclusive corner of the last cell
    #[must_use]
    pub fn last(&self) -> Index {
        Index::new(
            self.dims[0] as isize - 1,
            self.dims[1] as isize - 1,
            self.dims[2] as isize - 1,
        )
    }

    /// Enumerates every coordinate of this shape
    #[must_use]
    pub fn iter(&self) -> IndexIter {
        IndexIter::new(Index::ORIGIN, self.last())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.dims[0], self.dims[1], self.dims[2])
    }
}

/// Signed coordinate or offset
///
/// Coordinates relative to a view may be negative or exceed the owning
/// tensor, which is how padding is expressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Index {
    v: [isize; 3],
}

impl Index {
    pub const ORIGIN: Index = Index::new(0, 0, 0);

    #[must_use]
    pub const fn new(x: isize, y: isize, z: isize) -> Self {
        Self { v: [x, y, z] }
    }

    #[must_use]
    pub const fn x(&self) -> isize {
        self.v[0]
    }

    #[must_use]
    pub const fn y(&self) -> isize {
        self.v[1]
    }

    #[must_use]
    pub const fn z(&self) -> isize {
        self.v[2]
    }

    #[must_use]
    pub const fn get(&self, axis: Axis) -> isize {
        self.v[axis as usize]
    }

    #[must_use]
    pub const fn components(&self) -> [isize; 3] {
        self.v
    }

    #[must_use]
    pub const fn offset(&self, x: isize, y: isize, z: isize) -> Self {
        Self::new(self.v[0] + x, self.v[1] + y, self.v[2] + z)
    }

    /// Copy with `axis` replaced by `value`
    #[must_use]
    pub const fn set(&self, axis: Axis, value: isize) -> Self {
        let mut v = self.v;
        v[axis as usize] = value;
        Self { v }
    }

    /// Copy with `axis` moved by `delta`
    #[must_use]
    pub const fn inc(&self, axis: Axis, delta: isize) -> Self {
        let mut v = self.v;
        v[axis as usize] += delta;
        Self { v }
    }
}

impl Add for Index {
    type Output = Index;

    fn add(self, rhs: Index) -> Index {
        self.offset(rhs.v[0], rhs.v[1], rhs.v[2])
    }
}

impl From<[isize; 3]> for Index {
    fn from(v: [isize; 3]) -> Self {
        Self { v }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.v[0], self.v[1], self.v[2])
    }
}

/// Number of positions visited along one axis from `start` to `end` with `step`
const fn steps(start: isize, end: isize, step: isize) -> usize {
    if end < start || step <= 0 {
        0
    } else {
        ((end - start) / step + 1) as usize
    }
}

/// Enumerates all coordinates of the closed range `[start, end]`
///
/// The last axis (z) moves fastest. The iterator yields exactly the product
/// of the per-axis step counts and is not resettable; build a new one to
/// restart.
#[derive(Clone, Debug)]
pub struct IndexIter {
    start: Index,
    end: Index,
    step: Index,
    current: Index,
    moves: usize,
    moves_max: usize,
}

impl IndexIter {
    #[must_use]
    pub fn new(start: Index, end: Index) -> Self {
        Self::with_step(start, end, Index::new(1, 1, 1))
    }

    /// A zero or negative step on any axis yields an empty iterator.
    #[must_use]
    pub fn with_step(start: Index, end: Index, step: Index) -> Self {
        let moves_max = steps(start.x(), end.x(), step.x())
            * steps(start.y(), end.y(), step.y())
            * steps(start.z(), end.z(), step.z());
        Self {
            start,
            end,
            step,
            current: start,
            moves: 0,
            moves_max,
        }
    }

    fn move_next(&mut self) {
        for axis in (0..3).rev() {
            self.current.v[axis] += self.step.v[axis];
            if self.current.v[axis] <= self.end.v[axis] {
                break;
            }
            self.current.v[axis] = self.start.v[axis];
        }
    }
}

impl Iterator for IndexIter {
    type Item = Index;

    fn next(&mut self) -> Option<Index> {
        if self.moves >= self.moves_max {
            return None;
        }
        let item = self.current;
        self.moves += 1;
        self.move_next();
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.moves_max - self.moves;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndexIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_shape_dim_counts_non_unit_axes() {
        assert_eq!(Shape::new(1, 1, 1).dim(), 0);
        assert_eq!(Shape::row(10).dim(), 1);
        assert_eq!(Shape::matrix(3, 4).dim(), 2);
        assert_eq!(Shape::new(5, 5, 5).dim(), 3);
    }

    #[test]
    fn test_shape_matrix_is_width_first() {
        let m = Shape::matrix(3, 4);
        assert_eq!((m.x(), m.y(), m.z()), (4, 3, 1));
        assert_eq!(m.capacity(), 12);
    }

    #[test]
    fn test_shape_index_layout() {
        let s = Shape::new(4, 3, 2);
        assert_eq!(s.index(0, 0, 0), 0);
        assert_eq!(s.index(1, 0, 0), 1);
        assert_eq!(s.index(0, 1, 0), 4);
        assert_eq!(s.index(0, 0, 1), 12);
        assert_eq!(s.index(3, 2, 1), 23);
    }

    #[test]
    fn test_shape_contains_rejects_negative_and_overflow() {
        let s = Shape::new(2, 2, 2);
        assert!(s.contains(&Index::new(1, 1, 1)));
        assert!(!s.contains(&Index::new(-1, 0, 0)));
        assert!(!s.contains(&Index::new(0, 2, 0)));
        assert_eq!(s.offset_of(&Index::new(1, 1, 0)), Some(3));
        assert_eq!(s.offset_of(&Index::new(0, 0, 5)), None);
    }

    #[test]
    fn test_index_arithmetic() {
        let i = Index::new(1, 2, 3);
        assert_eq!(i + Index::new(-1, 1, 0), Index::new(0, 3, 3));
        assert_eq!(i.set(Axis::Y, 7), Index::new(1, 7, 3));
        assert_eq!(i.inc(Axis::Z, -3), Index::new(1, 2, 0));
        assert_eq!(i.get(Axis::X), 1);
    }

    #[test]
    fn test_iterator_last_axis_fastest() {
        let visited: Vec<Index> = IndexIter::new(Index::ORIGIN, Index::new(1, 1, 1)).collect();
        assert_eq!(visited.len(), 8);
        assert_eq!(visited[0], Index::new(0, 0, 0));
        assert_eq!(visited[1], Index::new(0, 0, 1));
        assert_eq!(visited[2], Index::new(0, 1, 0));
        assert_eq!(visited[4], Index::new(1, 0, 0));
        assert_eq!(visited[7], Index::new(1, 1, 1));
    }

    #[test]
    fn test_iterator_with_step_and_offset_start() {
        let it = IndexIter::with_step(Index::new(-1, 2, 0), Index::new(3, 2, 0), Index::new(2, 1, 1));
        assert_eq!(it.len(), 3);
        let xs: Vec<isize> = it.map(|i| i.x()).collect();
        assert_eq!(xs, vec![-1, 1, 3]);
    }

    #[test]
    fn test_iterator_visits_every_offset_once() {
        let s = Shape::new(3, 4, 2);
        let offsets: HashSet<usize> = s.iter().filter_map(|i| s.offset_of(&i)).collect();
        assert_eq!(offsets.len(), s.capacity());
        assert!(offsets.iter().all(|&o| o < s.capacity()));
    }

    #[test]
    fn test_iterator_empty_range() {
        assert_eq!(IndexIter::new(Index::new(2, 0, 0), Index::new(1, 0, 0)).count(), 0);
        assert_eq!(Shape::new(0, 3, 3).iter().count(), 0);
    }
}

use crate::error::{Result, TesseraError};
use crate::shape::{Axis, Index, IndexIter, Shape};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::fmt;

// ===== TENSOR STRUCTURE =====

/// Dense three-axis array of `f32` with owned storage
///
/// Fields:
/// - `shape`: extent along x, y and z
/// - `data`: flat buffer, x fastest (see [`Shape::index`])
///
/// The buffer length always equals `shape.capacity()`. Reshaping keeps the
/// buffer untouched and only swaps the shape.
#[derive(Clone, PartialEq, Default)]
pub struct Tensor {
    shape: Shape,
    data: Vec<f32>,
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("len", &self.data.len())
            .finish()
    }
}

// ===== TENSOR CONSTRUCTORS =====
impl Tensor {
    /// Create a tensor with every cell set to `value`
    #[must_use]
    pub fn filled(shape: Shape, value: f32) -> Self {
        Self {
            shape,
            data: vec![value; shape.capacity()],
        }
    }

    /// Create a tensor filled with zeros
    #[must_use]
    pub fn zeros(shape: Shape) -> Self {
        Self::filled(shape, 0.0)
    }

    /// Take ownership of `data` laid out for `shape`
    ///
    /// # Errors
    /// `DataLength` if `data.len() != shape.capacity()`
    pub fn from_vec(shape: Shape, data: Vec<f32>) -> Result<Self> {
        if data.len() != shape.capacity() {
            return Err(TesseraError::DataLength {
                shape,
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Row vector over `data`
    #[must_use]
    pub fn row(data: Vec<f32>) -> Self {
        Self {
            shape: Shape::row(data.len()),
            data,
        }
    }

    /// Sample every cell from N(mean, stddev) using the thread-local generator
    ///
    /// # Errors
    /// `Configuration` if `stddev` is negative or not finite
    pub fn randn(shape: Shape, mean: f32, stddev: f32) -> Result<Self> {
        Self::randn_with(shape, mean, stddev, &mut rand::rng())
    }

    /// Sample every cell from N(mean, stddev) using `rng`
    ///
    /// # Errors
    /// `Configuration` if `stddev` is negative or not finite
    pub fn randn_with<R: Rng + ?Sized>(
        shape: Shape,
        mean: f32,
        stddev: f32,
        rng: &mut R,
    ) -> Result<Self> {
        let normal = Normal::new(mean, stddev).map_err(|e| {
            TesseraError::Configuration(format!("normal({mean}, {stddev}): {e}"))
        })?;
        let data = (0..shape.capacity()).map(|_| normal.sample(rng)).collect();
        Ok(Self { shape, data })
    }
}

// ===== ACCESSORS =====
impl Tensor {
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn checked_offset(&self, x: usize, y: usize, z: usize) -> Result<usize> {
        if x < self.shape.x() && y < self.shape.y() && z < self.shape.z() {
            Ok(self.shape.index(x, y, z))
        } else {
            Err(TesseraError::OutOfRange {
                index: Index::new(x as isize, y as isize, z as isize),
                shape: self.shape,
            })
        }
    }

    /// Bounds-checked read
    ///
    /// # Errors
    /// `OutOfRange` if any coordinate is outside the shape
    pub fn at(&self, x: usize, y: usize, z: usize) -> Result<f32> {
        let offset = self.checked_offset(x, y, z)?;
        Ok(self.data[offset])
    }

    /// Bounds-checked write access
    ///
    /// # Errors
    /// `OutOfRange` if any coordinate is outside the shape
    pub fn at_mut(&mut self, x: usize, y: usize, z: usize) -> Result<&mut f32> {
        let offset = self.checked_offset(x, y, z)?;
        Ok(&mut self.data[offset])
    }

    /// Bounds-checked read by signed coordinate
    ///
    /// # Errors
    /// `OutOfRange` if the coordinate is outside the shape
    pub fn at_index(&self, index: &Index) -> Result<f32> {
        match self.shape.offset_of(index) {
            Some(offset) => Ok(self.data[offset]),
            None => Err(TesseraError::OutOfRange {
                index: *index,
                shape: self.shape,
            }),
        }
    }

    /// Bounds-checked write access by signed coordinate
    ///
    /// # Errors
    /// `OutOfRange` if the coordinate is outside the shape
    pub fn at_index_mut(&mut self, index: &Index) -> Result<&mut f32> {
        match self.shape.offset_of(index) {
            Some(offset) => Ok(&mut self.data[offset]),
            None => Err(TesseraError::OutOfRange {
                index: *index,
                shape: self.shape,
            }),
        }
    }

    /// Largest value, or `NEG_INFINITY` for an empty tensor
    #[must_use]
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    #[must_use]
    pub fn sum(&self) -> f32 {
        self.data.iter().fold(0.0, |acc, &v| acc + v)
    }
}

impl std::ops::Index<(usize, usize, usize)> for Tensor {
    type Output = f32;

    fn index(&self, (x, y, z): (usize, usize, usize)) -> &f32 {
        assert!(
            x < self.shape.x() && y < self.shape.y() && z < self.shape.z(),
            "index ({x}, {y}, {z}) out of range for shape {}",
            self.shape
        );
        &self.data[self.shape.index(x, y, z)]
    }
}

impl std::ops::IndexMut<(usize, usize, usize)> for Tensor {
    fn index_mut(&mut self, (x, y, z): (usize, usize, usize)) -> &mut f32 {
        assert!(
            x < self.shape.x() && y < self.shape.y() && z < self.shape.z(),
            "index ({x}, {y}, {z}) out of range for shape {}",
            self.shape
        );
        let offset = self.shape.index(x, y, z);
        &mut self.data[offset]
    }
}

// ===== IN-PLACE ELEMENTWISE OPS =====
impl Tensor {
    fn ensure_same_shape(&self, other: &Tensor) -> Result<()> {
        if self.shape == other.shape {
            Ok(())
        } else {
            Err(TesseraError::shape_mismatch(self.shape, other.shape))
        }
    }

    /// `self += other`
    ///
    /// # Errors
    /// `ShapeMismatch` unless both shapes are equal
    pub fn add(&mut self, other: &Tensor) -> Result<&mut Self> {
        self.ensure_same_shape(other)?;
        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
        Ok(self)
    }

    /// `self -= other`
    ///
    /// # Errors
    /// `ShapeMismatch` unless both shapes are equal
    pub fn subtract(&mut self, other: &Tensor) -> Result<&mut Self> {
        self.ensure_same_shape(other)?;
        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            *a -= b;
        }
        Ok(self)
    }

    /// Hadamard product in place
    ///
    /// # Errors
    /// `ShapeMismatch` unless both shapes are equal
    pub fn element_mul(&mut self, other: &Tensor) -> Result<&mut Self> {
        self.ensure_same_shape(other)?;
        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            *a *= b;
        }
        Ok(self)
    }

    /// Scale every cell by `a`
    pub fn mul(&mut self, a: f32) -> &mut Self {
        for v in &mut self.data {
            *v *= a;
        }
        self
    }

    pub fn apply<F: Fn(f32) -> f32>(&mut self, f: F) -> &mut Self {
        for v in &mut self.data {
            *v = f(*v);
        }
        self
    }

    /// Overwrite every cell with `value`
    pub fn reset(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Reinterpret the buffer under `shape`
    ///
    /// # Errors
    /// `ShapeMismatch` unless the capacities are equal
    pub fn reshape(&mut self, shape: Shape) -> Result<&mut Self> {
        if shape.capacity() != self.shape.capacity() {
            return Err(TesseraError::shape_mismatch(self.shape, shape));
        }
        self.shape = shape;
        Ok(self)
    }

    /// Consume into a row vector over the same buffer
    #[must_use]
    pub fn flatten(mut self) -> Self {
        self.shape = Shape::row(self.data.len());
        self
    }

    /// New tensor with every axis reversed
    #[must_use]
    pub fn flip_xyz(&self) -> Self {
        let (sx, sy, sz) = (self.shape.x(), self.shape.y(), self.shape.z());
        let mut data = Vec::with_capacity(self.data.len());
        for z in 0..sz {
            for y in 0..sy {
                for x in 0..sx {
                    data.push(self.data[self.shape.index(sx - 1 - x, sy - 1 - y, sz - 1 - z)]);
                }
            }
        }
        Self {
            shape: self.shape,
            data,
        }
    }
}

// ===== VIEWS =====
impl Tensor {
    /// Window over the inclusive corners `start..=end`
    ///
    /// Corners may lie outside this tensor; reads there yield zero.
    #[must_use]
    pub fn slice(&self, start: Index, end: Index) -> View<'_> {
        View::new(self, start, end)
    }

    /// Window covering the whole tensor
    #[must_use]
    pub fn view(&self) -> View<'_> {
        self.slice(Index::ORIGIN, self.shape.last())
    }

    /// Whole-tensor window restricted to `start..=end` along one axis
    #[must_use]
    pub fn slice_axis(&self, axis: Axis, start: isize, end: isize) -> View<'_> {
        self.slice(Index::ORIGIN.set(axis, start), self.shape.last().set(axis, end))
    }

    /// Writable window over the inclusive corners `start..=end`
    pub fn slice_mut(&mut self, start: Index, end: Index) -> ViewMut<'_> {
        ViewMut::new(self, start, end)
    }

    /// Writable window covering the whole tensor
    pub fn view_mut(&mut self) -> ViewMut<'_> {
        let last = self.shape.last();
        self.slice_mut(Index::ORIGIN, last)
    }

    /// Writable whole-tensor window restricted to `start..=end` along one axis
    pub fn slice_axis_mut(&mut self, axis: Axis, start: isize, end: isize) -> ViewMut<'_> {
        let last = self.shape.last();
        self.slice_mut(Index::ORIGIN.set(axis, start), last.set(axis, end))
    }

    /// Materialize the window `start..=end`, zeros outside the bounds
    #[must_use]
    pub fn extract(&self, start: Index, end: Index) -> Vec<f32> {
        self.slice(start, end).extract()
    }
}

fn window_shape(start: Index, end: Index) -> Shape {
    let extent = |s: isize, e: isize| if e < s { 0 } else { (e - s + 1) as usize };
    Shape::new(
        extent(start.x(), end.x()),
        extent(start.y(), end.y()),
        extent(start.z(), end.z()),
    )
}

/// Read-only window into a [`Tensor`]
///
/// Coordinates are view-local and translated by adding `start`. Cells that
/// map outside the owning tensor read as zero, which is how convolution
/// padding is realized without materializing padded copies.
#[derive(Clone, Copy)]
pub struct View<'a> {
    tensor: &'a Tensor,
    shape: Shape,
    start: Index,
    end: Index,
}

impl<'a> View<'a> {
    fn new(tensor: &'a Tensor, start: Index, end: Index) -> Self {
        Self {
            tensor,
            shape: window_shape(start, end),
            start,
            end,
        }
    }

    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub const fn start(&self) -> Index {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> Index {
        self.end
    }

    /// Absolute coordinate in the owning tensor
    #[must_use]
    pub fn absolute(&self, local: &Index) -> Index {
        self.start + *local
    }

    /// Whether the view-local coordinate maps inside the owning tensor
    #[must_use]
    pub fn in_bounds(&self, local: &Index) -> bool {
        self.tensor.shape.contains(&self.absolute(local))
    }

    /// Read at a view-local coordinate, zero outside the owning tensor
    #[must_use]
    pub fn get(&self, x: isize, y: isize, z: isize) -> f32 {
        self.get_index(&Index::new(x, y, z))
    }

    #[must_use]
    pub fn get_index(&self, local: &Index) -> f32 {
        self.tensor
            .shape
            .offset_of(&self.absolute(local))
            .map_or(0.0, |offset| self.tensor.data[offset])
    }

    /// Enumerates view-local coordinates, last axis fastest
    #[must_use]
    pub fn iter_indices(&self) -> IndexIter {
        IndexIter::new(Index::ORIGIN, self.shape.last())
    }

    /// Values in buffer layout order (z slowest, x fastest)
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        let (sx, sy, sz) = (
            self.shape.x() as isize,
            self.shape.y() as isize,
            self.shape.z() as isize,
        );
        (0..sz).flat_map(move |z| {
            (0..sy).flat_map(move |y| (0..sx).map(move |x| self.get(x, y, z)))
        })
    }

    /// Flat copy in buffer layout order, zeros for out-of-bounds cells
    #[must_use]
    pub fn extract(&self) -> Vec<f32> {
        self.values().collect()
    }

    #[must_use]
    pub fn sum(&self) -> f32 {
        self.values().fold(0.0, |acc, v| acc + v)
    }

    /// Sum of pairwise products in layout order
    ///
    /// # Errors
    /// `ShapeMismatch` unless both views have the same shape
    pub fn dot(&self, other: &View<'_>) -> Result<f32> {
        if self.shape != other.shape {
            return Err(TesseraError::shape_mismatch(self.shape, other.shape));
        }
        Ok(self
            .values()
            .zip(other.values())
            .fold(0.0, |acc, (a, b)| acc + a * b))
    }

    /// View-local coordinate of the maximum in-bounds value
    ///
    /// Ties keep the first maximum in iteration order. When no cell maps
    /// inside the owning tensor the origin is returned.
    #[must_use]
    pub fn argmax(&self) -> Index {
        let mut best = Index::ORIGIN;
        let mut best_val = f32::NEG_INFINITY;
        let mut found = false;
        for local in self.iter_indices() {
            if let Some(offset) = self.tensor.shape.offset_of(&self.absolute(&local)) {
                let v = self.tensor.data[offset];
                if !found || v > best_val {
                    best = local;
                    best_val = v;
                    found = true;
                }
            }
        }
        best
    }
}

/// Writable window into a [`Tensor`]
///
/// Holds the owning tensor mutably, so no other access can happen while it
/// is alive. Reads outside the owner yield zero; writes outside fail.
pub struct ViewMut<'a> {
    tensor: &'a mut Tensor,
    shape: Shape,
    start: Index,
}

impl<'a> ViewMut<'a> {
    fn new(tensor: &'a mut Tensor, start: Index, end: Index) -> Self {
        Self {
            tensor,
            shape: window_shape(start, end),
            start,
        }
    }

    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub fn get_index(&self, local: &Index) -> f32 {
        self.tensor
            .shape
            .offset_of(&(self.start + *local))
            .map_or(0.0, |offset| self.tensor.data[offset])
    }

    /// Write access at a view-local coordinate
    ///
    /// # Errors
    /// `OutOfRange` if the coordinate maps outside the owning tensor
    pub fn at_mut(&mut self, local: &Index) -> Result<&mut f32> {
        let absolute = self.start + *local;
        self.tensor.at_index_mut(&absolute)
    }

    #[must_use]
    pub fn iter_indices(&self) -> IndexIter {
        IndexIter::new(Index::ORIGIN, self.shape.last())
    }

    /// Assign `f(local)` to every cell of the window, in iteration order
    ///
    /// # Errors
    /// The first error returned by `f`, or `OutOfRange` once the window
    /// reaches outside the owning tensor
    pub fn try_fill_with<F: FnMut(Index) -> Result<f32>>(&mut self, mut f: F) -> Result<()> {
        for local in self.iter_indices() {
            let value = f(local)?;
            *self.at_mut(&local)? = value;
        }
        Ok(())
    }

    #[must_use]
    pub fn as_view(&self) -> View<'_> {
        let end = self.start + self.shape.last();
        View::new(&*self.tensor, self.start, end)
    }
}

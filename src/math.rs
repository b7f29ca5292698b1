//! Activation functions and small linear-algebra kernels
//!
//! Matrices are tensors shaped `Shape::matrix(height, width)`, i.e. `width`
//! along x and `height` along y. Vectors are row tensors.

use crate::error::{Result, TesseraError};
use crate::shape::Shape;
use crate::tensor::{Tensor, View};

// ===== SCALAR ACTIVATIONS =====

#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[must_use]
pub fn sigmoid_derivative(x: f32) -> f32 {
    let s = sigmoid(x);
    s * (1.0 - s)
}

#[must_use]
pub fn relu(x: f32) -> f32 {
    if x < 0.0 { 0.0 } else { x }
}

/// Unit step; the derivative at zero is taken as zero
#[must_use]
pub fn relu_derivative(x: f32) -> f32 {
    if x > 0.0 { 1.0 } else { 0.0 }
}

// ===== TENSOR ACTIVATIONS =====

fn mapped(x: &Tensor, f: fn(f32) -> f32) -> Tensor {
    let mut result = x.clone();
    result.apply(f);
    result
}

#[must_use]
pub fn sigmoid_v(x: &Tensor) -> Tensor {
    mapped(x, sigmoid)
}

#[must_use]
pub fn sigmoid_derivative_v(x: &Tensor) -> Tensor {
    mapped(x, sigmoid_derivative)
}

#[must_use]
pub fn relu_v(x: &Tensor) -> Tensor {
    mapped(x, relu)
}

#[must_use]
pub fn relu_derivative_v(x: &Tensor) -> Tensor {
    mapped(x, relu_derivative)
}

/// Softmax over every cell, shifted by the maximum for stability
#[must_use]
pub fn stable_softmax_v(x: &Tensor) -> Tensor {
    let x_max = x.max();
    let mut result = x.clone();
    result.apply(|v| (v - x_max).exp());
    let sum = result.sum();
    result.mul(1.0 / sum);
    result
}

// ===== PRODUCTS =====

/// Sum of pairwise products of two equally shaped tensors
///
/// # Errors
/// `ShapeMismatch` unless the shapes are equal
pub fn inner_product(a: &Tensor, b: &Tensor) -> Result<f32> {
    if a.shape() != b.shape() {
        return Err(TesseraError::shape_mismatch(a.shape(), b.shape()));
    }
    Ok(a
        .data()
        .iter()
        .zip(b.data().iter())
        .fold(0.0, |acc, (&x, &y)| acc + x * y))
}

/// Windowed dot product of two views, out-of-bounds cells count as zero
///
/// # Errors
/// `ShapeMismatch` unless the views have the same shape
pub fn dot(a: &View<'_>, b: &View<'_>) -> Result<f32> {
    a.dot(b)
}

fn ensure_matrix_vector(m: &Tensor, v: &Tensor, len: usize) -> Result<()> {
    if m.shape().z() != 1 || v.len() != len {
        return Err(TesseraError::shape_mismatch(
            Shape::row(len),
            v.shape(),
        ));
    }
    Ok(())
}

/// Matrix times vector: `result(i) = sum_j v(j) * m(j, i)`
///
/// `m` has `height` rows of `width` columns and `v` has `width` entries; the
/// result is a row of `height` entries.
///
/// # Errors
/// `ShapeMismatch` if `v` does not have `width` entries
pub fn dot21(m: &Tensor, v: &Tensor) -> Result<Tensor> {
    let (width, height) = (m.shape().x(), m.shape().y());
    ensure_matrix_vector(m, v, width)?;
    let (md, vd) = (m.data(), v.data());
    let result = (0..height)
        .map(|i| {
            let row = &md[i * width..(i + 1) * width];
            row.iter()
                .zip(vd.iter())
                .fold(0.0, |acc, (&w, &x)| acc + x * w)
        })
        .collect();
    Ok(Tensor::row(result))
}

/// Transposed matrix times vector: `result(i) = sum_j m(i, j) * v(j)`
///
/// `v` has `height` entries; the result is a row of `width` entries.
///
/// # Errors
/// `ShapeMismatch` if `v` does not have `height` entries
pub fn transpose_dot21(m: &Tensor, v: &Tensor) -> Result<Tensor> {
    let (width, height) = (m.shape().x(), m.shape().y());
    ensure_matrix_vector(m, v, height)?;
    let (md, vd) = (m.data(), v.data());
    let result = (0..width)
        .map(|i| (0..height).fold(0.0, |acc, j| acc + md[j * width + i] * vd[j]))
        .collect();
    Ok(Tensor::row(result))
}

/// Outer product of two vectors: a `a.len() x b.len()` matrix with
/// `c(j, i) = a(i) * b(j)`
#[must_use]
pub fn outer_product(a: &Tensor, b: &Tensor) -> Tensor {
    let (height, width) = (a.len(), b.len());
    let mut c = Tensor::zeros(Shape::matrix(height, width));
    let cells = c.data_mut().chunks_mut(width.max(1));
    for (row, &ai) in cells.zip(a.data()) {
        for (slot, &bj) in row.iter_mut().zip(b.data()) {
            *slot = ai * bj;
        }
    }
    c
}

/// Position of the first maximum of the flat buffer
///
/// # Errors
/// `Configuration` on an empty tensor
pub fn argmax1d(v: &Tensor) -> Result<usize> {
    let data = v.data();
    let Some(&first) = data.first() else {
        return Err(TesseraError::Configuration(
            "argmax of an empty tensor".to_string(),
        ));
    };
    let mut max_v = first;
    let mut max_i = 0;
    for (i, &vi) in data.iter().enumerate().skip(1) {
        if vi > max_v {
            max_v = vi;
            max_i = i;
        }
    }
    Ok(max_i)
}

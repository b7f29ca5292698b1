use super::{Conv2d, same_padding};
use crate::error::Result;
use crate::math::{dot21, inner_product};
use crate::shape::{Axis, Index, Shape};
use crate::tensor::Tensor;

impl Conv2d {
    /// All filters as a `filters x filter_capacity` matrix, one filter per row
    fn flat_filters(&self) -> Result<Tensor> {
        let flength = self.filter_shape.capacity();
        let mut data = Vec::with_capacity(self.filters * flength);
        for w in &self.weights {
            data.extend_from_slice(w.data());
        }
        Tensor::from_vec(Shape::matrix(self.filters, flength), data)
    }

    /// Input footprints as an `outputs x filter_capacity` matrix
    ///
    /// Row `y * out_x + x` holds the (zero padded) footprint of output cell
    /// `(x, y)` in buffer layout order.
    fn input_patches(&self) -> Result<Tensor> {
        let out_shape = self.output_shape();
        let (pad_x, pad_y) = (self.left_padding() as isize, self.top_padding() as isize);
        let (fx, fy) = (self.filter_shape.x() as isize, self.filter_shape.y() as isize);
        let depth = self.input_shape.z() as isize;
        let s = self.stride as isize;
        let positions = out_shape.x() * out_shape.y();

        let mut data = Vec::with_capacity(positions * self.filter_shape.capacity());
        for y in 0..out_shape.y() {
            let ys = y as isize * s - pad_y;
            for x in 0..out_shape.x() {
                let xs = x as isize * s - pad_x;
                data.extend(
                    self.input
                        .slice(
                            Index::new(xs, ys, 0),
                            Index::new(xs + fx - 1, ys + fy - 1, depth - 1),
                        )
                        .values(),
                );
            }
        }
        Tensor::from_vec(Shape::matrix(positions, self.filter_shape.capacity()), data)
    }

    /// Column `k` of the patch matrix: footprint offset `k` across all outputs
    fn patch_column(&self, k: usize) -> Tensor {
        let width = self.patches.shape().x();
        let column = self
            .patches
            .data()
            .iter()
            .skip(k)
            .step_by(width.max(1))
            .copied()
            .collect();
        Tensor::row(column)
    }

    /// Delta footprints of plane `f` for the full convolution, one row per
    /// input cell `y * in_x + x`
    fn delta_patches(&self, delta: &Tensor, f: usize) -> Result<Tensor> {
        let (fx, fy) = (self.filter_shape.x(), self.filter_shape.y());
        let wpad_x = same_padding(delta.shape().x(), fx, self.stride) as isize;
        let wpad_y = same_padding(delta.shape().y(), fy, self.stride) as isize;
        let (ix, iy) = (self.input_shape.x(), self.input_shape.y());
        let s = self.stride as isize;
        let fi = f as isize;

        let mut data = Vec::with_capacity(ix * iy * fx * fy);
        for y in 0..iy {
            let ys = y as isize * s - wpad_y;
            for x in 0..ix {
                let xs = x as isize * s - wpad_x;
                data.extend(
                    delta
                        .slice(
                            Index::new(xs, ys, fi),
                            Index::new(xs + fx as isize - 1, ys + fy as isize - 1, fi),
                        )
                        .values(),
                );
            }
        }
        Tensor::from_vec(Shape::matrix(ix * iy, fx * fy), data)
    }

    /// Pre-activation output via one matrix-vector product per output position
    pub(super) fn forward_im2col(&mut self) -> Result<Tensor> {
        self.patches = self.input_patches()?;
        let filters = self.flat_filters()?;
        let out_shape = self.output_shape();
        let flength = self.filter_shape.capacity();

        let mut output = Tensor::zeros(out_shape);
        let rows = self.patches.data().chunks(flength.max(1));
        for (p, patch) in rows.take(out_shape.x() * out_shape.y()).enumerate() {
            let (x, y) = (p % out_shape.x(), p / out_shape.x());
            let conv = dot21(&filters, &Tensor::row(patch.to_vec()))?;
            for (f, &v) in conv.data().iter().enumerate() {
                output[(x, y, f)] = v + self.bias(f);
            }
        }
        Ok(output)
    }

    /// Accumulate gradients for `delta` and return the input gradient
    pub(super) fn backward_im2col(&mut self, delta: &Tensor) -> Result<Tensor> {
        if self.patches.is_empty() {
            self.patches = self.input_patches()?;
        }
        let flength = self.filter_shape.capacity();
        let columns = (0..flength)
            .map(|k| self.patch_column(k))
            .collect::<Vec<_>>();

        for f in 0..self.filters {
            let row = Tensor::row(delta.slice_axis(Axis::Z, f as isize, f as isize).extract());
            for (k, column) in columns.iter().enumerate() {
                self.nabla_weights[f].data_mut()[k] += inner_product(&row, column)?;
            }
            self.nabla_biases[f].data_mut()[0] += row.sum();
        }

        let (ix, iy, depth) = (self.input_shape.x(), self.input_shape.y(), self.input_shape.z());
        let (fx, fy) = (self.filter_shape.x(), self.filter_shape.y());
        let mut channels = vec![Tensor::zeros(Shape::row(ix * iy)); depth];
        for f in 0..self.filters {
            let dpatches = self.delta_patches(delta, f)?;
            for (c, channel) in channels.iter_mut().enumerate() {
                let ci = c as isize;
                let filter_c = Tensor::row(self.weights[f].extract(
                    Index::new(0, 0, ci),
                    Index::new(fx as isize - 1, fy as isize - 1, ci),
                ));
                channel.add(&dot21(&dpatches, &filter_c)?)?;
            }
        }

        let mut delta_next = Tensor::zeros(self.input_shape);
        for (c, channel) in channels.iter().enumerate() {
            for y in 0..iy {
                for x in 0..ix {
                    delta_next[(x, y, c)] = channel.data()[y * ix + x];
                }
            }
        }
        Ok(delta_next)
    }
}

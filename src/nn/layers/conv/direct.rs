use super::{Conv2d, same_padding};
use crate::error::Result;
use crate::math::dot;
use crate::shape::{Axis, Index};
use crate::tensor::Tensor;

impl Conv2d {
    /// Pre-activation output, one windowed dot product per output cell
    pub(super) fn forward_direct(&self) -> Result<Tensor> {
        let out_shape = self.output_shape();
        let (pad_x, pad_y) = (self.left_padding() as isize, self.top_padding() as isize);
        let (fx, fy) = (self.filter_shape.x() as isize, self.filter_shape.y() as isize);
        let depth = self.input_shape.z() as isize;
        let s = self.stride as isize;

        let mut output = Tensor::zeros(out_shape);
        for f in 0..self.filters {
            let filter = self.weights[f].view();
            let bias = self.bias(f);
            let fi = f as isize;
            output.slice_axis_mut(Axis::Z, fi, fi).try_fill_with(|at| {
                let (xs, ys) = (at.x() * s - pad_x, at.y() * s - pad_y);
                let window = self.input.slice(
                    Index::new(xs, ys, 0),
                    Index::new(xs + fx - 1, ys + fy - 1, depth - 1),
                );
                Ok(dot(&window, &filter)? + bias)
            })?;
        }
        Ok(output)
    }

    /// Accumulate gradients for `delta` and return the input gradient
    pub(super) fn backward_direct(&mut self, delta: &Tensor) -> Result<Tensor> {
        let out_shape = delta.shape();
        let (pad_x, pad_y) = (self.left_padding() as isize, self.top_padding() as isize);
        let s = self.stride as isize;
        let fshape = self.filter_shape;
        let padded = self.input.view();

        for f in 0..self.filters {
            self.nabla_biases[f].data_mut()[0] += delta.slice_axis(Axis::Z, f as isize, f as isize).sum();

            // input(x*s - pad + i, y*s - pad + j, c) * delta(x, y, f) over every output cell
            let nabla_w = &mut self.nabla_weights[f];
            for c in 0..fshape.z() {
                for j in 0..fshape.y() {
                    for i in 0..fshape.x() {
                        let mut g = 0.0;
                        for y in 0..out_shape.y() {
                            let ys = y as isize * s - pad_y + j as isize;
                            for x in 0..out_shape.x() {
                                let xs = x as isize * s - pad_x + i as isize;
                                g += padded.get(xs, ys, c as isize) * delta[(x, y, f)];
                            }
                        }
                        nabla_w[(i, j, c)] += g;
                    }
                }
            }
        }

        // full convolution of each delta plane with the matching filter plane
        let wpad_x = same_padding(out_shape.x(), fshape.x(), self.stride) as isize;
        let wpad_y = same_padding(out_shape.y(), fshape.y(), self.stride) as isize;
        let (fx, fy) = (fshape.x() as isize, fshape.y() as isize);

        let mut delta_next = Tensor::zeros(self.input_shape);
        for f in 0..self.filters {
            let fi = f as isize;
            for c in 0..self.input_shape.z() {
                let filter = self.weights[f].slice_axis(Axis::Z, c as isize, c as isize);
                for y in 0..self.input_shape.y() {
                    let ys = y as isize * s - wpad_y;
                    for x in 0..self.input_shape.x() {
                        let xs = x as isize * s - wpad_x;
                        let window =
                            delta.slice(Index::new(xs, ys, fi), Index::new(xs + fx - 1, ys + fy - 1, fi));
                        delta_next[(x, y, c)] += dot(&window, &filter)?;
                    }
                }
            }
        }
        Ok(delta_next)
    }
}

use crate::error::{Result, TesseraError};
use crate::nn::Layer;
use crate::shape::{Index, Shape};
use crate::tensor::Tensor;

/// 2D max pooling layer
///
/// Downsamples every depth plane independently: each `window x window`
/// footprint collapses to its maximum. The absolute input coordinate of
/// each maximum is recorded so the backward pass can route the error back
/// to it.
pub struct MaxPool2d {
    window: usize,
    stride: usize,
    input_shape: Shape,
    output_shape: Shape,
    // absolute input coordinate of the maximum, by output buffer offset
    max_index: Vec<Index>,
}

impl MaxPool2d {
    /// # Errors
    /// `Configuration` if `window` or `stride` is zero
    pub fn new(window: usize, stride: usize) -> Result<Self> {
        if window == 0 || stride == 0 {
            return Err(TesseraError::Configuration(format!(
                "pooling needs a non-zero window and stride, got {window} and {stride}"
            )));
        }
        Ok(Self {
            window,
            stride,
            input_shape: Shape::default(),
            output_shape: Shape::default(),
            max_index: Vec::new(),
        })
    }

    /// Output shape for `input`
    ///
    /// # Errors
    /// `Configuration` if the window does not fit the input
    pub fn output_shape_for(&self, input: Shape) -> Result<Shape> {
        if self.window > input.x() || self.window > input.y() {
            return Err(TesseraError::Configuration(format!(
                "pooling window {} does not fit input {input}",
                self.window
            )));
        }
        Ok(Shape::new(
            (input.x() - self.window) / self.stride + 1,
            (input.y() - self.window) / self.stride + 1,
            input.z(),
        ))
    }

    /// Recorded maxima of the last forward pass, by output buffer offset
    #[must_use]
    pub fn max_index(&self) -> &[Index] {
        &self.max_index
    }
}

impl Layer for MaxPool2d {
    fn feedforward(&mut self, input: Tensor) -> Result<Tensor> {
        let out_shape = self.output_shape_for(input.shape())?;
        let (w, s) = (self.window as isize, self.stride as isize);

        let mut output = Tensor::zeros(out_shape);
        let mut max_index = Vec::with_capacity(out_shape.capacity());
        for z in 0..out_shape.z() {
            for y in 0..out_shape.y() {
                let ys = y as isize * s;
                for x in 0..out_shape.x() {
                    let xs = x as isize * s;
                    let footprint = input.slice(
                        Index::new(xs, ys, z as isize),
                        Index::new(xs + w - 1, ys + w - 1, z as isize),
                    );
                    let at = footprint.absolute(&footprint.argmax());
                    output[(x, y, z)] = input.at_index(&at)?;
                    max_index.push(at);
                }
            }
        }

        self.input_shape = input.shape();
        self.output_shape = out_shape;
        self.max_index = max_index;
        Ok(output)
    }

    fn backpropagate(&mut self, error: Tensor) -> Result<Tensor> {
        if error.shape() != self.output_shape {
            return Err(TesseraError::shape_mismatch(self.output_shape, error.shape()));
        }
        let mut delta_next = Tensor::zeros(self.input_shape);
        for (at, &e) in self.max_index.iter().zip(error.data()) {
            *delta_next.at_index_mut(at)? += e;
        }
        Ok(delta_next)
    }

    fn name(&self) -> &'static str {
        "MaxPool2d"
    }
}

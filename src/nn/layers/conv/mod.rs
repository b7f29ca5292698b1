//! 2D convolution over `(width, height, channels)` tensors
//!
//! One [`Conv2d`] type holds the shared state (filters, biases, gradient
//! accumulators and the tensors cached between the forward and backward
//! passes). The arithmetic lives in two strategies selected with
//! [`ConvAlgo`]:
//! - `Direct`: nested loops with a windowed dot product per output cell
//! - `Im2col`: patches flattened into a matrix, one matrix-vector product
//!   per output position
//!
//! Both strategies sum in the same order, so they agree bit for bit on
//! outputs, gradient accumulators and input gradients.

mod direct;
mod im2col;

use crate::activator::Activator;
use crate::error::{Result, TesseraError};
use crate::io::{StateDict, TensorData, tensor_entry};
use crate::nn::Layer;
use crate::nn::optim::Optimizer;
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Convolution algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvAlgo {
    /// Nested loops, one windowed dot product per output cell
    Direct,
    /// Patch matrix times flattened filters
    #[default]
    Im2col,
}

/// How the input border is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// Only positions where the filter lies entirely within the input
    #[default]
    Valid,
    /// Output extent is `ceil(input / stride)`, zero padded around the input
    Same,
}

/// Padding placed before the data along one axis under "same" padding
///
/// The total is `filter - (input % stride == 0 ? stride : input % stride)`,
/// clamped at zero; the smaller half goes before the data.
#[must_use]
pub const fn same_padding(input: usize, filter: usize, stride: usize) -> usize {
    if stride == 0 {
        return 0;
    }
    let rem = input % stride;
    let covered = if rem == 0 { stride } else { rem };
    filter.saturating_sub(covered) / 2
}

/// Padding before the data along x
#[must_use]
pub const fn left_padding(padding: Padding, input: Shape, filter: Shape, stride: usize) -> usize {
    match padding {
        Padding::Valid => 0,
        Padding::Same => same_padding(input.x(), filter.x(), stride),
    }
}

/// Padding before the data along y
#[must_use]
pub const fn top_padding(padding: Padding, input: Shape, filter: Shape, stride: usize) -> usize {
    match padding {
        Padding::Valid => 0,
        Padding::Same => same_padding(input.y(), filter.y(), stride),
    }
}

/// 2D convolution layer
///
/// Fields:
/// - `weights`: one filter per output channel, each shaped `filter_shape`
/// - `biases`: one single-cell tensor per filter
/// - `nabla_*`: gradient accumulators, zeroed by `optimize`
/// - `input`, `output`: last input and pre-activation output
/// - `patches`: flattened input footprints, kept only by `Im2col`
pub struct Conv2d {
    input_shape: Shape,
    filter_shape: Shape,
    filters: usize,
    stride: usize,
    padding: Padding,
    algo: ConvAlgo,
    activator: Activator,
    weights: Vec<Tensor>,
    biases: Vec<Tensor>,
    nabla_weights: Vec<Tensor>,
    nabla_biases: Vec<Tensor>,
    input: Tensor,
    output: Tensor,
    patches: Tensor,
}

impl Conv2d {
    /// Create a convolution layer with unallocated parameters
    ///
    /// # Arguments
    /// * `input_shape` - `(width, height, channels)` of every input
    /// * `filter_shape` - `(width, height, channels)` of every filter
    /// * `filters` - number of filters, i.e. output channels
    /// * `stride` - step between two footprints along x and y
    /// * `padding` - border policy
    /// * `activator` - applied to the pre-activation output
    ///
    /// # Errors
    /// `Configuration` if the filter depth differs from the input depth, the
    /// stride or filter count is zero, or a "valid" filter exceeds the input
    pub fn new(
        input_shape: Shape,
        filter_shape: Shape,
        filters: usize,
        stride: usize,
        padding: Padding,
        activator: Activator,
    ) -> Result<Self> {
        if filter_shape.z() != input_shape.z() {
            return Err(TesseraError::Configuration(format!(
                "filter depth {} differs from input depth {}",
                filter_shape.z(),
                input_shape.z()
            )));
        }
        if stride == 0 || filters == 0 || filter_shape.capacity() == 0 {
            return Err(TesseraError::Configuration(format!(
                "convolution needs a non-zero stride, filter count and filter, got {stride}, {filters}, {filter_shape}"
            )));
        }
        if padding == Padding::Valid
            && (filter_shape.x() > input_shape.x() || filter_shape.y() > input_shape.y())
        {
            return Err(TesseraError::Configuration(format!(
                "filter {filter_shape} does not fit input {input_shape} without padding"
            )));
        }

        Ok(Self {
            input_shape,
            filter_shape,
            filters,
            stride,
            padding,
            algo: ConvAlgo::default(),
            activator,
            weights: Vec::new(),
            biases: Vec::new(),
            nabla_weights: Vec::new(),
            nabla_biases: Vec::new(),
            input: Tensor::default(),
            output: Tensor::default(),
            patches: Tensor::default(),
        })
    }

    #[must_use]
    pub fn with_algo(mut self, algo: ConvAlgo) -> Self {
        self.algo = algo;
        self
    }

    pub fn set_algo(&mut self, algo: ConvAlgo) {
        self.algo = algo;
    }

    #[must_use]
    pub const fn algo(&self) -> ConvAlgo {
        self.algo
    }

    #[must_use]
    pub const fn input_shape(&self) -> Shape {
        self.input_shape
    }

    #[must_use]
    pub const fn filter_shape(&self) -> Shape {
        self.filter_shape
    }

    /// Shape of the output: one plane per filter
    #[must_use]
    pub const fn output_shape(&self) -> Shape {
        let (ix, iy, s) = (self.input_shape.x(), self.input_shape.y(), self.stride);
        match self.padding {
            Padding::Valid => Shape::new(
                (ix - self.filter_shape.x()) / s + 1,
                (iy - self.filter_shape.y()) / s + 1,
                self.filters,
            ),
            Padding::Same => Shape::new(ix.div_ceil(s), iy.div_ceil(s), self.filters),
        }
    }

    #[must_use]
    pub const fn left_padding(&self) -> usize {
        left_padding(self.padding, self.input_shape, self.filter_shape, self.stride)
    }

    #[must_use]
    pub const fn top_padding(&self) -> usize {
        top_padding(self.padding, self.input_shape, self.filter_shape, self.stride)
    }

    #[must_use]
    pub fn weights(&self) -> &[Tensor] {
        &self.weights
    }

    #[must_use]
    pub fn biases(&self) -> &[Tensor] {
        &self.biases
    }

    #[must_use]
    pub fn nabla_weights(&self) -> &[Tensor] {
        &self.nabla_weights
    }

    #[must_use]
    pub fn nabla_biases(&self) -> &[Tensor] {
        &self.nabla_biases
    }

    fn ensure_nablas(&mut self) {
        if self.nabla_weights.is_empty() {
            self.nabla_weights = vec![Tensor::zeros(self.filter_shape); self.filters];
            self.nabla_biases = vec![Tensor::zeros(Shape::row(1)); self.filters];
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.weights.len() != self.filters || self.nabla_weights.len() != self.filters {
            return Err(TesseraError::Configuration(
                "convolution layer used before init or load".to_string(),
            ));
        }
        Ok(())
    }

    /// `activation'(pre-activation) ⊙ error`
    fn delta(&self, error: &Tensor) -> Result<Tensor> {
        let mut delta = self.activator.derivative(&self.output);
        delta.element_mul(error)?;
        Ok(delta)
    }

    /// Scalar bias of filter `f`
    fn bias(&self, f: usize) -> f32 {
        self.biases[f].data()[0]
    }
}

impl Layer for Conv2d {
    fn init(&mut self) -> Result<()> {
        if self.weights.is_empty() {
            let stddev = 1.0 / (self.filter_shape.capacity() as f32).sqrt();
            self.weights = (0..self.filters)
                .map(|_| Tensor::randn(self.filter_shape, 0.0, stddev))
                .collect::<Result<_>>()?;
            self.biases = vec![Tensor::zeros(Shape::row(1)); self.filters];
            log::debug!(
                "conv: allocated {} filters of {} (stddev {stddev:.4})",
                self.filters,
                self.filter_shape
            );
        }
        self.ensure_nablas();
        Ok(())
    }

    fn feedforward(&mut self, input: Tensor) -> Result<Tensor> {
        if input.shape() != self.input_shape {
            return Err(TesseraError::shape_mismatch(self.input_shape, input.shape()));
        }
        self.ensure_ready()?;
        self.input = input;
        self.output = match self.algo {
            ConvAlgo::Direct => {
                self.patches = Tensor::default();
                self.forward_direct()?
            }
            ConvAlgo::Im2col => self.forward_im2col()?,
        };
        Ok(self.activator.activate(&self.output))
    }

    fn backpropagate(&mut self, error: Tensor) -> Result<Tensor> {
        self.ensure_ready()?;
        let delta = self.delta(&error)?;
        match self.algo {
            ConvAlgo::Direct => self.backward_direct(&delta),
            ConvAlgo::Im2col => self.backward_im2col(&delta),
        }
    }

    fn optimize(&mut self, optimizer: &dyn Optimizer) -> Result<()> {
        self.ensure_ready()?;
        let params = self.weights.iter_mut().zip(self.biases.iter_mut());
        let nablas = self.nabla_weights.iter_mut().zip(self.nabla_biases.iter_mut());
        for ((w, b), (nw, nb)) in params.zip(nablas) {
            optimizer.update_weights(w, nw)?;
            optimizer.update_bias(b, nb)?;
            nw.reset(0.0);
            nb.reset(0.0);
        }
        Ok(())
    }

    fn load(&mut self, weights: Vec<Tensor>, biases: Vec<Tensor>) -> Result<()> {
        if weights.len() != self.filters || biases.len() != self.filters {
            return Err(TesseraError::Configuration(format!(
                "expected {} filters and biases, got {} and {}",
                self.filters,
                weights.len(),
                biases.len()
            )));
        }
        if let Some(w) = weights.iter().find(|w| w.shape() != self.filter_shape) {
            return Err(TesseraError::shape_mismatch(self.filter_shape, w.shape()));
        }
        if let Some(b) = biases.iter().find(|b| b.shape() != Shape::row(1)) {
            return Err(TesseraError::shape_mismatch(Shape::row(1), b.shape()));
        }

        self.weights = weights;
        self.biases = biases;
        self.ensure_nablas();
        log::debug!("conv: loaded {} filters of {}", self.filters, self.filter_shape);
        Ok(())
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        for (f, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            state.insert(format!("weight.{f}"), TensorData::from_tensor(w));
            state.insert(format!("bias.{f}"), TensorData::from_tensor(b));
        }
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        let weights = (0..self.filters)
            .map(|f| tensor_entry(state, &format!("weight.{f}")))
            .collect::<Result<Vec<_>>>()?;
        let biases = (0..self.filters)
            .map(|f| tensor_entry(state, &format!("bias.{f}")))
            .collect::<Result<Vec<_>>>()?;
        self.load(weights, biases)
    }

    fn name(&self) -> &'static str {
        "Conv2d"
    }
}

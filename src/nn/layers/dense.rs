use crate::activator::Activator;
use crate::error::{Result, TesseraError};
use crate::io::{StateDict, TensorData, tensor_entry};
use crate::math::{dot21, outer_product, transpose_dot21};
use crate::nn::Layer;
use crate::nn::optim::Optimizer;
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Fully-connected (dense) layer
///
/// Computes: a = activation(W·x + b)
/// where x is the flattened input (`input_size`), W is
/// `Shape::matrix(output_size, input_size)` and b is a row of `output_size`.
/// Any input whose capacity equals `input_size` is accepted; the input
/// gradient is returned in the input's original shape.
pub struct Dense {
    input_size: usize,
    output_size: usize,
    activator: Activator,
    weights: Tensor,
    bias: Tensor,
    nabla_w: Tensor,
    nabla_b: Tensor,
    input_shape: Shape,
    input: Tensor,
    output: Tensor,
}

impl Dense {
    #[must_use]
    pub fn new(input_size: usize, output_size: usize, activator: Activator) -> Self {
        Dense {
            input_size,
            output_size,
            activator,
            weights: Tensor::default(),
            bias: Tensor::default(),
            nabla_w: Tensor::default(),
            nabla_b: Tensor::default(),
            input_shape: Shape::default(),
            input: Tensor::default(),
            output: Tensor::default(),
        }
    }

    const fn weight_shape(&self) -> Shape {
        Shape::matrix(self.output_size, self.input_size)
    }

    #[must_use]
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    #[must_use]
    pub fn biases(&self) -> &Tensor {
        &self.bias
    }

    #[must_use]
    pub fn nabla_weights(&self) -> &Tensor {
        &self.nabla_w
    }

    #[must_use]
    pub fn nabla_biases(&self) -> &Tensor {
        &self.nabla_b
    }

    fn ensure_nablas(&mut self) {
        if self.nabla_w.shape() != self.weight_shape() {
            self.nabla_w = Tensor::zeros(self.weight_shape());
            self.nabla_b = Tensor::zeros(Shape::row(self.output_size));
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.weights.shape() != self.weight_shape() || self.nabla_w.shape() != self.weight_shape() {
            return Err(TesseraError::Configuration(
                "dense layer used before init or load".to_string(),
            ));
        }
        Ok(())
    }
}

impl Layer for Dense {
    fn init(&mut self) -> Result<()> {
        if self.weights.is_empty() {
            let stddev = 1.0 / (self.input_size as f32).sqrt();
            self.weights = Tensor::randn(self.weight_shape(), 0.0, stddev)?;
            self.bias = Tensor::randn(Shape::row(self.output_size), 0.0, 1.0)?;
            log::debug!("dense: allocated {} -> {}", self.input_size, self.output_size);
        }
        self.ensure_nablas();
        Ok(())
    }

    fn feedforward(&mut self, input: Tensor) -> Result<Tensor> {
        if input.len() != self.input_size {
            return Err(TesseraError::shape_mismatch(Shape::row(self.input_size), input.shape()));
        }
        self.ensure_ready()?;
        self.input_shape = input.shape();
        self.input = input.flatten();
        let mut z = dot21(&self.weights, &self.input)?;
        z.add(&self.bias)?;
        self.output = z;
        Ok(self.activator.activate(&self.output))
    }

    fn backpropagate(&mut self, error: Tensor) -> Result<Tensor> {
        self.ensure_ready()?;
        let mut delta = self.activator.derivative(&self.output);
        delta.element_mul(&error)?;

        self.nabla_b.add(&delta)?;
        self.nabla_w.add(&outer_product(&delta, &self.input))?;

        let mut delta_next = transpose_dot21(&self.weights, &delta)?;
        delta_next.reshape(self.input_shape)?;
        Ok(delta_next)
    }

    fn optimize(&mut self, optimizer: &dyn Optimizer) -> Result<()> {
        self.ensure_ready()?;
        optimizer.update_weights(&mut self.weights, &self.nabla_w)?;
        optimizer.update_bias(&mut self.bias, &self.nabla_b)?;
        self.nabla_w.reset(0.0);
        self.nabla_b.reset(0.0);
        Ok(())
    }

    fn load(&mut self, weights: Vec<Tensor>, biases: Vec<Tensor>) -> Result<()> {
        let (Ok([w]), Ok([b])) = (<[Tensor; 1]>::try_from(weights), <[Tensor; 1]>::try_from(biases))
        else {
            return Err(TesseraError::Configuration(
                "dense layer loads exactly one weight matrix and one bias row".to_string(),
            ));
        };
        if w.shape() != self.weight_shape() {
            return Err(TesseraError::shape_mismatch(self.weight_shape(), w.shape()));
        }
        if b.shape() != Shape::row(self.output_size) {
            return Err(TesseraError::shape_mismatch(Shape::row(self.output_size), b.shape()));
        }
        self.weights = w;
        self.bias = b;
        self.ensure_nablas();
        log::debug!("dense: loaded {} -> {}", self.input_size, self.output_size);
        Ok(())
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        state.insert("weight".to_string(), TensorData::from_tensor(&self.weights));
        state.insert("bias".to_string(), TensorData::from_tensor(&self.bias));
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        let w = tensor_entry(state, "weight")?;
        let b = tensor_entry(state, "bias")?;
        self.load(vec![w], vec![b])
    }

    fn name(&self) -> &'static str {
        "Dense"
    }
}

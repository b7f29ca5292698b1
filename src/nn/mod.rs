use crate::error::Result;
use crate::io::StateDict;
use crate::nn::optim::Optimizer;
use crate::tensor::Tensor;

pub mod layers;
pub mod network;
pub mod optim;

pub use layers::{Conv2d, ConvAlgo, CrossEntropyOutput, Dense, MaxPool2d, Padding};
pub use network::{Network, Sample};
pub use optim::Sgd;

/// One stage of a [`Network`]
///
/// Layers own their parameters, gradient accumulators and whatever they
/// cache during `feedforward` for the following `backpropagate`. Calls are
/// strictly sequential: a `backpropagate` always follows the `feedforward`
/// of the same sample.
pub trait Layer {
    /// Allocate parameters that were not loaded explicitly
    ///
    /// Must leave already loaded parameters untouched.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Consume the previous layer's output and produce this layer's output
    fn feedforward(&mut self, input: Tensor) -> Result<Tensor>;

    /// Consume the gradient with respect to this layer's output and return
    /// the gradient with respect to its input
    ///
    /// Trainable layers add this sample's contribution to their gradient
    /// accumulators. The output layer receives the expected output instead.
    fn backpropagate(&mut self, error: Tensor) -> Result<Tensor>;

    /// Apply `optimizer` to every parameter and zero the accumulators
    fn optimize(&mut self, _optimizer: &dyn Optimizer) -> Result<()> {
        Ok(())
    }

    /// Replace weights and biases wholesale
    fn load(&mut self, _weights: Vec<Tensor>, _biases: Vec<Tensor>) -> Result<()> {
        Ok(())
    }

    fn state_dict(&self) -> StateDict {
        StateDict::new()
    }

    fn load_state_dict(&mut self, _state: &StateDict) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

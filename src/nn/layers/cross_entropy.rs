use crate::error::Result;
use crate::nn::Layer;
use crate::tensor::Tensor;

/// Cross-entropy cost as the last layer of a network
///
/// Passes activations through unchanged. During backpropagation it receives
/// the expected output and returns `a - y`, the cost derivative with the
/// softmax/sigmoid derivative already folded in.
#[derive(Default)]
pub struct CrossEntropyOutput {
    last_activation: Tensor,
}

impl CrossEntropyOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Layer for CrossEntropyOutput {
    fn feedforward(&mut self, input: Tensor) -> Result<Tensor> {
        self.last_activation = input.clone();
        Ok(input)
    }

    fn backpropagate(&mut self, expected: Tensor) -> Result<Tensor> {
        let mut error = std::mem::take(&mut self.last_activation);
        error.subtract(&expected)?;
        Ok(error)
    }

    fn name(&self) -> &'static str {
        "CrossEntropyOutput"
    }
}

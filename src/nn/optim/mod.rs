pub mod sgd;

pub use sgd::Sgd;

use crate::error::Result;
use crate::tensor::Tensor;

/// Weight-update policy applied by every trainable layer in `optimize`
///
/// Implementations read the accumulated gradient and update the parameter
/// in place. Resetting the accumulator is the layer's job.
pub trait Optimizer {
    fn update_bias(&self, bias: &mut Tensor, nabla_b: &Tensor) -> Result<()>;
    fn update_weights(&self, weights: &mut Tensor, nabla_w: &Tensor) -> Result<()>;
}

use crate::error::{Result, TesseraError};
use crate::nn::optim::Optimizer;
use crate::tensor::Tensor;

/// Stochastic gradient descent with L2 weight decay
///
/// Update rules:
/// - bias: b ← b - (lr / minibatch_size)·∇b
/// - weights: w ← w·(1 - lr·decay / training_size) - lr·∇w
///
/// The weight gradient term is not divided by the minibatch size while the
/// bias term is; both rules are kept exactly as stated above.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sgd {
    minibatch_size: usize,
    training_size: usize,
    decay_rate: f32,
    learning_rate: f32,
}

impl Sgd {
    /// Create a new SGD optimizer
    ///
    /// # Arguments
    /// * `minibatch_size` - Samples accumulated between two updates
    /// * `training_size` - Total number of training samples, scales the decay
    /// * `decay_rate` - L2 penalty (0.0 for none)
    /// * `learning_rate` - Step size
    ///
    /// # Errors
    /// `Configuration` if either size is zero
    pub fn new(
        minibatch_size: usize,
        training_size: usize,
        decay_rate: f32,
        learning_rate: f32,
    ) -> Result<Self> {
        if minibatch_size == 0 || training_size == 0 {
            return Err(TesseraError::Configuration(format!(
                "sgd needs non-zero sizes, got minibatch {minibatch_size} and training set {training_size}"
            )));
        }
        Ok(Self {
            minibatch_size,
            training_size,
            decay_rate,
            learning_rate,
        })
    }

    #[must_use]
    pub const fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    #[must_use]
    pub const fn minibatch_size(&self) -> usize {
        self.minibatch_size
    }
}

impl Optimizer for Sgd {
    fn update_bias(&self, bias: &mut Tensor, nabla_b: &Tensor) -> Result<()> {
        let mut step = nabla_b.clone();
        step.mul(self.learning_rate / self.minibatch_size as f32);
        bias.subtract(&step)?;
        Ok(())
    }

    fn update_weights(&self, weights: &mut Tensor, nabla_w: &Tensor) -> Result<()> {
        if weights.shape() != nabla_w.shape() {
            return Err(TesseraError::shape_mismatch(weights.shape(), nabla_w.shape()));
        }
        let decay = 1.0 - self.learning_rate * self.decay_rate / self.training_size as f32;
        let mut step = nabla_w.clone();
        step.mul(self.learning_rate);
        weights.mul(decay).subtract(&step)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;

    fn sgd() -> Sgd {
        Sgd::new(10, 1000, 20.0, 0.1).unwrap()
    }

    #[test]
    fn test_weight_update_applies_decay_then_gradient() {
        let mut w = Tensor::filled(Shape::row(1), 2.0);
        let nabla_w = Tensor::filled(Shape::row(1), 0.5);
        sgd().update_weights(&mut w, &nabla_w).unwrap();
        // 2.0 * (1 - 0.1*20/1000) - 0.1*0.5
        assert!((w.data()[0] - 1.946).abs() < 1e-6);
    }

    #[test]
    fn test_bias_update_scales_by_minibatch() {
        let mut b = Tensor::filled(Shape::row(1), 1.0);
        let nabla_b = Tensor::filled(Shape::row(1), 0.5);
        sgd().update_bias(&mut b, &nabla_b).unwrap();
        // 1.0 - (0.1/10)*0.5
        assert!((b.data()[0] - 0.995).abs() < 1e-6);
    }

    #[test]
    fn test_weight_gradient_is_not_divided_by_minibatch() {
        // Without decay the step is lr·∇w regardless of the minibatch size,
        // unlike the bias step which is divided by it.
        let small = Sgd::new(1, 1000, 0.0, 0.1).unwrap();
        let large = Sgd::new(100, 1000, 0.0, 0.1).unwrap();
        let nabla = Tensor::filled(Shape::row(1), 1.0);

        let mut w1 = Tensor::zeros(Shape::row(1));
        let mut w2 = Tensor::zeros(Shape::row(1));
        small.update_weights(&mut w1, &nabla).unwrap();
        large.update_weights(&mut w2, &nabla).unwrap();
        assert_eq!(w1, w2);

        let mut b1 = Tensor::zeros(Shape::row(1));
        let mut b2 = Tensor::zeros(Shape::row(1));
        small.update_bias(&mut b1, &nabla).unwrap();
        large.update_bias(&mut b2, &nabla).unwrap();
        assert!((b1.data()[0] - 100.0 * b2.data()[0]).abs() < 1e-6);
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let mut w = Tensor::zeros(Shape::row(2));
        let nabla = Tensor::zeros(Shape::row(3));
        assert!(matches!(
            sgd().update_weights(&mut w, &nabla),
            Err(TesseraError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejected_update_leaves_parameters_untouched() {
        let mut w = Tensor::filled(Shape::row(2), 2.0);
        let mut b = Tensor::filled(Shape::row(2), 1.0);
        let nabla = Tensor::filled(Shape::row(3), 0.5);
        assert!(sgd().update_weights(&mut w, &nabla).is_err());
        assert!(sgd().update_bias(&mut b, &nabla).is_err());
        assert_eq!(w.data(), &[2.0, 2.0]);
        assert_eq!(b.data(), &[1.0, 1.0]);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(Sgd::new(0, 10, 0.0, 0.1).is_err());
        assert!(Sgd::new(10, 0, 0.0, 0.1).is_err());
    }
}

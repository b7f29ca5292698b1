use crate::math;
use crate::tensor::Tensor;
use std::fmt;

type ActivationFn = fn(&Tensor) -> Tensor;

/// Activation function paired with its derivative
///
/// Activators are plain `Copy` values holding two function pointers, so
/// any number of layers can share one without lifetime bookkeeping.
#[derive(Clone, Copy)]
pub struct Activator {
    name: &'static str,
    activate: ActivationFn,
    derivative: ActivationFn,
}

impl Activator {
    #[must_use]
    pub const fn new(name: &'static str, activate: ActivationFn, derivative: ActivationFn) -> Self {
        Self {
            name,
            activate,
            derivative,
        }
    }

    #[must_use]
    pub const fn sigmoid() -> Self {
        Self::new("sigmoid", math::sigmoid_v, math::sigmoid_derivative_v)
    }

    #[must_use]
    pub const fn relu() -> Self {
        Self::new("relu", math::relu_v, math::relu_derivative_v)
    }

    /// Softmax whose derivative is all ones
    ///
    /// Meant to feed a cross-entropy output layer, whose `a - y` error
    /// already folds in the softmax derivative.
    #[must_use]
    pub const fn softmax() -> Self {
        Self::new("softmax", math::stable_softmax_v, ones_like)
    }

    #[must_use]
    pub const fn identity() -> Self {
        Self::new("identity", <Tensor as Clone>::clone, ones_like)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn activate(&self, z: &Tensor) -> Tensor {
        (self.activate)(z)
    }

    #[must_use]
    pub fn derivative(&self, z: &Tensor) -> Tensor {
        (self.derivative)(z)
    }
}

fn ones_like(x: &Tensor) -> Tensor {
    Tensor::filled(x.shape(), 1.0)
}

impl fmt::Debug for Activator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Activator").field(&self.name).finish()
    }
}

impl Default for Activator {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu_pair() {
        let z = Tensor::row(vec![-1.0, 0.0, 2.0]);
        let relu = Activator::relu();
        assert_eq!(relu.activate(&z).data(), &[0.0, 0.0, 2.0]);
        assert_eq!(relu.derivative(&z).data(), &[0.0, 0.0, 1.0]);
        assert_eq!(relu.name(), "relu");
    }

    #[test]
    fn test_softmax_derivative_is_ones() {
        let z = Tensor::row(vec![0.5, 1.5]);
        let softmax = Activator::softmax();
        assert!((softmax.activate(&z).sum() - 1.0).abs() < 1e-6);
        assert_eq!(softmax.derivative(&z).data(), &[1.0, 1.0]);
    }

    #[test]
    fn test_activator_is_shared_by_copy() {
        let a = Activator::sigmoid();
        let b = a;
        let z = Tensor::row(vec![0.0]);
        assert_eq!(a.activate(&z), b.activate(&z));
        assert_eq!(format!("{a:?}"), "Activator(\"sigmoid\")");
    }
}

use crate::error::{Result, TesseraError};
use crate::tensor::Tensor;

/// Expected-output row vector for class `label` out of `num_classes`
///
/// # Errors
/// `Configuration` if `label` is not below `num_classes`
pub fn one_hot(label: usize, num_classes: usize) -> Result<Tensor> {
    if label >= num_classes {
        return Err(TesseraError::Configuration(format!(
            "label {label} out of range for {num_classes} classes"
        )));
    }
    let mut data = vec![0.0; num_classes];
    data[label] = 1.0;
    Ok(Tensor::row(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::argmax1d;

    #[test]
    fn test_one_hot() {
        let v = one_hot(2, 4).unwrap();
        assert_eq!(v.data(), &[0.0, 0.0, 1.0, 0.0]);
        assert_eq!(argmax1d(&v).unwrap(), 2);
        assert!(one_hot(4, 4).is_err());
    }
}

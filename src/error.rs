use crate::shape::{Index, Shape};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TesseraError {
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: Shape, actual: Shape },

    #[error("Data length mismatch: shape {shape} holds {} elements but data length is {len}", shape.capacity())]
    DataLength { shape: Shape, len: usize },

    #[error("Index {index} out of range for shape {shape}")]
    OutOfRange { index: Index, shape: Shape },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TesseraError {
    pub(crate) fn shape_mismatch(expected: Shape, actual: Shape) -> Self {
        TesseraError::ShapeMismatch { expected, actual }
    }
}

pub type Result<T> = std::result::Result<T, TesseraError>;

use crate::error::{Result, TesseraError};
use crate::shape::Shape;
use crate::tensor::Tensor;
use bincode::{Decode, Encode, config};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

pub type StateDict = BTreeMap<String, TensorData>;

// Serializable representation of tensor data
#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct TensorData {
    pub data: Vec<f32>,
    pub shape: [usize; 3],
}

impl TensorData {
    #[must_use]
    pub fn from_tensor(t: &Tensor) -> Self {
        TensorData {
            data: t.data().to_vec(),
            shape: t.shape().dims(),
        }
    }

    /// # Errors
    /// `DataLength` if the stored buffer does not fit the stored shape
    pub fn to_tensor(&self) -> Result<Tensor> {
        let [x, y, z] = self.shape;
        Tensor::from_vec(Shape::new(x, y, z), self.data.clone())
    }
}

/// Look up `key` and rebuild the tensor
///
/// # Errors
/// `Configuration` when the key is absent, `DataLength` on a corrupt entry
pub fn tensor_entry(state: &StateDict, key: &str) -> Result<Tensor> {
    state
        .get(key)
        .ok_or_else(|| TesseraError::Configuration(format!("state dict has no entry `{key}`")))?
        .to_tensor()
}

/// # Errors
/// `Io` on file errors, `Serialization` if encoding fails
pub fn save_state_dict<P: AsRef<Path>>(state: &StateDict, path: P) -> Result<()> {
    let encoded = bincode::encode_to_vec(state, config::standard())
        .map_err(|e| TesseraError::Serialization(e.to_string()))?;
    let mut file = File::create(path)?;
    file.write_all(&encoded)?;
    log::debug!("saved {} tensors ({} bytes)", state.len(), encoded.len());
    Ok(())
}

/// # Errors
/// `Io` on file errors, `Serialization` if the bytes do not decode
pub fn load_state_dict<P: AsRef<Path>>(path: P) -> Result<StateDict> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    let (state, _): (StateDict, _) = bincode::decode_from_slice(&buffer, config::standard())
        .map_err(|e| TesseraError::Serialization(e.to_string()))?;
    Ok(state)
}

//! Small convolutional neural-network library over three-axis `f32` tensors
//!
//! - [`Tensor`], [`Shape`] and [`Index`] with zero-padded [`View`] windows
//! - layers: [`Conv2d`] (two interchangeable algorithms, see [`ConvAlgo`]),
//!   [`MaxPool2d`], [`Dense`] and [`CrossEntropyOutput`]
//! - [`Sgd`] with L2 weight decay and a minibatch-training [`Network`]
//! - bincode state dicts and TOML training configs
//!
//! ```no_run
//! use tessera::{Activator, Conv2d, CrossEntropyOutput, Dense, MaxPool2d, Network, Padding, Shape};
//!
//! # fn main() -> tessera::Result<()> {
//! let mut net = Network::new(vec![
//!     Box::new(Conv2d::new(Shape::new(28, 28, 1), Shape::new(5, 5, 1), 20, 1, Padding::Valid, Activator::relu())?),
//!     Box::new(MaxPool2d::new(2, 2)?),
//!     Box::new(Dense::new(12 * 12 * 20, 10, Activator::softmax())),
//!     Box::new(CrossEntropyOutput::new()),
//! ]);
//! net.init()?;
//! # Ok(())
//! # }
//! ```

pub mod activator;
pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod math;
pub mod nn;
pub mod shape;
pub mod tensor;

pub use activator::Activator;
pub use config::TrainingConfig;
pub use data::{batch_indices, one_hot};
pub use error::{Result, TesseraError};
pub use io::{StateDict, TensorData, load_state_dict, save_state_dict};
pub use nn::layers::conv::{left_padding, same_padding, top_padding};
pub use nn::optim::{Optimizer, Sgd};
pub use nn::{Conv2d, ConvAlgo, CrossEntropyOutput, Dense, Layer, MaxPool2d, Network, Padding, Sample};
pub use shape::{Axis, Index, IndexIter, Shape};
pub use tensor::{Tensor, View, ViewMut};

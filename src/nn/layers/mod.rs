pub mod conv;
pub mod cross_entropy;
pub mod dense;
pub mod maxpool;

pub use conv::{Conv2d, ConvAlgo, Padding};
pub use cross_entropy::CrossEntropyOutput;
pub use dense::Dense;
pub use maxpool::MaxPool2d;

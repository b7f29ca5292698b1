pub mod batch;
pub mod transforms;

pub use batch::batch_indices;
pub use transforms::one_hot;

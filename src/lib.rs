pub mod error;
pub mod math;
pub mod loss;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::tensor::Tensor;
pub use loss::class_nll::ClassNllCriterion;
pub use loss::config::ClassNllConfig;
pub use loss::criterion::Criterion;
pub use loss::targets::{TargetMode, Targets};

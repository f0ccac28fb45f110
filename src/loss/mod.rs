pub mod class_nll;
pub mod config;
pub mod criterion;
pub mod targets;

pub use class_nll::ClassNllCriterion;
pub use config::ClassNllConfig;
pub use criterion::Criterion;
pub use targets::{TargetMode, Targets};

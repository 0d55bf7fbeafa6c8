//! Linear mixed model: REML variance components and the per-marker test.

pub mod mixed;
pub mod reml;

pub use mixed::{MixedModelGwas, TestPath};
pub use reml::{estimate_variance_components, RemlConfig, RotatedNull, VarianceComponents};

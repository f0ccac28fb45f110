use crate::error::Result;
use crate::math::tensor::Tensor;

/// A loss module mapping (prediction, target) pairs to a scalar training signal.
///
/// `forward` evaluates the loss eagerly; `backward` returns the gradient of
/// that same loss with respect to `input`, shaped like `input`.
pub trait Criterion {
    /// Name used in error messages.
    fn name(&self) -> &'static str;

    fn forward(&self, input: &Tensor, targets: &Tensor) -> Result<f64>;

    fn backward(&self, input: &Tensor, targets: &Tensor) -> Result<Tensor>;
}

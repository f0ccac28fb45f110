use log::{debug, warn};

use crate::error::{Error, Result};
use crate::loss::criterion::Criterion;
use crate::loss::targets::{TargetMode, Targets};
use crate::math::tensor::{element_count, Tensor};

const NAME: &str = "ClassNLLCriterion";

/// Negative log-likelihood over raw class probabilities (not log-probabilities).
///
/// Two modes, chosen from the ranks of the operands:
/// - targets one rank lower than the input hold class indices, and the loss is
///   `mean(-ln(p[i, y_i]))` over every position except the class axis;
/// - targets of equal rank hold distributions, and the loss is the mean over
///   positions of `-sum(t * ln(p))` along the class axis.
///
/// `clip`, when set, clamps probabilities into `[clip, 1 - clip]` before the
/// log. Without it a zero probability yields an infinite loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassNllCriterion {
    clip: Option<f64>,
    classprob_axis: usize,
}

impl Default for ClassNllCriterion {
    fn default() -> Self {
        ClassNllCriterion { clip: None, classprob_axis: 1 }
    }
}

/// Input collapsed to `[rows, classes]`, with one class index per row.
struct SparseView {
    probs: Tensor,
    labels: Vec<usize>,
    classes: usize,
    /// Shape of the input after moving the class axis last.
    moved_shape: Vec<usize>,
}

impl ClassNllCriterion {
    /// `clip` must lie in `[0, 0.5)`. `classprob_axis` is checked against the
    /// input rank on every call.
    pub fn new(clip: Option<f64>, classprob_axis: usize) -> Result<ClassNllCriterion> {
        if let Some(c) = clip {
            if !(0.0..0.5).contains(&c) {
                return Err(Error::InvalidClip(c));
            }
        }
        Ok(ClassNllCriterion { clip, classprob_axis })
    }

    pub fn clip(&self) -> Option<f64> {
        self.clip
    }

    pub fn classprob_axis(&self) -> usize {
        self.classprob_axis
    }

    /// Like [`Criterion::forward`], with the target mode stated by the caller.
    pub fn forward_with(&self, input: &Tensor, targets: Targets) -> Result<f64> {
        let mode = targets.check(NAME, input.rank())?;
        self.loss(input, targets.tensor(), mode)
    }

    /// Like [`Criterion::backward`], with the target mode stated by the caller.
    pub fn backward_with(&self, input: &Tensor, targets: Targets) -> Result<Tensor> {
        let mode = targets.check(NAME, input.rank())?;
        self.gradient(input, targets.tensor(), mode)
    }

    fn loss(&self, input: &Tensor, targets: &Tensor, mode: TargetMode) -> Result<f64> {
        self.check_axis(input)?;
        let loss = match mode {
            TargetMode::Sparse => self.sparse_loss(input, targets)?,
            TargetMode::Dense => self.dense_loss(input, targets)?,
        };
        if !loss.is_finite() {
            warn!("{NAME}: non-finite loss {loss}; consider setting `clip`");
        }
        Ok(loss)
    }

    fn gradient(&self, input: &Tensor, targets: &Tensor, mode: TargetMode) -> Result<Tensor> {
        self.check_axis(input)?;
        match mode {
            TargetMode::Sparse => self.sparse_gradient(input, targets),
            TargetMode::Dense => self.dense_gradient(input, targets),
        }
    }

    fn check_axis(&self, input: &Tensor) -> Result<()> {
        if self.classprob_axis >= input.rank() {
            return Err(Error::AxisOutOfRange { axis: self.classprob_axis, rank: input.rank() });
        }
        Ok(())
    }

    fn clamp(&self, p: f64) -> f64 {
        match self.clip {
            Some(c) if p < c => c,
            Some(c) if p > 1.0 - c => 1.0 - c,
            _ => p,
        }
    }

    /// Whether the clip passes gradient through at `p` (bounds inclusive).
    fn passes(&self, p: f64) -> bool {
        match self.clip {
            Some(c) => p >= c && p <= 1.0 - c,
            None => true,
        }
    }

    fn sparse_view(&self, input: &Tensor, targets: &Tensor) -> Result<SparseView> {
        let axis = self.classprob_axis;
        let mut batch_shape = input.shape().to_vec();
        let classes = batch_shape.remove(axis);
        if targets.shape() != batch_shape.as_slice() {
            return Err(Error::ShapeMismatch { expected: batch_shape, got: targets.shape().to_vec() });
        }

        let rows = targets.len();
        if rows == 0 {
            return Err(Error::EmptyBatch);
        }

        // Class axis last, remaining axes in order: row-major flattening then
        // lines rows up with the flattened targets.
        let moved = input.move_axis_to_last(axis)?;
        let moved_shape = moved.shape().to_vec();
        let probs = moved.reshape(&[rows, classes])?;

        let labels = targets
            .data()
            .iter()
            .enumerate()
            .map(|(index, &value)| class_index(index, value, classes))
            .collect::<Result<Vec<usize>>>()?;

        debug!("{NAME}: sparse targets, {rows} rows over {classes} classes");
        Ok(SparseView { probs, labels, classes, moved_shape })
    }

    fn sparse_loss(&self, input: &Tensor, targets: &Tensor) -> Result<f64> {
        let view = self.sparse_view(input, targets)?;
        let probs = view.probs.data();
        let total: f64 = view
            .labels
            .iter()
            .enumerate()
            .map(|(row, &label)| -self.clamp(probs[row * view.classes + label]).ln())
            .sum();
        Ok(total / view.labels.len() as f64)
    }

    fn sparse_gradient(&self, input: &Tensor, targets: &Tensor) -> Result<Tensor> {
        let view = self.sparse_view(input, targets)?;
        let rows = view.labels.len();
        let probs = view.probs.data();

        let mut grad = vec![0.0; probs.len()];
        for (row, &label) in view.labels.iter().enumerate() {
            let at = row * view.classes + label;
            if self.passes(probs[at]) {
                grad[at] = -1.0 / (rows as f64 * self.clamp(probs[at]));
            }
        }

        Tensor::new(view.moved_shape, grad)?.move_last_axis_to(self.classprob_axis)
    }

    /// Number of positions the dense loss is averaged over.
    fn dense_positions(&self, input: &Tensor, targets: &Tensor) -> Result<usize> {
        if input.shape() != targets.shape() {
            return Err(Error::ShapeMismatch {
                expected: input.shape().to_vec(),
                got: targets.shape().to_vec(),
            });
        }
        let mut batch_shape = input.shape().to_vec();
        batch_shape.remove(self.classprob_axis);
        let positions = element_count(&batch_shape)?;
        if positions == 0 {
            return Err(Error::EmptyBatch);
        }
        debug!("{NAME}: dense targets over {positions} positions");
        Ok(positions)
    }

    fn dense_loss(&self, input: &Tensor, targets: &Tensor) -> Result<f64> {
        self.dense_positions(input, targets)?;
        let log_p = match self.clip {
            Some(c) => input.clip(c, 1.0 - c).ln(),
            None => input.ln(),
        };
        let cross = targets.zip_map(&log_p, |t, lp| t * lp)?.sum_axis(self.classprob_axis)?;
        Ok(cross.map(|x| -x).mean())
    }

    fn dense_gradient(&self, input: &Tensor, targets: &Tensor) -> Result<Tensor> {
        let positions = self.dense_positions(input, targets)? as f64;
        input.zip_map(targets, |p, t| {
            if self.passes(p) {
                -t / (positions * self.clamp(p))
            } else {
                0.0
            }
        })
    }
}

impl Criterion for ClassNllCriterion {
    fn name(&self) -> &'static str {
        NAME
    }

    fn forward(&self, input: &Tensor, targets: &Tensor) -> Result<f64> {
        let mode = TargetMode::infer(NAME, input.rank(), targets.rank())?;
        self.loss(input, targets, mode)
    }

    fn backward(&self, input: &Tensor, targets: &Tensor) -> Result<Tensor> {
        let mode = TargetMode::infer(NAME, input.rank(), targets.rank())?;
        self.gradient(input, targets, mode)
    }
}

/// Truncates a target value toward zero and checks it names a class.
fn class_index(index: usize, value: f64, classes: usize) -> Result<usize> {
    let truncated = value.trunc();
    if truncated.is_finite() && truncated >= 0.0 && truncated < classes as f64 {
        Ok(truncated as usize)
    } else {
        Err(Error::InvalidTargetIndex { index, value, classes })
    }
}

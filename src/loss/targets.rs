use crate::error::{Error, Result};
use crate::math::tensor::Tensor;

/// How a criterion interprets its targets.
///
/// - `Sparse` — one class index per example; targets have one rank less than the input.
/// - `Dense`  — a full (one-hot or soft) distribution; targets have the input's rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    Sparse,
    Dense,
}

impl TargetMode {
    /// Infers the mode from the ranks alone. The target dtype plays no part.
    pub fn infer(criterion: &'static str, input_rank: usize, target_rank: usize) -> Result<TargetMode> {
        if target_rank + 1 == input_rank {
            Ok(TargetMode::Sparse)
        } else if target_rank == input_rank {
            Ok(TargetMode::Dense)
        } else {
            Err(Error::RankMismatch { criterion, input: input_rank, targets: target_rank })
        }
    }

    /// Rank the targets must have for an input of `input_rank`.
    pub fn target_rank(self, input_rank: usize) -> Option<usize> {
        match self {
            TargetMode::Sparse => input_rank.checked_sub(1),
            TargetMode::Dense => Some(input_rank),
        }
    }
}

/// Targets tagged with the caller's stated intent, for when rank inference
/// is not wanted.
#[derive(Debug, Clone, Copy)]
pub enum Targets<'a> {
    Sparse(&'a Tensor),
    Dense(&'a Tensor),
}

impl<'a> Targets<'a> {
    pub fn mode(&self) -> TargetMode {
        match self {
            Targets::Sparse(_) => TargetMode::Sparse,
            Targets::Dense(_) => TargetMode::Dense,
        }
    }

    pub fn tensor(&self) -> &'a Tensor {
        match *self {
            Targets::Sparse(t) | Targets::Dense(t) => t,
        }
    }

    /// Checks the stated mode against the ranks.
    pub fn check(&self, criterion: &'static str, input_rank: usize) -> Result<TargetMode> {
        let target_rank = self.tensor().rank();
        if self.mode().target_rank(input_rank) == Some(target_rank) {
            Ok(self.mode())
        } else {
            Err(Error::RankMismatch { criterion, input: input_rank, targets: target_rank })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_dispatches_on_rank() {
        assert_eq!(TargetMode::infer("c", 2, 1), Ok(TargetMode::Sparse));
        assert_eq!(TargetMode::infer("c", 4, 3), Ok(TargetMode::Sparse));
        assert_eq!(TargetMode::infer("c", 2, 2), Ok(TargetMode::Dense));
        assert_eq!(
            TargetMode::infer("c", 3, 1),
            Err(Error::RankMismatch { criterion: "c", input: 3, targets: 1 })
        );
        assert!(TargetMode::infer("c", 1, 2).is_err());
    }

    #[test]
    fn explicit_targets_must_agree_with_ranks() {
        let t = Tensor::zeros(&[4]).unwrap();
        assert_eq!(Targets::Sparse(&t).check("c", 2), Ok(TargetMode::Sparse));
        assert!(Targets::Dense(&t).check("c", 2).is_err());
        assert_eq!(Targets::Dense(&t).check("c", 1), Ok(TargetMode::Dense));
        assert!(Targets::Sparse(&t).check("c", 0).is_err());
    }
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the tensor primitives and criteria can report.
///
/// All of these are raised synchronously from static shape metadata or
/// configuration, before any loss value is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Targets rank is neither equal to nor exactly one less than the input rank,
    /// or contradicts an explicitly requested target mode.
    #[error("mismatch in dimensionalities of `{criterion}` input ({input}) and targets ({targets})")]
    RankMismatch {
        criterion: &'static str,
        input: usize,
        targets: usize,
    },

    /// Clip value outside `[0, 0.5)`.
    #[error("clip must lie in [0, 0.5), got {0}")]
    InvalidClip(f64),

    /// Axis index not valid for a tensor of this rank.
    #[error("axis {axis} out of range for tensor of rank {rank}")]
    AxisOutOfRange { axis: usize, rank: usize },

    /// Two shapes that must agree do not.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// A sparse target does not name a valid class.
    #[error("target {value} at position {index} is not a class index in 0..{classes}")]
    InvalidTargetIndex {
        index: usize,
        value: f64,
        classes: usize,
    },

    /// Shape does not describe the number of elements supplied.
    #[error("element count mismatch: shape {shape:?} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },

    /// Element count of a shape does not fit a `usize`.
    #[error("shape {shape:?} has more elements than fit in memory")]
    ShapeOverflow { shape: Vec<usize> },

    #[error("cannot reshape {src} elements into shape {dst:?}")]
    ReshapeElementMismatch { src: usize, dst: Vec<usize> },

    #[error("{perm:?} is not a permutation of the axes of a rank {rank} tensor")]
    InvalidPermutation { perm: Vec<usize>, rank: usize },

    /// Rows passed to `Tensor::from_rows` have different lengths.
    #[error("ragged rows: row {row} has {got} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// The loss would be a mean over zero positions.
    #[error("cannot average a loss over an empty batch")]
    EmptyBatch,
}

//! N-dimensional axis reduction over dense row-major tensors.
//!
//! Given a tensor, a set of axes to eliminate and a [`Combiner`] (L1, L2 or
//! product), the engine folds together every element that shares the same
//! coordinates on the kept axes.
//!
//! # Pipeline
//!
//! 1. [`ReducePlan`]: moves the reduced axes (sorted) to the front of the
//!    logical layout, keeps the surviving axes in their original order and
//!    detects the trailing run of axes that did not move.
//! 2. [`gather_into`]: materializes the input in that order, either as one
//!    whole-buffer copy or as a row-major walk over the moved axes copying
//!    one contiguous run per step.
//! 3. [`fold_into`]: treats the permuted buffer as `blocks x block_size` and
//!    folds each column into one output slot.
//!
//! [`ReduceKernel`] ties the three together behind attribute-style
//! configuration ([`ReduceConfig`]).
//!
//! # Example
//!
//! ```rust
//! use axis_reduce::{reduce_l1, DenseTensor};
//!
//! let t = DenseTensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
//! let out = reduce_l1(&t, &[0], false).unwrap();
//! assert_eq!(out.dims(), &[3]);
//! assert_eq!(out.data(), &[5.0, 7.0, 9.0]);
//! ```
//!
//! # Features
//!
//! - `parallel`: split the gather walk and the per-slot fold into disjoint
//!   chunks executed on the rayon thread pool once the input exceeds
//!   [`MIN_PARALLEL_LEN`] elements.

mod combiner;
mod gather;
mod kernel;
mod plan;
mod tensor;
mod threading;

pub use combiner::{fold_into, Combiner};
pub use gather::{gather, gather_into, source_run_strides};
pub use kernel::{reduce_l1, reduce_l2, reduce_prod, ReduceConfig, ReduceKernel};
pub use plan::{BlockGeometry, ReducePlan};
pub use tensor::{total_len, DenseTensor};
pub use threading::MIN_PARALLEL_LEN;

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur while configuring or running a reduction.
#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    /// A reduce axis lies outside `[0, ndim)`.
    #[error("axis {axis} out of range: expected a value in [0, {ndim})")]
    OutOfRangeAxis { axis: i64, ndim: usize },

    /// The same axis was listed more than once.
    #[error("duplicate reduce axis {axis}")]
    DuplicateAxis { axis: usize },

    /// A buffer length does not match the shape it is used with.
    #[error("data length mismatch: expected {expected}, got {actual}")]
    DataLengthMismatch { expected: usize, actual: usize },

    /// Output shape differs from the derived reduction shape.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Operator name does not resolve to a known combiner.
    #[error("unsupported combiner: {0}")]
    UnsupportedCombiner(String),

    /// A slot index lies outside `[0, block_size)`.
    #[error("slot {slot} out of range: expected a value in [0, {block_size})")]
    SlotOutOfRange { slot: usize, block_size: usize },

    /// Product of dimension sizes overflows `usize`.
    #[error("size overflow while computing element count")]
    SizeOverflow,
}

/// Result type for reduction operations.
pub type Result<T> = std::result::Result<T, ReduceError>;

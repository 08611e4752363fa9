//! Reduce plan: axis classification and permutation computation.
//!
//! A [`ReducePlan`] moves every reduced axis to the front of the logical
//! layout (ascending), keeps the surviving axes behind them in their original
//! relative order, and records how much of the tail is already in place.

use crate::tensor::checked_total_len;
use crate::{ReduceError, Result};
use log::trace;

/// Layout of the permuted buffer as `blocks x block_size`.
///
/// Row `i` of the permuted buffer holds one combination of reduced-axis
/// indices; column `j` is one output slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGeometry {
    /// Number of source elements folded into each output slot.
    pub blocks: usize,
    /// Number of output slots.
    pub block_size: usize,
}

impl BlockGeometry {
    /// Total element count covered by the geometry.
    #[inline]
    pub fn total(&self) -> usize {
        self.blocks * self.block_size
    }
}

/// Pre-computed permutation plan for one reduction call.
#[derive(Debug, Clone)]
pub struct ReducePlan {
    dims: Vec<usize>,
    /// Reduced axes, sorted ascending.
    axes: Vec<usize>,
    keep: Vec<bool>,
    perm: Vec<usize>,
    permuted_dims: Vec<usize>,
    n_identity_suffix: usize,
    identity_block_len: usize,
    total: usize,
    geometry: BlockGeometry,
}

impl ReducePlan {
    /// Build a plan from a dimension vector and a set of axes to reduce.
    ///
    /// Axes may be listed in any order. Every axis must lie in `[0, ndim)`
    /// and appear at most once.
    pub fn new(dims: &[usize], axes: &[i64]) -> Result<Self> {
        let ndim = dims.len();

        let mut sorted = Vec::with_capacity(axes.len());
        for &axis in axes {
            if axis < 0 || axis as u64 >= ndim as u64 {
                return Err(ReduceError::OutOfRangeAxis { axis, ndim });
            }
            sorted.push(axis as usize);
        }
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(ReduceError::DuplicateAxis { axis: pair[0] });
        }

        let total = checked_total_len(dims)?;

        let mut keep = vec![true; ndim];
        for &axis in &sorted {
            keep[axis] = false;
        }

        // Reduced axes at the head, survivors after them in original order.
        let perm: Vec<usize> = sorted
            .iter()
            .copied()
            .chain((0..ndim).filter(|&i| keep[i]))
            .collect();
        let permuted_dims: Vec<usize> = perm.iter().map(|&p| dims[p]).collect();

        // Trailing axes that did not move form one contiguous run.
        let n_identity_suffix = perm
            .iter()
            .enumerate()
            .rev()
            .take_while(|&(i, &p)| p == i)
            .count();
        let identity_block_len = checked_total_len(&permuted_dims[ndim - n_identity_suffix..])?;

        // Extents can be zero, so each side of the split is checked on its own.
        let n_reduced = sorted.len();
        let geometry = BlockGeometry {
            blocks: checked_total_len(&permuted_dims[..n_reduced])?,
            block_size: checked_total_len(&permuted_dims[n_reduced..])?,
        };

        let plan = Self {
            dims: dims.to_vec(),
            axes: sorted,
            keep,
            perm,
            permuted_dims,
            n_identity_suffix,
            identity_block_len,
            total,
            geometry,
        };
        trace!(
            "reduce plan: dims={:?} axes={:?} perm={:?} identity_suffix={} run_len={}",
            plan.dims,
            plan.axes,
            plan.perm,
            plan.n_identity_suffix,
            plan.identity_block_len
        );
        Ok(plan)
    }

    /// Original dimension vector.
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Reduced axes in ascending order.
    #[inline]
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    /// `keep[i]` is true when axis `i` survives the reduction.
    #[inline]
    pub fn keep(&self) -> &[bool] {
        &self.keep
    }

    /// Logical axis order: sorted reduced axes, then kept axes.
    #[inline]
    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    /// `permuted_dims[i] == dims[perm[i]]`.
    #[inline]
    pub fn permuted_dims(&self) -> &[usize] {
        &self.permuted_dims
    }

    /// Number of trailing positions with `perm[i] == i`.
    #[inline]
    pub fn n_identity_suffix(&self) -> usize {
        self.n_identity_suffix
    }

    /// Element count of the trailing identity run.
    #[inline]
    pub fn identity_block_len(&self) -> usize {
        self.identity_block_len
    }

    /// Total number of elements in the input.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// True when the input is already laid out in permuted order.
    pub fn is_identity(&self) -> bool {
        self.ndim() < 2 || self.n_identity_suffix == self.ndim()
    }

    /// Number of leading permutation positions that must be walked.
    #[inline]
    pub(crate) fn n_moved(&self) -> usize {
        self.ndim() - self.n_identity_suffix
    }

    /// True reduction geometry from the kept/reduced split.
    ///
    /// `block_size` is the product of kept-axis sizes, so it stays well
    /// defined when a reduced axis has extent zero.
    #[inline]
    pub fn geometry(&self) -> BlockGeometry {
        self.geometry
    }

    /// Output shape: kept axes in original order, reduced axes dropped or
    /// replaced by `1` when `keepdims` is set.
    pub fn output_dims(&self, keepdims: bool) -> Vec<usize> {
        self.dims
            .iter()
            .zip(self.keep.iter())
            .filter_map(|(&d, &kept)| match (kept, keepdims) {
                (true, _) => Some(d),
                (false, true) => Some(1),
                (false, false) => None,
            })
            .collect()
    }
}

//! Blocked gather copy: materialize the input in permuted order.
//!
//! The trailing identity run of a [`ReducePlan`] is already contiguous in the
//! source, so the walk only iterates the moved axes and copies one run of
//! `identity_block_len` elements per step.

use crate::plan::ReducePlan;
use crate::threading::use_sequential_path;
use crate::{ReduceError, Result};
use log::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Source strides of the moved axes, in units of identity runs.
///
/// Entry `i` belongs to permutation position `i` and equals the product of
/// the original extents of the moved axes that follow `perm[i]` in memory.
/// The moved positions are a permutation of the leading original axes, so
/// only those extents participate.
pub fn source_run_strides(plan: &ReducePlan) -> Vec<usize> {
    let n = plan.n_moved();
    let dims = plan.dims();
    plan.perm()[..n]
        .iter()
        .map(|&axis| dims[axis + 1..n].iter().product())
        .collect()
}

/// Row-major odometer over the moved axes tracking the source run offset.
struct RunCursor<'a> {
    dims: &'a [usize],
    strides: &'a [usize],
    idx: Vec<usize>,
    offset: usize,
}

impl<'a> RunCursor<'a> {
    fn new(dims: &'a [usize], strides: &'a [usize]) -> Self {
        Self {
            dims,
            strides,
            idx: vec![0; dims.len()],
            offset: 0,
        }
    }

    #[inline]
    fn advance(&mut self) {
        for i in (0..self.dims.len()).rev() {
            self.idx[i] += 1;
            self.offset += self.strides[i];
            if self.idx[i] < self.dims[i] {
                return;
            }
            self.offset -= self.strides[i] * self.dims[i];
            self.idx[i] = 0;
        }
    }
}

/// Copy `src` into `scratch` in the order given by `plan.perm()`.
///
/// Both buffers must hold exactly `plan.total()` elements.
pub fn gather_into<T>(src: &[T], plan: &ReducePlan, scratch: &mut [T]) -> Result<()>
where
    T: Copy + Send + Sync,
{
    let total = plan.total();
    for len in [src.len(), scratch.len()] {
        if len != total {
            return Err(ReduceError::DataLengthMismatch {
                expected: total,
                actual: len,
            });
        }
    }

    if plan.is_identity() {
        debug!("gather: identity layout, copying {} elements", total);
        scratch.copy_from_slice(src);
        return Ok(());
    }
    if total == 0 {
        return Ok(());
    }

    let run = plan.identity_block_len();
    let n = plan.n_moved();
    let moved_dims = &plan.permuted_dims()[..n];
    let strides = source_run_strides(plan);
    debug!("gather: walking {} moved axes in runs of {} elements", n, run);

    if !use_sequential_path(total) {
        #[cfg(feature = "parallel")]
        {
            gather_runs_parallel(src, scratch, moved_dims, &strides, run);
            return Ok(());
        }
    }

    let mut cursor = RunCursor::new(moved_dims, &strides);
    if run == 1 {
        for dst in scratch.iter_mut() {
            *dst = src[cursor.offset];
            cursor.advance();
        }
    } else {
        for dst in scratch.chunks_exact_mut(run) {
            let from = cursor.offset * run;
            dst.copy_from_slice(&src[from..from + run]);
            cursor.advance();
        }
    }
    Ok(())
}

/// Allocate a scratch buffer and gather `src` into it.
pub fn gather<T>(src: &[T], plan: &ReducePlan) -> Result<Vec<T>>
where
    T: Copy + Default + Send + Sync,
{
    let mut scratch = vec![T::default(); plan.total()];
    gather_into(src, plan, &mut scratch)?;
    Ok(scratch)
}

#[cfg(feature = "parallel")]
fn gather_runs_parallel<T>(
    src: &[T],
    scratch: &mut [T],
    moved_dims: &[usize],
    strides: &[usize],
    run: usize,
) where
    T: Copy + Send + Sync,
{
    scratch
        .par_chunks_mut(run)
        .enumerate()
        .for_each(|(index, dst)| {
            let mut rem = index;
            let mut from = 0usize;
            for (&d, &s) in moved_dims.iter().zip(strides.iter()).rev() {
                from += (rem % d) * s;
                rem /= d;
            }
            let from = from * run;
            dst.copy_from_slice(&src[from..from + run]);
        });
}

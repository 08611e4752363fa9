//! Dense row-major tensor storage.
//!
//! [`DenseTensor`] stands in for the framework-owned tensor: an ordered
//! dimension vector plus a contiguous row-major buffer. The reduction engine
//! only ever borrows its data for reading and writes into a separately
//! allocated output tensor.

use std::ops::Index;
use std::sync::Arc;

use crate::{ReduceError, Result};

/// Total number of elements described by `dims` (`1` for rank 0).
#[inline]
pub fn total_len(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Same as [`total_len`] but reports overflow instead of wrapping.
pub(crate) fn checked_total_len(dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(ReduceError::SizeOverflow)
}

/// Owned dense tensor in row-major layout.
pub struct DenseTensor<T> {
    data: Vec<T>,
    dims: Arc<[usize]>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for DenseTensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseTensor")
            .field("dims", &self.dims)
            .field("data", &self.data)
            .finish()
    }
}

impl<T: Clone> Clone for DenseTensor<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            dims: self.dims.clone(),
        }
    }
}

impl<T: Clone + Default> DenseTensor<T> {
    /// Create a tensor filled with `T::default()`.
    ///
    /// Fails with [`ReduceError::SizeOverflow`] when the element count does
    /// not fit in `usize`.
    pub fn try_zeros(dims: &[usize]) -> Result<Self> {
        let total = checked_total_len(dims)?;
        Ok(Self {
            data: vec![T::default(); total],
            dims: Arc::from(dims),
        })
    }

    /// Create a tensor filled with `T::default()`.
    ///
    /// # Panics
    ///
    /// Panics if the element count overflows `usize`; use
    /// [`try_zeros`](Self::try_zeros) to get an error instead.
    pub fn zeros(dims: &[usize]) -> Self {
        match Self::try_zeros(dims) {
            Ok(t) => t,
            Err(err) => panic!("DenseTensor::zeros({dims:?}): {err}"),
        }
    }
}

impl<T> DenseTensor<T> {
    /// Wrap an existing buffer.
    ///
    /// Fails with [`ReduceError::DataLengthMismatch`] when the buffer length
    /// disagrees with the product of `dims`.
    pub fn from_vec(data: Vec<T>, dims: &[usize]) -> Result<Self> {
        let expected = checked_total_len(dims)?;
        if data.len() != expected {
            return Err(ReduceError::DataLengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            dims: Arc::from(dims),
        })
    }

    /// Create a tensor with values produced by a function.
    ///
    /// The function is called with indices in row-major iteration order.
    pub fn from_fn_row_major(dims: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let total = total_len(dims);
        let rank = dims.len();
        let mut data = Vec::with_capacity(total);
        let mut idx = vec![0usize; rank];
        for _ in 0..total {
            data.push(f(&idx));
            for d in (0..rank).rev() {
                idx[d] += 1;
                if idx[d] < dims[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        Self {
            data,
            dims: Arc::from(dims),
        }
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the tensor and return its buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    fn flat_index(&self, indices: &[usize]) -> usize {
        assert_eq!(indices.len(), self.dims.len());
        let mut flat = 0usize;
        for (&index, &dim) in indices.iter().zip(self.dims.iter()) {
            assert!(index < dim);
            flat = flat * dim + index;
        }
        flat
    }
}

impl<T: Copy> DenseTensor<T> {
    /// Get an element by multi-dimensional index.
    pub fn get(&self, indices: &[usize]) -> T {
        self.data[self.flat_index(indices)]
    }
}

impl<T> Index<&[usize]> for DenseTensor<T> {
    type Output = T;

    fn index(&self, indices: &[usize]) -> &T {
        &self.data[self.flat_index(indices)]
    }
}

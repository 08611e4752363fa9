//! Operator boundary: configured reduction kernels.
//!
//! A [`ReduceKernel`] pairs a [`Combiner`] with attribute-style
//! configuration ([`ReduceConfig`]) and runs the plan -> gather -> fold
//! pipeline on one input tensor per call. Every configuration error is
//! raised while planning, before the scratch buffer or the output tensor is
//! allocated.

use num_traits::Float;

use crate::combiner::{fold_into, Combiner};
use crate::gather::gather_into;
use crate::plan::ReducePlan;
use crate::tensor::DenseTensor;
use crate::{ReduceError, Result};
use log::debug;

/// Reduction attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceConfig {
    /// Axes to reduce. `None` reduces every axis of the input; an empty
    /// list reduces nothing and returns the input unchanged.
    pub axes: Option<Vec<i64>>,
    /// Keep reduced axes as size-1 dimensions instead of dropping them.
    pub keepdims: bool,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            axes: None,
            keepdims: true,
        }
    }
}

impl ReduceConfig {
    /// Reduce over every axis.
    pub fn all_axes() -> Self {
        Self::default()
    }

    pub fn with_axes(mut self, axes: impl Into<Vec<i64>>) -> Self {
        self.axes = Some(axes.into());
        self
    }

    pub fn with_keepdims(mut self, keepdims: bool) -> Self {
        self.keepdims = keepdims;
        self
    }

    /// Resolve the axis list against a concrete rank.
    fn resolve_axes(&self, ndim: usize) -> Vec<i64> {
        match &self.axes {
            Some(axes) => axes.clone(),
            None => (0..ndim as i64).collect(),
        }
    }
}

/// A reduction operator: one combiner plus its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceKernel {
    combiner: Combiner,
    config: ReduceConfig,
}

impl ReduceKernel {
    pub fn new(combiner: Combiner, config: ReduceConfig) -> Self {
        debug!("{}: axes={:?} keepdims={}", combiner, config.axes, config.keepdims);
        Self { combiner, config }
    }

    /// Resolve an operator name (`ReduceL1`, `ReduceL2`, `ReduceProd`).
    pub fn from_op_name(name: &str, config: ReduceConfig) -> Result<Self> {
        Ok(Self::new(name.parse()?, config))
    }

    #[inline]
    pub fn combiner(&self) -> Combiner {
        self.combiner
    }

    #[inline]
    pub fn config(&self) -> &ReduceConfig {
        &self.config
    }

    /// Plan the reduction of an input with dimensions `dims`.
    pub fn plan(&self, dims: &[usize]) -> Result<ReducePlan> {
        ReducePlan::new(dims, &self.config.resolve_axes(dims.len()))
    }

    /// Shape of the tensor [`compute`](Self::compute) returns for `dims`.
    pub fn output_dims(&self, dims: &[usize]) -> Result<Vec<usize>> {
        Ok(self.plan(dims)?.output_dims(self.config.keepdims))
    }

    /// Reduce `input` into a freshly allocated tensor.
    pub fn compute<T>(&self, input: &DenseTensor<T>) -> Result<DenseTensor<T>>
    where
        T: Float + Default + Send + Sync,
    {
        let plan = self.plan(input.dims())?;
        let mut output = DenseTensor::try_zeros(&plan.output_dims(self.config.keepdims))?;
        self.run(input, &plan, output.data_mut())?;
        Ok(output)
    }

    /// Reduce `input` into a caller-allocated `output`.
    ///
    /// `output` must already have the derived shape; nothing is written when
    /// it does not.
    pub fn compute_into<T>(
        &self,
        input: &DenseTensor<T>,
        output: &mut DenseTensor<T>,
    ) -> Result<()>
    where
        T: Float + Default + Send + Sync,
    {
        let plan = self.plan(input.dims())?;
        let expected = plan.output_dims(self.config.keepdims);
        if output.dims() != expected.as_slice() {
            return Err(ReduceError::ShapeMismatch(output.dims().to_vec(), expected));
        }
        self.run(input, &plan, output.data_mut())
    }

    fn run<T>(&self, input: &DenseTensor<T>, plan: &ReducePlan, out: &mut [T]) -> Result<()>
    where
        T: Float + Default + Send + Sync,
    {
        let geometry = plan.geometry();
        debug!(
            "{}: dims={:?} -> blocks={} block_size={}",
            self.combiner,
            plan.dims(),
            geometry.blocks,
            geometry.block_size
        );

        // Identity layout needs no scratch copy; the input is read in place.
        if plan.is_identity() {
            return fold_into(input.data(), geometry, self.combiner, out);
        }
        let mut scratch = vec![T::default(); plan.total()];
        gather_into(input.data(), plan, &mut scratch)?;
        fold_into(&scratch, geometry, self.combiner, out)
    }
}

/// Sum of absolute values over `axes`.
pub fn reduce_l1<T>(input: &DenseTensor<T>, axes: &[i64], keepdims: bool) -> Result<DenseTensor<T>>
where
    T: Float + Default + Send + Sync,
{
    reduce_with(Combiner::L1, input, axes, keepdims)
}

/// Euclidean norm over `axes`.
pub fn reduce_l2<T>(input: &DenseTensor<T>, axes: &[i64], keepdims: bool) -> Result<DenseTensor<T>>
where
    T: Float + Default + Send + Sync,
{
    reduce_with(Combiner::L2, input, axes, keepdims)
}

/// Product over `axes`.
pub fn reduce_prod<T>(
    input: &DenseTensor<T>,
    axes: &[i64],
    keepdims: bool,
) -> Result<DenseTensor<T>>
where
    T: Float + Default + Send + Sync,
{
    reduce_with(Combiner::Prod, input, axes, keepdims)
}

fn reduce_with<T>(
    combiner: Combiner,
    input: &DenseTensor<T>,
    axes: &[i64],
    keepdims: bool,
) -> Result<DenseTensor<T>>
where
    T: Float + Default + Send + Sync,
{
    let config = ReduceConfig::default().with_axes(axes).with_keepdims(keepdims);
    ReduceKernel::new(combiner, config).compute(input)
}

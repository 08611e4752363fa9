//! Reduction combiners and the per-slot fold over a permuted buffer.

use std::fmt;
use std::str::FromStr;

use num_traits::Float;

use crate::plan::BlockGeometry;
use crate::threading::use_sequential_path;
use crate::{ReduceError, Result};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fold function applied to every group of elements sharing kept-axis
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combiner {
    /// Sum of absolute values.
    L1,
    /// Euclidean norm, `sqrt(sum(x^2))`.
    L2,
    /// Running product starting at one.
    Prod,
}

impl Combiner {
    pub const ALL: [Combiner; 3] = [Combiner::L1, Combiner::L2, Combiner::Prod];

    /// Operator name this combiner is registered under.
    pub fn op_name(self) -> &'static str {
        match self {
            Combiner::L1 => "ReduceL1",
            Combiner::L2 => "ReduceL2",
            Combiner::Prod => "ReduceProd",
        }
    }

    #[inline]
    pub fn init<T: Float>(self) -> T {
        match self {
            Combiner::L1 | Combiner::L2 => T::zero(),
            Combiner::Prod => T::one(),
        }
    }

    #[inline]
    pub fn accumulate<T: Float>(self, acc: T, x: T) -> T {
        match self {
            Combiner::L1 => acc + x.abs(),
            Combiner::L2 => acc + x * x,
            Combiner::Prod => acc * x,
        }
    }

    #[inline]
    pub fn finish<T: Float>(self, acc: T) -> T {
        match self {
            Combiner::L2 => acc.sqrt(),
            Combiner::L1 | Combiner::Prod => acc,
        }
    }

    /// Fold output slot `j`: `scratch[i * block_size + j]` for every `i`.
    ///
    /// Fails with [`ReduceError::DataLengthMismatch`] when `scratch` does not
    /// hold exactly `blocks * block_size` elements and with
    /// [`ReduceError::SlotOutOfRange`] when `j >= block_size`.
    pub fn fold_slot<T: Float>(
        self,
        scratch: &[T],
        geometry: BlockGeometry,
        j: usize,
    ) -> Result<T> {
        check_scratch_len(scratch, geometry)?;
        if j >= geometry.block_size {
            return Err(ReduceError::SlotOutOfRange {
                slot: j,
                block_size: geometry.block_size,
            });
        }
        let acc = scratch
            .chunks_exact(geometry.block_size)
            .fold(self.init(), |acc, row| self.accumulate(acc, row[j]));
        Ok(self.finish(acc))
    }
}

impl fmt::Display for Combiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op_name())
    }
}

impl FromStr for Combiner {
    type Err = ReduceError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.strip_prefix("reduce").unwrap_or(lower.as_str()) {
            "l1" => Ok(Combiner::L1),
            "l2" => Ok(Combiner::L2),
            "prod" => Ok(Combiner::Prod),
            _ => Err(ReduceError::UnsupportedCombiner(s.to_string())),
        }
    }
}

/// Fold a `blocks x block_size` buffer into `block_size` output slots.
///
/// Slots are written in increasing order. Within a slot, rows are folded in
/// increasing `i`, so results match [`Combiner::fold_slot`] bit for bit.
pub fn fold_into<T>(
    scratch: &[T],
    geometry: BlockGeometry,
    combiner: Combiner,
    out: &mut [T],
) -> Result<()>
where
    T: Float + Send + Sync,
{
    check_scratch_len(scratch, geometry)?;
    if out.len() != geometry.block_size {
        return Err(ReduceError::DataLengthMismatch {
            expected: geometry.block_size,
            actual: out.len(),
        });
    }

    if !use_sequential_path(geometry.total()) {
        #[cfg(feature = "parallel")]
        {
            let chunk = crate::threading::slot_chunk_len(geometry.block_size, geometry.blocks);
            out.par_chunks_mut(chunk)
                .enumerate()
                .for_each(|(c, slots)| {
                    fold_chunk(combiner, scratch, geometry.block_size, c * chunk, slots)
                });
            return Ok(());
        }
    }

    fold_chunk(combiner, scratch, geometry.block_size, 0, out);
    Ok(())
}

fn check_scratch_len<T>(scratch: &[T], geometry: BlockGeometry) -> Result<()> {
    if scratch.len() != geometry.total() {
        return Err(ReduceError::DataLengthMismatch {
            expected: geometry.total(),
            actual: scratch.len(),
        });
    }
    Ok(())
}

/// Fold the slots `first..first + out.len()`.
///
/// The combiner is matched once here; each arm instantiates the row loop
/// with a constant combiner so its per-element match folds away.
fn fold_chunk<T: Float>(
    combiner: Combiner,
    scratch: &[T],
    block_size: usize,
    first: usize,
    out: &mut [T],
) {
    match combiner {
        Combiner::L1 => fold_rows(Combiner::L1, scratch, block_size, first, out),
        Combiner::L2 => fold_rows(Combiner::L2, scratch, block_size, first, out),
        Combiner::Prod => fold_rows(Combiner::Prod, scratch, block_size, first, out),
    }
}

#[inline(always)]
fn fold_rows<T: Float>(
    combiner: Combiner,
    scratch: &[T],
    block_size: usize,
    first: usize,
    out: &mut [T],
) {
    out.fill(combiner.init());
    if block_size != 0 {
        let len = out.len();
        for row in scratch.chunks_exact(block_size) {
            for (acc, &x) in out.iter_mut().zip(&row[first..first + len]) {
                *acc = combiner.accumulate(*acc, x);
            }
        }
    }
    for v in out.iter_mut() {
        *v = combiner.finish(*v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // [[1, 2, 3], [4, 5, 6]] folded over the leading axis.
    const SCRATCH: [f32; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    const GEOM: BlockGeometry = BlockGeometry {
        blocks: 2,
        block_size: 3,
    };

    fn fold(combiner: Combiner) -> Vec<f32> {
        let mut out = vec![0.0f32; GEOM.block_size];
        fold_into(&SCRATCH, GEOM, combiner, &mut out).unwrap();
        out
    }

    #[test]
    fn test_fold_l1() {
        assert_eq!(fold(Combiner::L1), vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_fold_l2() {
        let out = fold(Combiner::L2);
        for (got, sq) in out.iter().zip([17.0f32, 29.0, 45.0]) {
            assert_relative_eq!(*got, sq.sqrt(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_fold_prod() {
        assert_eq!(fold(Combiner::Prod), vec![4.0, 10.0, 18.0]);
    }

    #[test]
    fn test_fold_into_matches_fold_slot() {
        let scratch: Vec<f32> = (0..60).map(|i| (i as f32 * 0.37).sin()).collect();
        let geom = BlockGeometry {
            blocks: 5,
            block_size: 12,
        };
        for combiner in Combiner::ALL {
            let mut out = vec![0.0f32; geom.block_size];
            fold_into(&scratch, geom, combiner, &mut out).unwrap();
            for (j, &got) in out.iter().enumerate() {
                let want = combiner.fold_slot(&scratch, geom, j).unwrap();
                assert_eq!(got, want, "{combiner} slot {j}");
            }
        }
    }

    #[test]
    fn test_fold_slot_rejects_bad_slot_and_scratch() {
        assert!(matches!(
            Combiner::L1.fold_slot(&SCRATCH, GEOM, 3),
            Err(ReduceError::SlotOutOfRange {
                slot: 3,
                block_size: 3
            })
        ));
        assert!(matches!(
            Combiner::Prod.fold_slot(&SCRATCH[..5], GEOM, 0),
            Err(ReduceError::DataLengthMismatch {
                expected: 6,
                actual: 5
            })
        ));
        assert_eq!(Combiner::Prod.fold_slot(&SCRATCH, GEOM, 2).unwrap(), 18.0);
    }

    #[test]
    fn test_fold_matches_combiner_steps() {
        let rows: [[f64; 2]; 3] = [[-1.5, 2.0], [0.5, -3.0], [4.0, 0.25]];
        let scratch: Vec<f64> = rows.iter().flatten().copied().collect();
        let geom = BlockGeometry {
            blocks: 3,
            block_size: 2,
        };
        for combiner in Combiner::ALL {
            let mut out = [0.0f64; 2];
            fold_into(&scratch, geom, combiner, &mut out).unwrap();
            for (j, &got) in out.iter().enumerate() {
                let acc = rows
                    .iter()
                    .fold(combiner.init(), |acc, row| combiner.accumulate(acc, row[j]));
                assert_eq!(got, combiner.finish(acc), "{combiner} slot {j}");
            }
        }
    }

    #[test]
    fn test_fold_l1_negative_values() {
        let mut out = [0.0f64; 2];
        let geom = BlockGeometry {
            blocks: 2,
            block_size: 2,
        };
        fold_into(&[-1.0, 2.0, -3.0, -4.0], geom, Combiner::L1, &mut out).unwrap();
        assert_eq!(out, [4.0, 6.0]);
    }

    #[test]
    fn test_fold_empty_blocks_yields_init() {
        let geom = BlockGeometry {
            blocks: 0,
            block_size: 3,
        };
        let mut out = [9.0f32; 3];
        fold_into(&[], geom, Combiner::Prod, &mut out).unwrap();
        assert_eq!(out, [1.0, 1.0, 1.0]);
        fold_into(&[], geom, Combiner::L2, &mut out).unwrap();
        assert_eq!(out, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_fold_nan_propagates() {
        let geom = BlockGeometry {
            blocks: 2,
            block_size: 1,
        };
        let mut out = [0.0f32; 1];
        for combiner in Combiner::ALL {
            fold_into(&[f32::NAN, 1.0], geom, combiner, &mut out).unwrap();
            assert!(out[0].is_nan(), "{combiner}");
        }
    }

    #[test]
    fn test_fold_output_length_mismatch() {
        let mut out = vec![0.0f32; 2];
        let err = fold_into(&SCRATCH, GEOM, Combiner::L1, &mut out).unwrap_err();
        assert!(matches!(
            err,
            ReduceError::DataLengthMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_combiner_from_str() {
        assert_eq!("ReduceL1".parse::<Combiner>().unwrap(), Combiner::L1);
        assert_eq!("l2".parse::<Combiner>().unwrap(), Combiner::L2);
        assert_eq!("PROD".parse::<Combiner>().unwrap(), Combiner::Prod);
        let err = "ReduceMean".parse::<Combiner>().unwrap_err();
        assert!(matches!(err, ReduceError::UnsupportedCombiner(ref s) if s == "ReduceMean"));
    }

    #[test]
    fn test_combiner_display_roundtrip() {
        for combiner in Combiner::ALL {
            assert_eq!(combiner.to_string().parse::<Combiner>().unwrap(), combiner);
        }
    }
}

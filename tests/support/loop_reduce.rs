//! Reference reduction by direct index arithmetic, with no permutation.
//!
//! Every input element is visited in row-major order and accumulated into
//! the output slot addressed by its kept-axis coordinates.

use axis_reduce::Combiner;

pub struct LoopResult {
    pub dims: Vec<usize>,
    pub data: Vec<f32>,
}

pub fn loop_reduce(
    data: &[f32],
    dims: &[usize],
    axes: &[usize],
    combiner: Combiner,
    keepdims: bool,
) -> LoopResult {
    let rank = dims.len();
    let reduced: Vec<bool> = (0..rank).map(|i| axes.contains(&i)).collect();

    let mut out_dims = Vec::new();
    let mut kept_dims = Vec::new();
    for i in 0..rank {
        if reduced[i] {
            if keepdims {
                out_dims.push(1);
            }
        } else {
            out_dims.push(dims[i]);
            kept_dims.push(dims[i]);
        }
    }
    let out_len: usize = kept_dims.iter().product();

    let init = match combiner {
        Combiner::L1 | Combiner::L2 => 0.0f32,
        Combiner::Prod => 1.0f32,
    };
    let mut acc = vec![init; out_len];

    let mut idx = vec![0usize; rank];
    for &x in data {
        let mut slot = 0usize;
        for i in 0..rank {
            if !reduced[i] {
                slot = slot * dims[i] + idx[i];
            }
        }
        acc[slot] = match combiner {
            Combiner::L1 => acc[slot] + x.abs(),
            Combiner::L2 => acc[slot] + x * x,
            Combiner::Prod => acc[slot] * x,
        };

        for d in (0..rank).rev() {
            idx[d] += 1;
            if idx[d] < dims[d] {
                break;
            }
            idx[d] = 0;
        }
    }

    if combiner == Combiner::L2 {
        for v in acc.iter_mut() {
            *v = v.sqrt();
        }
    }

    LoopResult {
        dims: out_dims,
        data: acc,
    }
}

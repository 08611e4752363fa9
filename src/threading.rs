//! Sequential/parallel path selection.
//!
//! The gather walk and the per-slot fold are both embarrassingly parallel.
//! With the `parallel` feature enabled, work above [`MIN_PARALLEL_LEN`]
//! elements is split into disjoint chunks of the destination buffer and
//! handed to rayon; every writer owns its own slots, so nothing is shared
//! mutably across threads.

/// Minimum element count before the parallel paths engage.
pub const MIN_PARALLEL_LEN: usize = 1 << 15; // 32768

/// True when `total` elements should be processed on the calling thread.
#[inline]
pub(crate) fn use_sequential_path(total: usize) -> bool {
    #[cfg(feature = "parallel")]
    {
        total <= MIN_PARALLEL_LEN || rayon::current_num_threads() <= 1
    }
    #[cfg(not(feature = "parallel"))]
    {
        let _ = total;
        true
    }
}

/// Number of output slots per parallel task.
///
/// Chunks cover at least `MIN_PARALLEL_LEN` source elements each so a task
/// is never smaller than a sequential call would be.
#[cfg(feature = "parallel")]
pub(crate) fn slot_chunk_len(block_size: usize, blocks: usize) -> usize {
    let nthreads = rayon::current_num_threads().max(1);
    let by_threads = block_size.div_ceil(nthreads * 4);
    let by_work = MIN_PARALLEL_LEN.div_ceil(blocks.max(1));
    by_threads.max(by_work).max(1)
}

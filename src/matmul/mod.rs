//! The matmul driver (spec §4.4): quantize activations into the weight
//! format's companion, then invoke the paired `VecDot` kernel per output
//! cell. Mirrors the teacher's `ops::matmul` dispatch-by-tensor-type shape,
//! generalized from a fixed Q4K/Q6K pair to every registered `QuantFormat`
//! and a caller-supplied executor instead of a single calling thread.

use std::sync::OnceLock;

use crate::error::{CoreError, CoreResult};
use crate::pool::BufferPool;
use crate::quant::{q4_0, q8_0, vecdot, QuantFormat};

/// Process-wide free-list for matmul's activation scratch buffer (spec
/// §4.4/§5). Shared across calls so repeated matmul invocations at a
/// recurring M/K reuse the same size-classed allocation instead of
/// round-tripping the system allocator every time.
static ACTIVATION_SCRATCH_POOL: OnceLock<BufferPool> = OnceLock::new();

fn activation_scratch_pool() -> &'static BufferPool {
    ACTIVATION_SCRATCH_POOL.get_or_init(BufferPool::new)
}

/// Work-distribution hook (spec §5/§6): `parallel_for(total, body)` hands
/// `body` disjoint `[start, end)` row ranges to run, possibly concurrently,
/// and returns only once every body has completed. `total` rows fewer than
/// the executor cares to split is a valid reason to run everything on the
/// calling thread.
pub trait Executor {
    fn parallel_for(&self, total: usize, body: &(dyn Fn(usize, usize) + Sync));
}

/// Runs every row on the calling thread. The default when no executor is
/// supplied; also what a single-threaded embedding calls for.
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn parallel_for(&self, total: usize, body: &(dyn Fn(usize, usize) + Sync)) {
        body(0, total);
    }
}

fn vecdot_for(qt: QuantFormat) -> CoreResult<fn(&[u8], &[u8]) -> CoreResult<f32>> {
    match qt {
        QuantFormat::Q8_0 => Ok(vecdot::vecdot_q8_0_q8_0),
        QuantFormat::Q4_0 => Ok(vecdot::vecdot_q4_0_q8_0),
        QuantFormat::IQ4NL => Ok(vecdot::vecdot_iq4_nl_q8_0),
        _ => Err(CoreError::UnsupportedFormat { format: qt.name() }),
    }
}

fn quantize_activation_row(qt: QuantFormat, row: &[f32], out: &mut [u8]) -> CoreResult<()> {
    // Every Tier-1 weight format's companion is Q8_0 (spec §3); the
    // per-format branch exists so a future companion format only needs a
    // new arm here, not a change to the row loop below.
    match qt.activation_companion() {
        Some(QuantFormat::Q8_0) => q8_0::quantize(row, out),
        _ => Err(CoreError::UnsupportedFormat { format: qt.name() }),
    }
}

/// `MatMul(A: M·K dense f32, W: N·K block-quantized, out: M·N dense f32)`
/// (spec §4.4). `weight` holds the `N` rows back-to-back, each
/// `K / qt.values_per_block() * qt.bytes_per_block()` bytes long.
///
/// Activations are quantized once into a scratch buffer sized for all `M`
/// rows, then the executor distributes the `M·N` output cells by row.
pub fn matmul(
    activations: &[f32],
    m: usize,
    k: usize,
    weight: &[u8],
    n: usize,
    qt: QuantFormat,
    out: &mut [f32],
    executor: &dyn Executor,
) -> CoreResult<()> {
    let vecdot_fn = vecdot_for(qt)?;

    let values_per_block = qt.values_per_block();
    if k % values_per_block != 0 {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "K={k} is not a multiple of {}'s block size {values_per_block}",
                qt.name()
            ),
        });
    }
    let nblocks = k / values_per_block;
    let weight_row_bytes = nblocks * qt.bytes_per_block();
    let act_row_bytes = nblocks * q8_0::BLOCK_BYTES;

    if activations.len() != m * k {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "activations length {} does not match M*K = {}",
                activations.len(),
                m * k
            ),
        });
    }
    if weight.len() != n * weight_row_bytes {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "weight buffer length {} does not match N*weight_row_bytes = {}",
                weight.len(),
                n * weight_row_bytes
            ),
        });
    }
    if out.len() != m * n {
        return Err(CoreError::DimensionMismatch {
            detail: format!("output buffer length {} does not match M*N = {}", out.len(), m * n),
        });
    }

    // Activation scratch buffer: drawn from the size-classed pool (spec
    // §4.4/§5) and released back to it on every exit path, including on
    // error, via `PooledBuffer`'s `Drop` — no explicit scoped guard needed.
    let mut act_q = activation_scratch_pool().acquire(m * act_row_bytes);
    for row in 0..m {
        let src = &activations[row * k..(row + 1) * k];
        let dst = &mut act_q[row * act_row_bytes..(row + 1) * act_row_bytes];
        quantize_activation_row(qt, src, dst)?;
    }

    let body = |start: usize, end: usize| {
        for row in start..end {
            let a_row = &act_q[row * act_row_bytes..(row + 1) * act_row_bytes];
            for col in 0..n {
                let w_row = &weight[col * weight_row_bytes..(col + 1) * weight_row_bytes];
                // VecDot kernels only fail on a malformed buffer length,
                // which dimensions checked above rule out; any residual
                // error here would be a driver bug, not a caller error.
                let value = vecdot_fn(w_row, a_row).expect("row/weight buffers sized by this driver");
                out[row * n + col] = value;
            }
        }
    };
    executor.parallel_for(m, &body);
    Ok(())
}

/// Naive dense matmul against already-dequantized weights, used by the
/// matmul-equivalence property tests (spec §8) as the ground truth
/// `MatMul(A, W, qt)` is checked against.
pub fn matmul_dense_reference(activations: &[f32], m: usize, k: usize, weight_dequant: &[f32], n: usize, out: &mut [f32]) {
    for row in 0..m {
        for col in 0..n {
            let mut acc = 0.0f32;
            for i in 0..k {
                acc += activations[row * k + i] * weight_dequant[col * k + i];
            }
            out[row * n + col] = acc;
        }
    }
}

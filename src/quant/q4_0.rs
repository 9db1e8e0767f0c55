//! Q4_0: 4-bit symmetric block quantization, split-nibble layout. 18-byte
//! block = f16 scale `d` + 16 nibble-packed bytes (spec §3/§4.3.2).

use crate::dispatch::KernelTable;
use crate::error::{CoreError, CoreResult};
use crate::half_precision::decode_scale_f16;
use crate::quant::{high_nibble, low_nibble};

pub const VALUES_PER_BLOCK: usize = 32;
pub const BLOCK_BYTES: usize = 18; // 2 (f16 d) + 16 (nibble-packed)

fn num_blocks(byte_len: usize) -> CoreResult<usize> {
    if byte_len % BLOCK_BYTES != 0 {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "Q4_0 input length {byte_len} is not a multiple of the {BLOCK_BYTES}-byte block size"
            ),
        });
    }
    Ok(byte_len / BLOCK_BYTES)
}

/// `out[b*32 + i] = d_b*(lo(qs[i]) - 8)` for `i` in `0..16`;
/// `out[b*32 + 16 + i] = d_b*(hi(qs[i]) - 8)` for `i` in `0..16`.
pub fn dequantize_base(bytes: &[u8], out: &mut [f32]) -> CoreResult<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    let nblocks = num_blocks(bytes.len())?;
    for b in 0..nblocks {
        let block = &bytes[b * BLOCK_BYTES..(b + 1) * BLOCK_BYTES];
        let d = decode_scale_f16([block[0], block[1]]);
        let qs = &block[2..18];
        let out_block = &mut out[b * VALUES_PER_BLOCK..(b + 1) * VALUES_PER_BLOCK];
        for i in 0..16 {
            out_block[i] = d * (low_nibble(qs[i]) as f32 - 8.0);
            out_block[16 + i] = d * (high_nibble(qs[i]) as f32 - 8.0);
        }
    }
    Ok(())
}

pub fn dequantize(bytes: &[u8], out: &mut [f32]) -> CoreResult<()> {
    // No vendor override registered for Q4_0: unlike Q8_0's single-byte
    // widen, a correct fast path needs a SIMD nibble-unpack shuffle, which
    // is exactly the kind of target-specific source this core's
    // "surrounding collaborator" code generator is responsible for (spec
    // §1), not the portable reference layer.
    let table: KernelTable<fn(&[u8], &mut [f32]) -> CoreResult<()>> =
        KernelTable::new(dequantize_base);
    (table.resolve_detected())(bytes, out)
}

//! IQ4_NL: non-linear 4-bit quantization. Identical byte layout to Q4_0,
//! but the nibble indexes a fixed lookup table instead of `nibble - 8`
//! (spec §3).

use crate::dispatch::KernelTable;
use crate::error::{CoreError, CoreResult};
use crate::half_precision::decode_scale_f16;
use crate::quant::{high_nibble, low_nibble, IQ4_NL_LOOKUP};

pub const VALUES_PER_BLOCK: usize = 32;
pub const BLOCK_BYTES: usize = 18;

fn num_blocks(byte_len: usize) -> CoreResult<usize> {
    if byte_len % BLOCK_BYTES != 0 {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "IQ4_NL input length {byte_len} is not a multiple of the {BLOCK_BYTES}-byte block size"
            ),
        });
    }
    Ok(byte_len / BLOCK_BYTES)
}

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
            out_block[i] = d * IQ4_NL_LOOKUP[low_nibble(qs[i]) as usize] as f32;
            out_block[16 + i] = d * IQ4_NL_LOOKUP[high_nibble(qs[i]) as usize] as f32;
        }
    }
    Ok(())
}

pub fn dequantize(bytes: &[u8], out: &mut [f32]) -> CoreResult<()> {
    let table: KernelTable<fn(&[u8], &mut [f32]) -> CoreResult<()>> =
        KernelTable::new(dequantize_base);
    (table.resolve_detected())(bytes, out)
}

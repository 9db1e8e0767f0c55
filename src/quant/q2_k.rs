//! Q2_K: 2-bit K-quant super-block (spec §3). 84 bytes = 16 scale/min
//! bytes, f16 `d`, f16 `dmin`, 64 bytes of 2-bit-packed quants. 16
//! sub-blocks of 16 values each: `d*sc*q - dmin*m`.

use crate::dispatch::KernelTable;
use crate::error::{CoreError, CoreResult};
use crate::half_precision::decode_scale_f16;
use crate::quant::{high_nibble, low_nibble, QK_K};

pub const VALUES_PER_BLOCK: usize = QK_K;
pub const BLOCK_BYTES: usize = 84; // 16 (scale/min) + 2 (d) + 2 (dmin) + 64 (qs)

const SUB_BLOCKS: usize = 16;
const SUB_BLOCK_LEN: usize = 16;

fn num_blocks(byte_len: usize) -> CoreResult<usize> {
    if byte_len % BLOCK_BYTES != 0 {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "Q2_K input length {byte_len} is not a multiple of the {BLOCK_BYTES}-byte block size"
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
        let sc_min = &block[0..16];
        let d = decode_scale_f16([block[16], block[17]]);
        let dmin = decode_scale_f16([block[18], block[19]]);
        let qs = &block[20..84];
        let out_block = &mut out[b * VALUES_PER_BLOCK..(b + 1) * VALUES_PER_BLOCK];

        for is in 0..SUB_BLOCKS {
            let sc = low_nibble(sc_min[is]) as f32;
            let m = high_nibble(sc_min[is]) as f32;
            let base = (is / 8) * 32 + (is % 2) * 16;
            let shift = ((is % 8) / 2) * 2;
            for j in 0..SUB_BLOCK_LEN {
                let q = (qs[base + j] >> shift) & 0x3;
                out_block[is * SUB_BLOCK_LEN + j] = d * sc * (q as f32) - dmin * m;
            }
        }
    }
    Ok(())
}

pub fn dequantize(bytes: &[u8], out: &mut [f32]) -> CoreResult<()> {
    let table: KernelTable<fn(&[u8], &mut [f32]) -> CoreResult<()>> =
        KernelTable::new(dequantize_base);
    (table.resolve_detected())(bytes, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::half_precision::encode_scale_f16;

    fn zero_block() -> Vec<u8> {
        let mut block = vec![0u8; BLOCK_BYTES];
        block[16..18].copy_from_slice(&encode_scale_f16(1.0));
        block[18..20].copy_from_slice(&encode_scale_f16(1.0));
        block
    }

    #[test]
    fn empty_input_is_noop() {
        let mut out: Vec<f32> = vec![];
        dequantize_base(&[], &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn scale_zero_invariant() {
        let mut block = zero_block();
        block[0] = 0x0F; // sc = 15, m = 0
        for b in &mut block[20..84] {
            *b = 0xFF;
        }
        block[16..18].copy_from_slice(&encode_scale_f16(0.0));
        let mut out = vec![1.0f32; QK_K];
        dequantize_base(&block, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn super_block_independence() {
        let mut two_blocks = vec![0u8; 2 * BLOCK_BYTES];
        let b0 = zero_block();
        let mut b1 = zero_block();
        b1[0] = 0xFF; // non-default scale/min in block 1 only
        for byte in &mut b1[20..84] {
            *byte = 0xAA;
        }
        two_blocks[..BLOCK_BYTES].copy_from_slice(&b0);
        two_blocks[BLOCK_BYTES..].copy_from_slice(&b1);

        let mut out = vec![0.0f32; 2 * QK_K];
        dequantize_base(&two_blocks, &mut out).unwrap();
        // Block 0 is an all-zero payload with sc=m=0: every value is 0.
        assert!(out[..QK_K].iter().all(|&v| v == 0.0));
        // Block 1 differs, but block 0's output must be unaffected — verified
        // above; this asserts block 1 actually produced something else.
        assert!(out[QK_K..].iter().any(|&v| v != 0.0));
    }

    #[test]
    fn all_zero_payload_is_all_zero() {
        let block = zero_block();
        let mut out = vec![1.0f32; QK_K];
        dequantize_base(&block, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }
}

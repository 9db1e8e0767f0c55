//! Q4_K: 4-bit K-quant super-block (spec §3). 144 bytes = f16 `d`, f16
//! `dmin`, 12 bytes of packed 6-bit (scale,min) pairs for 8 sub-blocks of
//! 32 values, 128 bytes `qs` (low nibbles for the even sub-block of a
//! chunk, high nibbles for the odd one). `d*sc*q - dmin*m`.

use crate::dispatch::KernelTable;
use crate::error::{CoreError, CoreResult};
use crate::half_precision::decode_scale_f16;
use crate::quant::{high_nibble, low_nibble, read_bits_le, QK_K};

pub const VALUES_PER_BLOCK: usize = QK_K;
pub const BLOCK_BYTES: usize = 144; // 2 (d) + 2 (dmin) + 12 (scale/min) + 128 (qs)

const SUB_BLOCKS: usize = 8;
const SUB_BLOCK_LEN: usize = 32;

fn num_blocks(byte_len: usize) -> CoreResult<usize> {
    if byte_len % BLOCK_BYTES != 0 {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "Q4_K input length {byte_len} is not a multiple of the {BLOCK_BYTES}-byte block size"
            ),
        });
    }
    Ok(byte_len / BLOCK_BYTES)
}

/// Decode the 6-bit (scale, min) pair for sub-block `is` (0..8) from the
/// 12-byte packed field.
#[inline]
fn scale_min(scmin: &[u8], is: usize) -> (f32, f32) {
    let sc = read_bits_le(scmin, 12 * is, 6) as f32;
    let m = read_bits_le(scmin, 12 * is + 6, 6) as f32;
    (sc, m)
}

pub fn dequantize_base(bytes: &[u8], out: &mut [f32]) -> CoreResult<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    let nblocks = num_blocks(bytes.len())?;
    for b in 0..nblocks {
        let block = &bytes[b * BLOCK_BYTES..(b + 1) * BLOCK_BYTES];
        let d = decode_scale_f16([block[0], block[1]]);
        let dmin = decode_scale_f16([block[2], block[3]]);
        let scmin = &block[4..16];
        let qs = &block[16..144];
        let out_block = &mut out[b * VALUES_PER_BLOCK..(b + 1) * VALUES_PER_BLOCK];

        for is in 0..SUB_BLOCKS {
            let (sc, m) = scale_min(scmin, is);
            let chunk_base = (is / 2) * SUB_BLOCK_LEN;
            let even = is % 2 == 0;
            for j in 0..SUB_BLOCK_LEN {
                let byte = qs[chunk_base + j];
                let q = if even { low_nibble(byte) } else { high_nibble(byte) };
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

    fn base_block() -> Vec<u8> {
        let mut block = vec![0u8; BLOCK_BYTES];
        block[0..2].copy_from_slice(&encode_scale_f16(1.0));
        block[2..4].copy_from_slice(&encode_scale_f16(1.0));
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
        let mut block = base_block();
        block[0..2].copy_from_slice(&encode_scale_f16(0.0));
        block[2..4].copy_from_slice(&encode_scale_f16(0.0));
        for b in &mut block[4..16] {
            *b = 0xFF;
        }
        for b in &mut block[16..144] {
            *b = 0xFF;
        }
        let mut out = vec![1.0f32; QK_K];
        dequantize_base(&block, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn even_odd_subblock_nibble_split() {
        let mut block = base_block();
        // chunk 0 covers sub-blocks 0 (even, low nibble) and 1 (odd, high nibble)
        block[16] = 0x5A; // low nibble 0xA=10, high nibble 0x5=5
        // give sub-block 0 and 1 a scale of 1, min 0 via scmin bits.
        // scmin bytes are zero already -> sc=0,m=0 by default for is=0, but we
        // want to see the *quant* difference so force sc=1 for is 0 and 1.
        // bit offsets: is=0 -> scale bits [0,6), is=1 -> scale bits [12,18)
        block[4] = 0b0000_0001; // scale(0) low bits = 1
        block[4 + 1] = 0b0001_0000; // scale(1) bits 12..18 straddle bytes 1-2
        let mut out = vec![0.0f32; QK_K];
        dequantize_base(&block, &mut out).unwrap();
        // sub-block 0 value 0 uses low nibble of qs[0] = 10
        assert_eq!(out[0], (1.0 * 1.0 * 10.0) - 0.0);
    }

    #[test]
    fn super_block_independence() {
        let mut two = vec![0u8; 2 * BLOCK_BYTES];
        let b0 = base_block();
        let mut b1 = base_block();
        for byte in &mut b1[16..144] {
            *byte = 0x24;
        }
        two[..BLOCK_BYTES].copy_from_slice(&b0);
        two[BLOCK_BYTES..].copy_from_slice(&b1);
        let mut out = vec![0.0f32; 2 * QK_K];
        dequantize_base(&two, &mut out).unwrap();
        assert!(out[..QK_K].iter().all(|&v| v == 0.0));
    }
}

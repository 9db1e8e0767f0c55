//! Q6_K: 6-bit K-quant super-block (spec §3). 210 bytes = 128 bytes `ql`
//! (low 4 bits), 64 bytes `qh` (2 high bits), 16 signed 8-bit sub-scales,
//! f16 `d`. 16 sub-blocks of 16: `d*scale*(q-32)` where `q = low4 | (high2
//! << 4)`.

use crate::dispatch::KernelTable;
use crate::error::{CoreError, CoreResult};
use crate::half_precision::decode_scale_f16;
use crate::quant::QK_K;

pub const VALUES_PER_BLOCK: usize = QK_K;
pub const BLOCK_BYTES: usize = 210; // 128 (ql) + 64 (qh) + 16 (sub-scales) + 2 (d)

const SUB_BLOCK_LEN: usize = 16;

fn num_blocks(byte_len: usize) -> CoreResult<usize> {
    if byte_len % BLOCK_BYTES != 0 {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "Q6_K input length {byte_len} is not a multiple of the {BLOCK_BYTES}-byte block size"
            ),
        });
    }
    Ok(byte_len / BLOCK_BYTES)
}

#[inline]
fn low4(ql: &[u8], v: usize) -> u32 {
    let byte = ql[v / 2];
    (if v % 2 == 0 { byte & 0x0F } else { (byte >> 4) & 0x0F }) as u32
}

#[inline]
fn high2(qh: &[u8], v: usize) -> u32 {
    let byte = qh[v / 4];
    let shift = (v % 4) * 2;
    ((byte >> shift) & 0x03) as u32
}

pub fn dequantize_base(bytes: &[u8], out: &mut [f32]) -> CoreResult<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    let nblocks = num_blocks(bytes.len())?;
    for b in 0..nblocks {
        let block = &bytes[b * BLOCK_BYTES..(b + 1) * BLOCK_BYTES];
        let ql = &block[0..128];
        let qh = &block[128..192];
        let sub_scales = &block[192..208];
        let d = decode_scale_f16([block[208], block[209]]);
        let out_block = &mut out[b * VALUES_PER_BLOCK..(b + 1) * VALUES_PER_BLOCK];

        for v in 0..QK_K {
            let q = low4(ql, v) | (high2(qh, v) << 4);
            let scale = sub_scales[v / SUB_BLOCK_LEN] as i8 as f32;
            out_block[v] = d * scale * (q as f32 - 32.0);
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
        block[208..210].copy_from_slice(&encode_scale_f16(1.0));
        block
    }

    #[test]
    fn scenario_4_all_zero_payload_subscales_one() {
        // spec §8 scenario 4
        let mut block = base_block();
        for s in &mut block[192..208] {
            *s = 1;
        }
        let mut out = vec![0.0f32; QK_K];
        dequantize_base(&block, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == -32.0));
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
        block[208..210].copy_from_slice(&encode_scale_f16(0.0));
        for b in &mut block[0..192] {
            *b = 0xFF;
        }
        for s in &mut block[192..208] {
            *s = 0x7F;
        }
        let mut out = vec![1.0f32; QK_K];
        dequantize_base(&block, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn negative_sub_scale_is_signed() {
        let mut block = base_block();
        block[192] = 0xFF; // -1 as i8
        let mut out = vec![0.0f32; QK_K];
        dequantize_base(&block, &mut out).unwrap();
        // q=0 for all -> value = d * (-1) * (0-32) = 32
        assert_eq!(out[0], 32.0);
    }

    #[test]
    fn super_block_independence() {
        let mut two = vec![0u8; 2 * BLOCK_BYTES];
        let mut b0 = base_block();
        for s in &mut b0[192..208] {
            *s = 1;
        }
        let mut b1 = base_block();
        for byte in &mut b1[0..192] {
            *byte = 0x3F;
        }
        two[..BLOCK_BYTES].copy_from_slice(&b0);
        two[BLOCK_BYTES..].copy_from_slice(&b1);
        let mut out = vec![0.0f32; 2 * QK_K];
        dequantize_base(&two, &mut out).unwrap();
        assert!(out[..QK_K].iter().all(|&v| v == -32.0));
    }
}

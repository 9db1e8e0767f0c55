//! Q5_K: 5-bit K-quant super-block (spec §3). The Q4_K layout (176 bytes
//! total now) plus 32 bytes `qh` giving one extra high bit per value:
//! `q = q_low + 16*q_hi`, then `d*sc*q - dmin*m`.

use crate::dispatch::KernelTable;
use crate::error::{CoreError, CoreResult};
use crate::half_precision::decode_scale_f16;
use crate::quant::{high_nibble, low_nibble, read_bits_le, QK_K};

pub const VALUES_PER_BLOCK: usize = QK_K;
pub const BLOCK_BYTES: usize = 176; // 2 (d) + 2 (dmin) + 12 (scale/min) + 128 (qs) + 32 (qh)

const SUB_BLOCKS: usize = 8;
const SUB_BLOCK_LEN: usize = 32;

fn num_blocks(byte_len: usize) -> CoreResult<usize> {
    if byte_len % BLOCK_BYTES != 0 {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "Q5_K input length {byte_len} is not a multiple of the {BLOCK_BYTES}-byte block size"
            ),
        });
    }
    Ok(byte_len / BLOCK_BYTES)
}

#[inline]
fn scale_min(scmin: &[u8], is: usize) -> (f32, f32) {
    let sc = read_bits_le(scmin, 12 * is, 6) as f32;
    let m = read_bits_le(scmin, 12 * is + 6, 6) as f32;
    (sc, m)
}

/// One high bit per value, directly indexed: value `v`'s bit lives at
/// `qh[v/8]` bit `v%8` — 32 bytes * 8 bits covers exactly the 256 values.
#[inline]
fn high_bit(qh: &[u8], v: usize) -> u32 {
    ((qh[v / 8] >> (v % 8)) & 1) as u32
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
        let qh = &block[144..176];
        let out_block = &mut out[b * VALUES_PER_BLOCK..(b + 1) * VALUES_PER_BLOCK];

        for is in 0..SUB_BLOCKS {
            let (sc, m) = scale_min(scmin, is);
            let chunk_base = (is / 2) * SUB_BLOCK_LEN;
            let even = is % 2 == 0;
            for j in 0..SUB_BLOCK_LEN {
                let byte = qs[chunk_base + j];
                let q_low = if even { low_nibble(byte) } else { high_nibble(byte) } as u32;
                let v = is * SUB_BLOCK_LEN + j;
                let q_hi = high_bit(qh, v);
                let q = q_low + 16 * q_hi;
                out_block[v] = d * sc * (q as f32) - dmin * m;
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

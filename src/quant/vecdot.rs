//! Fused dot-product kernels (spec §4.3.4): weight block stream × activation
//! block stream, accumulated in f32 without ever materializing a dequantized
//! intermediate.
//!
//! IQ4_NL has no VecDot pair in the source this core is modeled on — spec's
//! open question on this point leaves a choice between dequantizing on the
//! fly and defining a dedicated lookup-based pair. This module takes the
//! latter (`vecdot_iq4_nl_q8_0` indexes `IQ4_NL_LOOKUP` directly, same shape
//! as `vecdot_q4_0_q8_0`), since the lookup is already a fixed, wire-format
//! table and indexing it costs no more than the nibble-minus-8 it replaces.

use crate::error::{CoreError, CoreResult};
use crate::half_precision::decode_scale_f16;
use crate::quant::{high_nibble, iq4_nl, low_nibble, q4_0, q8_0, IQ4_NL_LOOKUP};

fn num_block_pairs(weight_len: usize, weight_block_bytes: usize, act_len: usize) -> CoreResult<usize> {
    if weight_len % weight_block_bytes != 0 {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "weight buffer length {weight_len} is not a multiple of the {weight_block_bytes}-byte block size"
            ),
        });
    }
    let nblocks = weight_len / weight_block_bytes;
    let expected_act_len = nblocks * q8_0::BLOCK_BYTES;
    if act_len != expected_act_len {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "activation buffer length {act_len} does not match {nblocks} Q8_0 blocks ({expected_act_len} bytes)"
            ),
        });
    }
    Ok(nblocks)
}

/// `VecDot<Q8_0, Q8_0>` (spec §4.3.4): `Σ d_w·d_a·Σ_i i8(w[i])·i8(a[i])`.
pub fn vecdot_q8_0_q8_0(weight: &[u8], activation: &[u8]) -> CoreResult<f32> {
    let nblocks = num_block_pairs(weight.len(), q8_0::BLOCK_BYTES, activation.len())?;
    let mut acc = 0.0f32;
    for b in 0..nblocks {
        let w_block = &weight[b * q8_0::BLOCK_BYTES..(b + 1) * q8_0::BLOCK_BYTES];
        let a_block = &activation[b * q8_0::BLOCK_BYTES..(b + 1) * q8_0::BLOCK_BYTES];
        let d_w = decode_scale_f16([w_block[0], w_block[1]]);
        let d_a = decode_scale_f16([a_block[0], a_block[1]]);
        let w_qs = &w_block[2..34];
        let a_qs = &a_block[2..34];
        let mut dot = 0.0f32;
        for i in 0..q8_0::VALUES_PER_BLOCK {
            dot += (w_qs[i] as i8) as f32 * (a_qs[i] as i8) as f32;
        }
        acc += d_w * d_a * dot;
    }
    Ok(acc)
}

/// `VecDot<Q4_0, Q8_0>` (spec §4.3.4): split-nibble weight against the Q8_0
/// activation companion.
pub fn vecdot_q4_0_q8_0(weight: &[u8], activation: &[u8]) -> CoreResult<f32> {
    let nblocks = num_block_pairs(weight.len(), q4_0::BLOCK_BYTES, activation.len())?;
    let mut acc = 0.0f32;
    for b in 0..nblocks {
        let w_block = &weight[b * q4_0::BLOCK_BYTES..(b + 1) * q4_0::BLOCK_BYTES];
        let a_block = &activation[b * q8_0::BLOCK_BYTES..(b + 1) * q8_0::BLOCK_BYTES];
        let d_w = decode_scale_f16([w_block[0], w_block[1]]);
        let d_a = decode_scale_f16([a_block[0], a_block[1]]);
        let w_qs = &w_block[2..18];
        let a_qs = &a_block[2..34];

        let mut dot = 0.0f32;
        for i in 0..16 {
            dot += (low_nibble(w_qs[i]) as f32 - 8.0) * (a_qs[i] as i8) as f32;
            dot += (high_nibble(w_qs[i]) as f32 - 8.0) * (a_qs[16 + i] as i8) as f32;
        }
        acc += d_w * d_a * dot;
    }
    Ok(acc)
}

/// `VecDot<IQ4_NL, Q8_0>`: same shape as [`vecdot_q4_0_q8_0`], with the
/// nonlinear lookup table replacing `nibble - 8`.
pub fn vecdot_iq4_nl_q8_0(weight: &[u8], activation: &[u8]) -> CoreResult<f32> {
    let nblocks = num_block_pairs(weight.len(), iq4_nl::BLOCK_BYTES, activation.len())?;
    let mut acc = 0.0f32;
    for b in 0..nblocks {
        let w_block = &weight[b * iq4_nl::BLOCK_BYTES..(b + 1) * iq4_nl::BLOCK_BYTES];
        let a_block = &activation[b * q8_0::BLOCK_BYTES..(b + 1) * q8_0::BLOCK_BYTES];
        let d_w = decode_scale_f16([w_block[0], w_block[1]]);
        let d_a = decode_scale_f16([a_block[0], a_block[1]]);
        let w_qs = &w_block[2..18];
        let a_qs = &a_block[2..34];

        let mut dot = 0.0f32;
        for i in 0..16 {
            dot += IQ4_NL_LOOKUP[low_nibble(w_qs[i]) as usize] as f32 * (a_qs[i] as i8) as f32;
            dot += IQ4_NL_LOOKUP[high_nibble(w_qs[i]) as usize] as f32 * (a_qs[16 + i] as i8) as f32;
        }
        acc += d_w * d_a * dot;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::half_precision::encode_scale_f16;

    fn q8_0_block(d: f32, qs: [i8; 32]) -> Vec<u8> {
        let mut bytes = encode_scale_f16(d).to_vec();
        bytes.extend(qs.iter().map(|&q| q as u8));
        bytes
    }

    #[test]
    fn scenario_6_q8_0_q8_0_all_ones() {
        // spec §8 scenario 6
        let weight = q8_0_block(1.0, [1i8; 32]);
        let activation = q8_0_block(1.0, [1i8; 32]);
        let result = vecdot_q8_0_q8_0(&weight, &activation).unwrap();
        assert_eq!(result, 32.0);
    }

    #[test]
    fn q4_0_q8_0_matches_dequantized_reference() {
        let mut weight = encode_scale_f16(1.0).to_vec();
        weight.extend(std::iter::repeat(0x5Au8).take(16)); // low=10-8=2, high=5-8=-3
        let activation = q8_0_block(1.0, [1i8; 32]);

        let result = vecdot_q4_0_q8_0(&weight, &activation).unwrap();

        let mut dequantized = vec![0.0f32; 32];
        q4_0::dequantize_base(&weight, &mut dequantized).unwrap();
        let expected: f32 = dequantized.iter().sum();
        assert_eq!(result, expected);
    }

    #[test]
    fn iq4_nl_q8_0_matches_dequantized_reference() {
        let mut weight = encode_scale_f16(1.0).to_vec();
        weight.extend(std::iter::repeat(0xFFu8).take(16));
        let activation = q8_0_block(1.0, [2i8; 32]);

        let result = vecdot_iq4_nl_q8_0(&weight, &activation).unwrap();

        let mut dequantized = vec![0.0f32; 32];
        iq4_nl::dequantize_base(&weight, &mut dequantized).unwrap();
        let mut act = vec![0.0f32; 32];
        q8_0::dequantize_base(&activation, &mut act).unwrap();
        let expected: f32 = dequantized.iter().zip(act.iter()).map(|(w, a)| w * a).sum();
        assert_eq!(result, expected);
    }

    #[test]
    fn dimension_mismatch_on_wrong_activation_length() {
        let weight = q8_0_block(1.0, [1i8; 32]);
        let err = vecdot_q8_0_q8_0(&weight, &[0u8; 10]).unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch { .. }));
    }

    #[test]
    fn multi_block_accumulates() {
        let mut weight = q8_0_block(1.0, [1i8; 32]);
        weight.extend(q8_0_block(2.0, [1i8; 32]));
        let mut activation = q8_0_block(1.0, [1i8; 32]);
        activation.extend(q8_0_block(1.0, [1i8; 32]));
        let result = vecdot_q8_0_q8_0(&weight, &activation).unwrap();
        assert_eq!(result, 32.0 + 64.0);
    }
}

//! RMS normalization, adapted from the teacher's `ops::rmsnorm` onto
//! `Lanes<f32, N>` for the sum-of-squares reduction and the final
//! scale-by-weight pass.

use crate::error::{CoreError, CoreResult};
use crate::lanes::{Lanes, LANES_F32};

pub fn rmsnorm(input: &[f32], weights: &[f32], epsilon: f32, output: &mut [f32]) -> CoreResult<()> {
    if input.len() != weights.len() || input.len() != output.len() {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "rmsnorm length mismatch: input={}, weights={}, output={}",
                input.len(),
                weights.len(),
                output.len()
            ),
        });
    }

    const N: usize = LANES_F32;
    let dim = input.len();
    let chunks = dim / N;

    let mut sum_squared = 0.0f32;
    for c in 0..chunks {
        let v = Lanes::<f32, N>::load(&input[c * N..]);
        sum_squared += v.mul(v).hsum();
    }
    for i in (chunks * N)..dim {
        sum_squared += input[i] * input[i];
    }

    let mean_squared = sum_squared / (dim as f32);
    let rms = (mean_squared + epsilon).sqrt();
    let inv_rms = Lanes::<f32, N>::set(1.0 / rms);

    for c in 0..chunks {
        let x = Lanes::<f32, N>::load(&input[c * N..]);
        let w = Lanes::<f32, N>::load(&weights[c * N..]);
        x.mul(w).mul(inv_rms).store(&mut output[c * N..]);
    }
    for i in (chunks * N)..dim {
        output[i] = input[i] * weights[i] / rms;
    }
    Ok(())
}

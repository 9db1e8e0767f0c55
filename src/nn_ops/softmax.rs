//! Softmax, adapted from the teacher's `ops::softmax`. The `exp` calls stay
//! scalar — elementary transcendentals are outside the lane layer's op set
//! (spec §1 treats them as an external collaborator) — but the max-reduction
//! and the final normalizing division run over `Lanes<f32, N>`.

use crate::error::{CoreError, CoreResult};
use crate::lanes::{Lanes, LANES_F32};

pub fn softmax(input: &[f32], output: &mut [f32]) -> CoreResult<()> {
    if input.len() != output.len() {
        return Err(CoreError::DimensionMismatch {
            detail: format!("softmax length mismatch: input={}, output={}", input.len(), output.len()),
        });
    }
    if input.is_empty() {
        return Err(CoreError::DimensionMismatch {
            detail: "softmax input is empty".to_string(),
        });
    }

    const N: usize = LANES_F32;
    let len = input.len();
    let chunks = len / N;

    // Horizontal max isn't one of the lane primitives (spec §4.1 only lists
    // a horizontal sum), so the max scan stays scalar, same as the teacher.
    let max = input.iter().copied().fold(input[0], f32::max);

    let mut sum_exp = 0.0f32;
    for i in 0..len {
        let e = (input[i] - max).exp();
        output[i] = e;
        sum_exp += e;
    }

    let inv_sum = Lanes::<f32, N>::set(1.0 / sum_exp);
    for c in 0..chunks {
        let v = Lanes::<f32, N>::load(&output[c * N..]);
        v.mul(inv_sum).store(&mut output[c * N..]);
    }
    for i in (chunks * N)..len {
        output[i] /= sum_exp;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_to_one() {
        let input = vec![0.0, 1.0];
        let mut output = vec![0.0; input.len()];
        softmax(&input, &mut output).unwrap();
        let sum: f32 = output.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((output[0] - 0.26894142).abs() < 1e-5);
        assert!((output[1] - 0.73105858).abs() < 1e-5);
    }

    #[test]
    fn empty_input_is_dimension_mismatch() {
        let err = softmax(&[], &mut []).unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch { .. }));
    }
}

//! Sigmoid and SwiGLU, adapted from the teacher's `ops::swiglu`. `sigmoid`'s
//! `exp` stays scalar (an elementary transcendental, spec §1's external
//! collaborator), but the `x * sigmoid(x) * gate` combine runs over
//! `Lanes<f32, N>`.

use crate::error::{CoreError, CoreResult};
use crate::lanes::{Lanes, LANES_F32};

pub fn sigmoid(input: &[f32], output: &mut [f32]) -> CoreResult<()> {
    if input.len() != output.len() {
        return Err(CoreError::DimensionMismatch {
            detail: format!("sigmoid length mismatch: input={}, output={}", input.len(), output.len()),
        });
    }
    for i in 0..input.len() {
        output[i] = if input[i] >= 0.0 {
            1.0 / (1.0 + (-input[i]).exp())
        } else {
            let e = input[i].exp();
            e / (1.0 + e)
        };
    }
    Ok(())
}

pub fn swiglu(x: &[f32], gate: &[f32], output: &mut [f32]) -> CoreResult<()> {
    if x.len() != gate.len() || x.len() != output.len() {
        return Err(CoreError::DimensionMismatch {
            detail: format!(
                "swiglu length mismatch: x={}, gate={}, output={}",
                x.len(),
                gate.len(),
                output.len()
            ),
        });
    }

    let mut sigmoid_x = vec![0.0f32; x.len()];
    sigmoid(x, &mut sigmoid_x)?;

    const N: usize = LANES_F32;
    let len = x.len();
    let chunks = len / N;
    for c in 0..chunks {
        let xv = Lanes::<f32, N>::load(&x[c * N..]);
        let sv = Lanes::<f32, N>::load(&sigmoid_x[c * N..]);
        let gv = Lanes::<f32, N>::load(&gate[c * N..]);
        xv.mul(sv).mul(gv).store(&mut output[c * N..]);
    }
    for i in (chunks * N)..len {
        output[i] = x[i] * sigmoid_x[i] * gate[i];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swiglu_matches_reference() {
        let x = vec![0.0, 1.0];
        let gate = vec![1.0, 1.0];
        let mut output = vec![0.0; x.len()];
        swiglu(&x, &gate, &mut output).unwrap();
        assert!((output[0] - 0.0).abs() < 1e-5);
        assert!((output[1] - 0.7310585786).abs() < 1e-3);
    }

    #[test]
    fn sigmoid_symmetric_around_zero() {
        let input = vec![-2.0, 0.0, 2.0];
        let mut output = vec![0.0; 3];
        sigmoid(&input, &mut output).unwrap();
        assert!((output[1] - 0.5).abs() < 1e-6);
        assert!((output[0] + output[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn dimension_mismatch_reported() {
        let err = swiglu(&[1.0, 2.0], &[1.0], &mut [0.0; 2]).unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch { .. }));
    }
}

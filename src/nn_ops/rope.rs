//! Rotary position embedding, adapted from the teacher's `ops::rope`. Pair
//! rotation doesn't map onto a fixed-width lane without cross-lane shuffles
//! the lane layer doesn't expose, so this stays a scalar per-pair loop, same
//! as the teacher's.

use crate::error::{CoreError, CoreResult};

pub fn rope(vec: &mut [f32], base: u32, pos: u32, head_dim: u32, rotary_dim: u32) -> CoreResult<()> {
    if rotary_dim > head_dim {
        return Err(CoreError::DimensionMismatch {
            detail: format!("rotary_dim {rotary_dim} exceeds head_dim {head_dim}"),
        });
    }

    let num_pairs = vec.len() / 2;
    for i in 0..num_pairs {
        let angle = (pos as f32) * (base as f32).powf((-2.0 * (i as f32)) / (head_dim as f32));
        let (sin, cos) = angle.sin_cos();
        let temp_0 = vec[2 * i];
        let temp_1 = vec[2 * i + 1];
        vec[2 * i] = temp_0 * cos - temp_1 * sin;
        vec[2 * i + 1] = temp_0 * sin + temp_1 * cos;
    }
    Ok(())
}

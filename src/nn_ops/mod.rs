//! Demonstration/consumer code showing the lane abstraction hosts ordinary
//! elementwise and reduction-style neural-net ops, not part of the four
//! core layers (lane, dispatch, codec, matmul). Adapted from scalar-loop
//! originals onto `Lanes<f32, N>`, processing `N` elements per iteration
//! with a scalar tail for lengths not a multiple of `N`.

pub mod residual_add;
pub mod rmsnorm;
pub mod rope;
pub mod softmax;
pub mod swiglu;

pub use residual_add::residual_add;
pub use rmsnorm::rmsnorm;
pub use rope::rope;
pub use softmax::softmax;
pub use swiglu::{sigmoid, swiglu};

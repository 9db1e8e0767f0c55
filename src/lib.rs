//! Portable SIMD numerics core for on-device ML inference kernels.
//!
//! Four layers, depended on leaves-first:
//!
//! - [`lanes`]: compile-time-typed vector lanes with a fixed per-target
//!   width, and the elementwise primitives higher layers are built on.
//! - [`dispatch`]: a process-wide registry resolving each named kernel to
//!   the implementation matching the detected CPU feature level.
//! - [`quant`]: dequantize/quantize/dot-product kernels for the GGUF
//!   block-quant formats (Q8_0, Q4_0, IQ4_NL, Q2_K, Q3_K, Q4_K, Q5_K, Q6_K).
//! - [`matmul`]: a quantized matmul driver pairing on-the-fly activation
//!   quantization with block-level dot products, distributed across a
//!   caller-supplied executor.
//!
//! [`half_precision`] and [`pool`] are shared helpers; [`nn_ops`] is
//! demonstration/consumer code showing the lane abstraction hosts ordinary
//! neural-net elementwise ops, not part of the four layers above.

pub mod dispatch;
pub mod error;
pub mod half_precision;
pub mod lanes;
pub mod matmul;
pub mod nn_ops;
pub mod pool;
pub mod quant;

pub use dispatch::{detected_level, describe_detected_level, FeatureLevel};
pub use error::{CoreError, CoreResult};
pub use quant::QuantFormat;

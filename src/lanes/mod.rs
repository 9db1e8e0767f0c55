//! The lane layer: a compile-time-typed vector of `N` lanes of element type
//! `T`, plus the elementwise primitives the codec and matmul layers are
//! built on (spec §4.1).
//!
//! `N` is fixed per (T, target) at compile time via the `LANES_F32` /
//! `LANES_F64` constants below, selected by `cfg`. The scalar fallback
//! collapses to `N = 1`; kernels written against `Lanes` must stay correct
//! there (spec's "Scalar fallback size" design note).
//!
//! There is a single portable implementation (`portable::Lanes`): every op
//! is a plain Rust loop over `[T; N]`, left to LLVM auto-vectorization at
//! whatever width `LANES_F32`/`LANES_F64` select for the compile target.
//! `f16`/`bf16` have no dedicated wide representation here; the codec layer
//! decodes them straight to `f32` (`half_precision::decode_scale_f16`)
//! before any lane op ever sees them.

pub mod portable;

pub use portable::Lanes;

/// Lane width used for `f32` on the current target. Chosen per-target at
/// compile time; the codec layer never has to ask "how wide" at runtime.
#[cfg(all(target_arch = "x86_64", target_feature = "avx512f"))]
pub const LANES_F32: usize = 16;
#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx2",
    not(target_feature = "avx512f")
))]
pub const LANES_F32: usize = 8;
#[cfg(target_arch = "aarch64")]
pub const LANES_F32: usize = 4;
#[cfg(not(any(
    all(target_arch = "x86_64", any(target_feature = "avx2", target_feature = "avx512f")),
    target_arch = "aarch64"
)))]
pub const LANES_F32: usize = 1;

/// Lane width used for `f64` on the current target.
#[cfg(all(target_arch = "x86_64", target_feature = "avx512f"))]
pub const LANES_F64: usize = 8;
#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx2",
    not(target_feature = "avx512f")
))]
pub const LANES_F64: usize = 4;
#[cfg(target_arch = "aarch64")]
pub const LANES_F64: usize = 2;
#[cfg(not(any(
    all(target_arch = "x86_64", any(target_feature = "avx2", target_feature = "avx512f")),
    target_arch = "aarch64"
)))]
pub const LANES_F64: usize = 1;

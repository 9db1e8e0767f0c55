//! Structured error types for the core.
//!
//! Per the error-handling contract: lane primitives and codec kernels trust
//! their inputs (the caller's contract), while the dispatch registry and the
//! matmul driver are checkpoints that fail with one of these variants rather
//! than panicking or silently corrupting output.

use thiserror::Error;

/// Errors surfaced by the dispatch registry and the matmul driver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// No implementation was registered for a (kernel, element-type) pair.
    /// This is a build/configuration bug: every element type declared for a
    /// kernel must have at least the portable registration.
    #[error("no dispatch registered for kernel `{kernel}` over element type `{element_type}`")]
    NoDispatch {
        kernel: &'static str,
        element_type: &'static str,
    },

    /// `MatMul` was asked to multiply against a quant format with no
    /// registered dot-product kernel.
    #[error("unsupported quant format for matmul: {format}")]
    UnsupportedFormat { format: &'static str },

    /// A dimension precondition was violated: `K` not divisible by the
    /// format's block size, or a buffer shorter than required.
    #[error("dimension mismatch: {detail}")]
    DimensionMismatch { detail: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

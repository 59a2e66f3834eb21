//! Core types for matched-filter signal processing
//!
//! Every buffer in the kernel is a fixed-length sequence of complex
//! baseband samples. Real and imaginary parts are the I and Q components:
//!
//! ```text
//!            Q (Imaginary)
//!            ^
//!            |     * (I=0.7, Q=0.7)
//!            |    /
//!            |   / magnitude = 1.0
//!            |  /  phase = 45°
//!            | /
//!   ---------+---------> I (Real)
//!            |
//! ```
//!
//! Power of a sample is `|s|² = I² + Q²`, which is why complex noise of
//! power P puts P/2 into each component.

use num_complex::Complex64;

/// Type alias for complex numbers using f64 precision
pub type Complex = Complex64;

/// A single I/Q sample point
pub type IQSample = Complex64;

/// A buffer of I/Q samples
pub type IQBuffer = Vec<IQSample>;

/// Result type for DSP operations
pub type DspResult<T> = Result<T, DspError>;

/// Errors raised by the kernel.
///
/// `InvalidConfig` and `LengthMismatch` are configuration errors and are
/// detected before any transform runs. `NumericDegeneracy` covers inputs
/// that would otherwise surface as `-inf`/NaN in a dB value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DspError {
    #[error("Invalid configuration: {parameter} {constraint}")]
    InvalidConfig {
        parameter: &'static str,
        constraint: String,
    },

    #[error("Buffer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),
}

impl DspError {
    pub(crate) fn invalid(parameter: &'static str, constraint: impl Into<String>) -> Self {
        DspError::InvalidConfig {
            parameter,
            constraint: constraint.into(),
        }
    }

    /// True for errors caused by bad parameters rather than degenerate data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DspError::InvalidConfig { .. } | DspError::LengthMismatch { .. }
        )
    }
}

/// Check that two buffers share the frame length.
pub(crate) fn ensure_len(expected: usize, actual: usize) -> DspResult<()> {
    if expected != actual {
        return Err(DspError::LengthMismatch { expected, actual });
    }
    Ok(())
}

//! FFT Utilities for Spectral Matched Filtering
//!
//! Wraps `rustfft` plans for a fixed frame length N together with an
//! explicit [`Normalization`]. The same processor is used for every
//! transform in a run, so signal and noise branches can never end up under
//! different scaling.
//!
//! ## Scaling conventions
//!
//! With `c` the exact circular convolution of two length-N frames:
//!
//! ```text
//! Variant           forward   inverse   IDFT(DFT(x)·DFT(h))   Σ|X|² / Σ|x|²
//! Unscaled          1         1/N       c                     N
//! ForwardScaled     1/N       1         c / N                 1/N
//! Unitary           1/√N      1/√N      c / √N                1
//! ReferenceEnergy   1         1/N       c (then / √E_h)       N
//! ```
//!
//! `ReferenceEnergy` uses unscaled transforms; the division by the square
//! root of the reference energy is applied by the correlator.

use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::types::{ensure_len, DspError, DspResult, IQSample};

/// Scaling applied to the forward/inverse transform pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Plain DFT forward, `1/N` inverse.
    Unscaled,
    /// `1/N` forward, plain inverse sum.
    ForwardScaled,
    /// `1/√N` both ways.
    Unitary,
    /// Unscaled transforms, matched filter normalized to unit energy.
    ReferenceEnergy,
}

impl Default for Normalization {
    fn default() -> Self {
        Normalization::ReferenceEnergy
    }
}

impl Normalization {
    /// Every convention, for sweeping tests and benchmarks.
    pub const ALL: [Normalization; 4] = [
        Normalization::Unscaled,
        Normalization::ForwardScaled,
        Normalization::Unitary,
        Normalization::ReferenceEnergy,
    ];

    /// Factor applied after the unscaled forward sum.
    pub fn forward_scale(&self, n: usize) -> f64 {
        match self {
            Normalization::Unscaled | Normalization::ReferenceEnergy => 1.0,
            Normalization::ForwardScaled => 1.0 / n as f64,
            Normalization::Unitary => 1.0 / (n as f64).sqrt(),
        }
    }

    /// Factor applied after the unscaled inverse sum.
    pub fn inverse_scale(&self, n: usize) -> f64 {
        match self {
            Normalization::Unscaled | Normalization::ReferenceEnergy => 1.0 / n as f64,
            Normalization::ForwardScaled => 1.0,
            Normalization::Unitary => 1.0 / (n as f64).sqrt(),
        }
    }

    /// `IDFT(DFT(x)·DFT(h))` divided by the exact circular convolution.
    pub fn convolution_scale(&self, n: usize) -> f64 {
        let f = self.forward_scale(n);
        f * f * self.inverse_scale(n) * n as f64
    }

    /// Parseval ratio `Σ|DFT(v)|² / Σ|v|²` under this convention.
    pub fn parseval_factor(&self, n: usize) -> f64 {
        let f = self.forward_scale(n);
        n as f64 * f * f
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Normalization::Unscaled => "unscaled",
            Normalization::ForwardScaled => "forward_scaled",
            Normalization::Unitary => "unitary",
            Normalization::ReferenceEnergy => "reference_energy",
        };
        f.write_str(name)
    }
}

/// Planned forward/inverse FFT pair for one frame length.
pub struct FftProcessor {
    size: usize,
    normalization: Normalization,
    fft_forward: Arc<dyn Fft<f64>>,
    fft_inverse: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
}

impl fmt::Debug for FftProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftProcessor")
            .field("size", &self.size)
            .field("normalization", &self.normalization)
            .finish()
    }
}

impl FftProcessor {
    /// Plan transforms of length `size`.
    pub fn new(size: usize, normalization: Normalization) -> DspResult<Self> {
        if size == 0 {
            return Err(DspError::invalid("num_samples", "must be > 0"));
        }

        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(size);
        let fft_inverse = planner.plan_fft_inverse(size);
        let scratch_len = fft_forward
            .get_inplace_scratch_len()
            .max(fft_inverse.get_inplace_scratch_len());

        Ok(Self {
            size,
            normalization,
            fft_forward,
            fft_inverse,
            scratch: vec![Complex64::new(0.0, 0.0); scratch_len],
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Forward transform in place.
    pub fn fft_inplace(&mut self, buffer: &mut [Complex64]) -> DspResult<()> {
        ensure_len(self.size, buffer.len())?;
        self.fft_forward.process_with_scratch(buffer, &mut self.scratch);
        scale(buffer, self.normalization.forward_scale(self.size));
        Ok(())
    }

    /// Forward transform, returning a new buffer.
    pub fn fft(&mut self, input: &[IQSample]) -> DspResult<Vec<Complex64>> {
        let mut buffer = input.to_vec();
        self.fft_inplace(&mut buffer)?;
        Ok(buffer)
    }

    /// Inverse transform in place.
    pub fn ifft_inplace(&mut self, buffer: &mut [Complex64]) -> DspResult<()> {
        ensure_len(self.size, buffer.len())?;
        self.fft_inverse.process_with_scratch(buffer, &mut self.scratch);
        scale(buffer, self.normalization.inverse_scale(self.size));
        Ok(())
    }

    /// Inverse transform, returning a new buffer.
    pub fn ifft(&mut self, spectrum: &[Complex64]) -> DspResult<Vec<Complex64>> {
        let mut buffer = spectrum.to_vec();
        self.ifft_inplace(&mut buffer)?;
        Ok(buffer)
    }

    /// Index and squared magnitude of the strongest bin.
    ///
    /// Ties resolve to the lowest index. Returns `None` for an empty slice.
    pub fn find_peak(values: &[Complex64]) -> Option<(usize, f64)> {
        values
            .iter()
            .map(|c| c.norm_sqr())
            .enumerate()
            .fold(None, |best, (i, p)| match best {
                Some((_, best_p)) if best_p >= p => best,
                _ => Some((i, p)),
            })
    }

    /// Magnitude of every bin.
    pub fn magnitude_spectrum(spectrum: &[Complex64]) -> Vec<f64> {
        spectrum.iter().map(|c| c.norm()).collect()
    }

    /// Instantaneous power in dB, floored for display.
    ///
    /// Display-only: metrics go through [`crate::power`], which rejects
    /// zero power instead of flooring it.
    pub fn power_spectrum_db(spectrum: &[Complex64]) -> Vec<f64> {
        spectrum
            .iter()
            .map(|c| {
                let power = c.norm_sqr();
                if power > 1e-20 {
                    10.0 * power.log10()
                } else {
                    -200.0
                }
            })
            .collect()
    }

    /// Move the zero-frequency bin to the center.
    pub fn fft_shift<T: Clone>(spectrum: &[T]) -> Vec<T> {
        let mid = (spectrum.len() + 1) / 2;
        let mut shifted = Vec::with_capacity(spectrum.len());
        shifted.extend_from_slice(&spectrum[mid..]);
        shifted.extend_from_slice(&spectrum[..mid]);
        shifted
    }
}

fn scale(buffer: &mut [Complex64], factor: f64) {
    if factor != 1.0 {
        for sample in buffer.iter_mut() {
            *sample *= factor;
        }
    }
}

/// Sample instants `n·dt` for a frame of `n` samples.
pub fn time_axis(num_samples: usize, sample_interval: f64) -> Vec<f64> {
    (0..num_samples).map(|n| n as f64 * sample_interval).collect()
}

/// Bin frequencies `k·Fs/N`, spanning `[0, Fs)`.
pub fn frequency_axis(num_samples: usize, sample_rate: f64) -> Vec<f64> {
    let resolution = sample_rate / num_samples.max(1) as f64;
    (0..num_samples).map(|k| k as f64 * resolution).collect()
}

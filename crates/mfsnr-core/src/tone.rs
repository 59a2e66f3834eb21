//! Single-Bin DFT SNR Probe
//!
//! Evaluates one DFT coefficient by direct summation against a bin
//! reference, the simplest matched filter there is:
//!
//! ```text
//! x[n] = exp(+j·2π·k·n/N)        tone exactly on bin k
//! h[n] = exp(−j·2π·k·n/N)        bin reference
//! X[k] = Σ x[n]·h[n] = N
//! ```
//!
//! A tone of amplitude A sums coherently to `A·N`, while unit-power noise
//! sums incoherently to an expected modulus near `√N`, giving a coherent
//! gain of `10·log10(N)` in power.

use serde::Serialize;
use std::f64::consts::PI;

use crate::power::to_db;
use crate::types::{ensure_len, Complex, DspError, DspResult, IQBuffer, IQSample};

/// Per-bin result of [`ToneProbe::measure`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BinSnrReport {
    pub bin: usize,
    /// `|Σ signal·h|`
    pub signal_magnitude: f64,
    /// `|Σ noise·h|`
    pub noise_magnitude: f64,
    /// `20·log10(signal_magnitude / noise_magnitude)`
    pub snr_db: f64,
}

/// Tone generator and bin correlator for one `(N, k)` pair.
#[derive(Debug, Clone)]
pub struct ToneProbe {
    bin: usize,
    reference: IQBuffer,
}

impl ToneProbe {
    pub fn new(num_samples: usize, bin: usize) -> DspResult<Self> {
        if num_samples == 0 {
            return Err(DspError::invalid("num_samples", "must be > 0"));
        }
        if bin >= num_samples {
            return Err(DspError::invalid(
                "bin",
                format!("must be < {num_samples}, got {bin}"),
            ));
        }
        let reference = phase_ramp(num_samples, bin, -1.0);
        Ok(Self { bin, reference })
    }

    pub fn bin(&self) -> usize {
        self.bin
    }

    pub fn num_samples(&self) -> usize {
        self.reference.len()
    }

    /// Unit-amplitude tone centered on the probe bin.
    pub fn tone(&self) -> IQBuffer {
        phase_ramp(self.reference.len(), self.bin, 1.0)
    }

    pub fn reference(&self) -> &[IQSample] {
        &self.reference
    }

    /// DFT coefficient of `x` at the probe bin.
    pub fn coefficient(&self, x: &[IQSample]) -> DspResult<IQSample> {
        ensure_len(self.reference.len(), x.len())?;
        Ok(x.iter().zip(&self.reference).map(|(a, b)| a * b).sum())
    }

    /// Compare the bin response of a signal against that of noise.
    pub fn measure(&self, signal: &[IQSample], noise: &[IQSample]) -> DspResult<BinSnrReport> {
        let signal_magnitude = self.coefficient(signal)?.norm();
        let noise_magnitude = self.coefficient(noise)?.norm();
        if noise_magnitude == 0.0 {
            return Err(DspError::NumericDegeneracy(format!(
                "noise has no energy in bin {}",
                self.bin
            )));
        }
        let snr_db = to_db((signal_magnitude / noise_magnitude).powi(2))?;

        Ok(BinSnrReport {
            bin: self.bin,
            signal_magnitude,
            noise_magnitude,
            snr_db,
        })
    }
}

fn phase_ramp(n: usize, bin: usize, sign: f64) -> IQBuffer {
    // Reduce k·m mod N before scaling so large frames keep phase precision.
    (0..n)
        .map(|m| {
            let cycles = ((bin * m) % n) as f64 / n as f64;
            Complex::from_polar(1.0, sign * 2.0 * PI * cycles)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft_utils::{FftProcessor, Normalization};
    use crate::noise::NoiseGenerator;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_bad_bin() {
        assert!(ToneProbe::new(0, 0).unwrap_err().is_configuration());
        assert!(ToneProbe::new(512, 512).unwrap_err().is_configuration());
    }

    #[test]
    fn test_tone_sums_to_n() {
        let probe = ToneProbe::new(512, 16).unwrap();
        let c = probe.coefficient(&probe.tone()).unwrap();
        assert_relative_eq!(c.re, 512.0, epsilon = 1e-8);
        assert!(c.im.abs() < 1e-8);
    }

    #[test]
    fn test_coefficient_matches_fft_bin() {
        let n = 128;
        let probe = ToneProbe::new(n, 9).unwrap();
        let mut noise = NoiseGenerator::new(n, 0.0, Some(4)).unwrap();
        let x = noise.generate().into_samples();
        let mut fft = FftProcessor::new(n, Normalization::Unscaled).unwrap();
        let spectrum = fft.fft(&x).unwrap();
        let c = probe.coefficient(&x).unwrap();
        assert!((c - spectrum[9]).norm() < 1e-9);
    }

    #[test]
    fn test_coherent_gain() {
        // E|Σ n·h|² = N·P, so the mean SNR over trials approaches 10·log10(N).
        let n = 512;
        let probe = ToneProbe::new(n, 16).unwrap();
        let tone = probe.tone();
        let mut noise = NoiseGenerator::new(n, 0.0, Some(21)).unwrap();

        let trials = 2000;
        let mean_noise_power: f64 = (0..trials)
            .map(|_| probe.coefficient(noise.generate().samples()).unwrap().norm_sqr())
            .sum::<f64>()
            / trials as f64;
        let gain_db = to_db((n * n) as f64 / mean_noise_power).unwrap();
        assert!((gain_db - 10.0 * (n as f64).log10()).abs() < 0.5, "gain {gain_db}");

        let report = probe.measure(&tone, noise.generate().samples()).unwrap();
        assert_eq!(report.bin, 16);
        assert_relative_eq!(report.signal_magnitude, 512.0, epsilon = 1e-8);
        assert!(report.snr_db.is_finite());
    }

    #[test]
    fn test_zero_noise_is_degenerate() {
        let probe = ToneProbe::new(64, 3).unwrap();
        let zeros = vec![Complex::new(0.0, 0.0); 64];
        assert!(matches!(
            probe.measure(&probe.tone(), &zeros).unwrap_err(),
            DspError::NumericDegeneracy(_)
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let probe = ToneProbe::new(64, 3).unwrap();
        assert!(probe.coefficient(&probe.tone()[..63]).is_err());
    }
}

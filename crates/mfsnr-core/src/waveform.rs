//! LFM Pulse Synthesis
//!
//! Generates the gated linear-frequency-modulated chirp that stands in for
//! a radar transmission, and the impulse response matched to it.
//!
//! ## Instantaneous frequency
//!
//! ```text
//! Frequency
//!      ^
//! f0+Δ |       /            \
//!      |     /                \
//!      |   /                    \
//!   f0 | /                        \
//!      +----------> t    +----------> t
//!      0          T0     0          T0
//!         chirp             reference
//! ```
//!
//! With chirp rate `Sr = Δ / (2·T0)`:
//!
//! ```text
//! chirp(t)     = A · exp(j·2π·(f0 + Sr·t)·t)          0 ≤ t < T0
//! reference(t) =     exp(j·2π·((Δ + f0) − Sr·t)·t)    0 ≤ t < T0
//! ```
//!
//! Convolving the two cancels the quadratic phase, so the pulse energy
//! collapses into a peak one pulse length after the start of the frame.
//!
//! The gate is evaluated on the sample grid `t = n·dt`: sample `n` is
//! active iff `n·dt < T0`, i.e. `n < ceil(T0/dt)`. Everything outside the
//! gate is exactly zero. The nominal pulse length `Ns = round(T0/dt)` is
//! kept separately for the processing gain; the two agree whenever `T0` is
//! a whole number of samples.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::fft_utils::time_axis;
use crate::types::{Complex, DspError, DspResult, IQBuffer, IQSample};

/// Relative slack when comparing `T0` with the frame duration `N·dt`, and
/// when snapping `T0/dt` to a whole number of samples.
const FRAME_TOLERANCE: f64 = 1e-9;

/// Parameters of one chirp frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChirpParams {
    /// Frame length N
    pub num_samples: usize,
    /// Sample interval dt (seconds)
    pub sample_interval: f64,
    /// Start frequency f0 (Hz)
    pub start_frequency: f64,
    /// Total sweep Δ (Hz)
    pub deviation: f64,
    /// Pulse duration T0 (seconds)
    pub pulse_duration: f64,
    /// Linear amplitude of the transmitted chirp
    pub amplitude: f64,
}

impl ChirpParams {
    /// Check the constraints `N > 0`, `dt > 0`, `0 < T0 ≤ N·dt`.
    ///
    /// A pulse shorter than half a sample rounds to zero samples and is
    /// reported as a degeneracy rather than a configuration error.
    pub fn validate(&self) -> DspResult<()> {
        if self.num_samples == 0 {
            return Err(DspError::invalid("num_samples", "must be > 0"));
        }
        if !(self.sample_interval.is_finite() && self.sample_interval > 0.0) {
            return Err(DspError::invalid(
                "sample_interval",
                format!("must be finite and > 0, got {}", self.sample_interval),
            ));
        }
        if !self.start_frequency.is_finite() {
            return Err(DspError::invalid("start_frequency", "must be finite"));
        }
        if !self.deviation.is_finite() {
            return Err(DspError::invalid("deviation", "must be finite"));
        }
        if !(self.amplitude.is_finite() && self.amplitude > 0.0) {
            return Err(DspError::invalid(
                "amplitude",
                format!("must be finite and > 0, got {}", self.amplitude),
            ));
        }

        let frame = self.frame_duration();
        if !(self.pulse_duration.is_finite() && self.pulse_duration > 0.0) {
            return Err(DspError::invalid(
                "pulse_duration",
                format!("must be in (0, {frame:e}], got {}", self.pulse_duration),
            ));
        }
        if self.pulse_duration > frame * (1.0 + FRAME_TOLERANCE) {
            return Err(DspError::invalid(
                "pulse_duration",
                format!(
                    "must not exceed the frame duration N*dt = {frame:e}, got {:e}",
                    self.pulse_duration
                ),
            ));
        }
        if self.pulse_samples() == 0 {
            return Err(DspError::NumericDegeneracy(format!(
                "pulse_duration {:e} s rounds to zero samples at dt = {:e} s",
                self.pulse_duration, self.sample_interval
            )));
        }
        Ok(())
    }

    /// `N·dt`
    pub fn frame_duration(&self) -> f64 {
        self.num_samples as f64 * self.sample_interval
    }

    /// Pulse length in samples, `Ns = round(T0/dt)`, capped at N.
    pub fn pulse_samples(&self) -> usize {
        let ns = (self.pulse_duration / self.sample_interval).round();
        if ns.is_finite() && ns > 0.0 {
            (ns as usize).min(self.num_samples)
        } else {
            0
        }
    }

    /// Samples with `n·dt < T0`, capped at N.
    ///
    /// A ratio `T0/dt` within rounding error of an integer counts as that
    /// integer, so `T0 = k·dt` gates exactly `k` samples.
    pub fn gate_samples(&self) -> usize {
        let ratio = self.pulse_duration / self.sample_interval;
        if !(ratio.is_finite() && ratio > 0.0) {
            return 0;
        }
        let nearest = ratio.round();
        let count = if (ratio - nearest).abs() <= FRAME_TOLERANCE * nearest.max(1.0) {
            nearest
        } else {
            ratio.ceil()
        };
        (count as usize).min(self.num_samples)
    }

    /// `Sr = Δ / (2·T0)` in Hz/s.
    pub fn chirp_rate(&self) -> f64 {
        self.deviation / (2.0 * self.pulse_duration)
    }
}

/// A gated, fixed-length complex sample sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waveform {
    samples: IQBuffer,
    sample_interval: f64,
    pulse_duration: f64,
    pulse_samples: usize,
    gate_samples: usize,
}

impl Waveform {
    pub fn samples(&self) -> &[IQSample] {
        &self.samples
    }

    pub fn into_samples(self) -> IQBuffer {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_interval(&self) -> f64 {
        self.sample_interval
    }

    pub fn pulse_duration(&self) -> f64 {
        self.pulse_duration
    }

    /// Nominal pulse length `Ns = round(T0/dt)`.
    pub fn pulse_samples(&self) -> usize {
        self.pulse_samples
    }

    /// Number of samples inside the gate `n·dt < T0`.
    pub fn gate_samples(&self) -> usize {
        self.gate_samples
    }

    /// The samples inside the gate.
    pub fn active(&self) -> &[IQSample] {
        &self.samples[..self.gate_samples]
    }

    /// Per-sample gate mask.
    pub fn gate(&self) -> Vec<bool> {
        (0..self.samples.len())
            .map(|n| n < self.gate_samples)
            .collect()
    }

    pub fn time_axis(&self) -> Vec<f64> {
        time_axis(self.samples.len(), self.sample_interval)
    }
}

/// Builds chirp and reference frames from validated [`ChirpParams`].
#[derive(Debug, Clone)]
pub struct WaveformGenerator {
    params: ChirpParams,
}

impl WaveformGenerator {
    pub fn new(params: ChirpParams) -> DspResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ChirpParams {
        &self.params
    }

    /// The transmitted pulse: sweep from f0 to f0+Δ over the gate.
    pub fn chirp(&self) -> Waveform {
        let p = &self.params;
        let sr = p.chirp_rate();
        self.gated(|t| Complex::from_polar(p.amplitude, 2.0 * PI * (p.start_frequency + sr * t) * t))
    }

    /// Impulse response matched to [`chirp`](Self::chirp), unit amplitude.
    pub fn reference(&self) -> Waveform {
        let p = &self.params;
        let sr = p.chirp_rate();
        let top = p.deviation + p.start_frequency;
        self.gated(|t| Complex::from_polar(1.0, 2.0 * PI * (top - sr * t) * t))
    }

    fn gated(&self, f: impl Fn(f64) -> IQSample) -> Waveform {
        let p = &self.params;
        let gate = p.gate_samples();
        let samples = (0..p.num_samples)
            .map(|n| {
                if n < gate {
                    f(n as f64 * p.sample_interval)
                } else {
                    Complex::new(0.0, 0.0)
                }
            })
            .collect();

        Waveform {
            samples,
            sample_interval: p.sample_interval,
            pulse_duration: p.pulse_duration,
            pulse_samples: p.pulse_samples(),
            gate_samples: gate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> ChirpParams {
        let dt = 1.0 / 100e6;
        ChirpParams {
            num_samples: 1024,
            sample_interval: dt,
            start_frequency: 0.0,
            deviation: 20e6,
            pulse_duration: 256.0 * dt,
            amplitude: 1.0,
        }
    }

    #[test]
    fn test_pulse_samples_and_rate() {
        let p = params();
        assert_eq!(p.pulse_samples(), 256);
        assert_relative_eq!(p.chirp_rate(), 20e6 / (2.0 * 256e-8), max_relative = 1e-12);
    }

    #[test]
    fn test_gate_zeroes_outside_pulse() {
        let gen = WaveformGenerator::new(params()).unwrap();
        for wf in [gen.chirp(), gen.reference()] {
            assert_eq!(wf.len(), 1024);
            assert_eq!(wf.pulse_samples(), 256);
            assert_eq!(wf.active().len(), 256);
            assert!(wf.samples()[256..].iter().all(|s| *s == Complex::new(0.0, 0.0)));
            assert!(wf.active().iter().all(|s| (s.norm() - 1.0).abs() < 1e-12));
            let gate = wf.gate();
            assert!(gate[255] && !gate[256]);
        }
    }

    #[test]
    fn test_chirp_starts_at_zero_phase() {
        let gen = WaveformGenerator::new(params()).unwrap();
        assert_relative_eq!(gen.chirp().samples()[0].re, 1.0);
        assert_relative_eq!(gen.reference().samples()[0].re, 1.0);
    }

    #[test]
    fn test_instantaneous_frequency_sweeps_up() {
        // Phase increment per sample ≈ 2π·f_inst·dt.
        let gen = WaveformGenerator::new(params()).unwrap();
        let chirp = gen.chirp();
        let s = chirp.samples();
        let dt = params().sample_interval;
        let f_at = |n: usize| (s[n + 1] * s[n].conj()).arg() / (2.0 * PI * dt);
        assert!(f_at(0).abs() < 0.2e6);
        assert!((f_at(254) - 20e6).abs() < 0.2e6);
    }

    #[test]
    fn test_amplitude_scales_chirp_only() {
        let mut p = params();
        p.amplitude = 2.0;
        let gen = WaveformGenerator::new(p).unwrap();
        assert_relative_eq!(gen.chirp().samples()[10].norm(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(gen.reference().samples()[10].norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pulse_fills_frame() {
        let mut p = params();
        p.pulse_duration = p.frame_duration();
        let gen = WaveformGenerator::new(p).unwrap();
        let chirp = gen.chirp();
        assert_eq!(chirp.pulse_samples(), 1024);
        assert!(chirp.samples().iter().all(|s| s.norm() > 0.5));
    }

    #[test]
    fn test_single_sample_pulse() {
        let mut p = params();
        p.pulse_duration = p.sample_interval;
        let gen = WaveformGenerator::new(p).unwrap();
        let chirp = gen.chirp();
        assert_eq!(chirp.pulse_samples(), 1);
        assert_eq!(chirp.gate_samples(), 1);
        assert_eq!(chirp.samples()[0], Complex::new(1.0, 0.0));
        assert!(chirp.samples()[1..].iter().all(|s| s.norm() == 0.0));
    }

    #[test]
    fn test_fractional_pulse_gates_every_sample_before_t0() {
        let mut p = params();
        p.num_samples = 16;
        p.pulse_duration = 2.4 * p.sample_interval;
        let gen = WaveformGenerator::new(p).unwrap();
        let chirp = gen.chirp();

        assert_eq!(chirp.pulse_samples(), 2);
        assert_eq!(chirp.gate_samples(), 3);
        assert_eq!(chirp.active().len(), 3);
        assert!(chirp.samples()[2].norm() > 0.5);
        assert!(chirp.samples()[3..].iter().all(|s| s.norm() == 0.0));
        for (n, (s, on)) in chirp.samples().iter().zip(chirp.gate()).enumerate() {
            let t = n as f64 * p.sample_interval;
            assert_eq!(on, t < p.pulse_duration, "sample {n}");
            assert_eq!(s.norm() > 0.0, on, "sample {n}");
        }

        p.pulse_duration = 2.6 * p.sample_interval;
        assert_eq!(p.pulse_samples(), 3);
        assert_eq!(p.gate_samples(), 3);
    }

    #[test]
    fn test_whole_sample_pulse_gate_matches_ns() {
        // 500 · (1/50 MHz) is not bit-exact 10 µs.
        let p = ChirpParams {
            num_samples: 2048,
            sample_interval: 1.0 / 50e6,
            pulse_duration: 10e-6,
            ..params()
        };
        assert_eq!(p.pulse_samples(), 500);
        assert_eq!(p.gate_samples(), 500);
    }

    #[test]
    fn test_invalid_params() {
        let mut p = params();
        p.num_samples = 0;
        assert!(p.validate().unwrap_err().is_configuration());

        let mut p = params();
        p.sample_interval = 0.0;
        assert!(p.validate().unwrap_err().is_configuration());

        let mut p = params();
        p.pulse_duration = -1e-6;
        assert!(p.validate().unwrap_err().is_configuration());

        let mut p = params();
        p.pulse_duration = p.frame_duration() * 1.01;
        match p.validate().unwrap_err() {
            DspError::InvalidConfig { parameter, .. } => assert_eq!(parameter, "pulse_duration"),
            other => panic!("unexpected {other:?}"),
        }

        let mut p = params();
        p.deviation = f64::NAN;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_sub_sample_pulse_is_degenerate() {
        let mut p = params();
        p.pulse_duration = 0.4 * p.sample_interval;
        assert!(matches!(
            WaveformGenerator::new(p).unwrap_err(),
            DspError::NumericDegeneracy(_)
        ));
    }
}

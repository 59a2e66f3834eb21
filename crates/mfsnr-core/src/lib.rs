//! # Matched-Filter SNR Core
//!
//! Frequency-domain matched filtering of linear-FM radar pulses and the
//! power bookkeeping that shows its processing gain.
//!
//! ## Overview
//!
//! A chirp of `Ns` samples sweeping `Δ` Hz is buried in complex white
//! Gaussian noise, then compressed by correlating against a reference
//! chirp in the frequency domain. The compressed peak rises about
//! `10·log10(Ns)` dB above the input signal power while the noise floor
//! stays put, and [`PowerMetrics`] measures exactly that:
//!
//! - **Waveforms**: gated LFM chirp and its matched reference
//! - **Noise**: seeded circularly-symmetric complex AWGN
//! - **Correlation**: `IDFT(DFT(x)·DFT(h))` under an explicit [`Normalization`]
//! - **Metrics**: input/output power, peak, processing gain and SNR in dB
//! - **Tone probe**: single-bin DFT coherent gain
//!
//! ## Signal Flow
//!
//! ```text
//! config → WaveformGenerator → chirp ─┬─► SpectralCorrelator ─► PowerMetrics → PowerReport
//!          NoiseGenerator   → noise ──┘          ▲
//!          WaveformGenerator → reference ────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use mfsnr_core::{run_once, SimulationConfig};
//!
//! let config = SimulationConfig::default().with_seed(7).without_noise();
//! let run = run_once(config).unwrap();
//! let report = run.report();
//! assert!((report.measured_gain_db() - report.processing_gain_db).abs() < 0.5);
//! ```

pub mod config;
pub mod correlator;
pub mod fft_utils;
pub mod noise;
pub mod observe;
pub mod pipeline;
pub mod power;
pub mod tone;
pub mod types;
pub mod waveform;

pub use config::{ConfigError, PowerLevels, SimulationConfig};
pub use correlator::{correlate, CorrelatedBranches, MatchedFilterResult, SpectralCorrelator, Spectrum};
pub use fft_utils::{FftProcessor, Normalization};
pub use noise::{NoiseGenerator, NoiseRealization};
pub use pipeline::{run_once, MatchedFilterPipeline, MatchedFilterRun};
pub use power::{PowerMetrics, PowerReport};
pub use tone::{BinSnrReport, ToneProbe};
pub use types::{Complex, DspError, DspResult, IQBuffer, IQSample};
pub use waveform::{ChirpParams, Waveform, WaveformGenerator};

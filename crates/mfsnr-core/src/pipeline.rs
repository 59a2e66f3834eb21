//! # Matched-Filter Pipeline
//!
//! Wires the stages of one run together:
//!
//! ```text
//!   chirp ───────────────┐
//!                        ├──► SpectralCorrelator ──► CorrelatedBranches ──► PowerMetrics
//!   noise (optional) ────┘          ▲
//!   reference ──────────────────────┘
//! ```
//!
//! The chirp, its reference and the correlator are built once in
//! [`MatchedFilterPipeline::new`]; every [`run`](MatchedFilterPipeline::run)
//! draws a fresh noise realization from the pipeline's own RNG.
//!
//! ## Example
//!
//! ```rust
//! use mfsnr_core::config::SimulationConfig;
//! use mfsnr_core::pipeline::MatchedFilterPipeline;
//!
//! let config = SimulationConfig::default().with_seed(42).with_input_snr(-10.0);
//! let mut pipeline = MatchedFilterPipeline::new(config).unwrap();
//! let run = pipeline.run().unwrap();
//! assert!(run.report().output_snr_db.unwrap() > 0.0);
//! ```

use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::correlator::{CorrelatedBranches, MatchedFilterResult, SpectralCorrelator, Spectrum};
use crate::fft_utils::{frequency_axis, time_axis};
use crate::noise::{NoiseGenerator, NoiseRealization};
use crate::power::{PowerMetrics, PowerReport};
use crate::types::{DspResult, IQBuffer};
use crate::waveform::{Waveform, WaveformGenerator};

/// Every intermediate product of one run, plus its report.
#[derive(Debug, Clone)]
pub struct MatchedFilterRun {
    chirp: Waveform,
    reference: Waveform,
    noise: Option<NoiseRealization>,
    reference_spectrum: Spectrum,
    signal_spectrum: Spectrum,
    noise_spectrum: Option<Spectrum>,
    filtered: CorrelatedBranches,
    report: PowerReport,
    sample_rate: f64,
}

impl MatchedFilterRun {
    pub fn chirp(&self) -> &Waveform {
        &self.chirp
    }

    pub fn reference(&self) -> &Waveform {
        &self.reference
    }

    pub fn noise(&self) -> Option<&NoiseRealization> {
        self.noise.as_ref()
    }

    pub fn reference_spectrum(&self) -> &Spectrum {
        &self.reference_spectrum
    }

    pub fn signal_spectrum(&self) -> &Spectrum {
        &self.signal_spectrum
    }

    pub fn noise_spectrum(&self) -> Option<&Spectrum> {
        self.noise_spectrum.as_ref()
    }

    pub fn filtered(&self) -> &CorrelatedBranches {
        &self.filtered
    }

    pub fn correlated_signal(&self) -> &MatchedFilterResult {
        self.filtered.signal()
    }

    pub fn correlated_noise(&self) -> Option<&MatchedFilterResult> {
        self.filtered.noise()
    }

    pub fn report(&self) -> &PowerReport {
        &self.report
    }

    /// Filtered signal plus filtered noise.
    pub fn combined(&self) -> IQBuffer {
        self.filtered.combined()
    }

    /// Sample times `n·dt` in seconds.
    pub fn time_axis(&self) -> Vec<f64> {
        time_axis(self.chirp.len(), self.chirp.sample_interval())
    }

    /// Bin frequencies `k·Fs/N` in Hz, unshifted.
    pub fn frequency_axis(&self) -> Vec<f64> {
        frequency_axis(self.chirp.len(), self.sample_rate)
    }
}

/// Reusable chirp / noise / correlator chain for one configuration.
#[derive(Debug)]
pub struct MatchedFilterPipeline {
    config: SimulationConfig,
    chirp: Waveform,
    reference: Waveform,
    noise: Option<NoiseGenerator>,
    correlator: SpectralCorrelator,
    metrics: PowerMetrics,
}

impl MatchedFilterPipeline {
    /// Validate `config` and build every stage; fails before any run work.
    pub fn new(config: SimulationConfig) -> DspResult<Self> {
        config.validate()?;

        let generator = WaveformGenerator::new(config.chirp_params())?;
        let chirp = generator.chirp();
        let reference = generator.reference();

        let noise = config
            .noise_power_db()
            .map(|pn| NoiseGenerator::new(config.num_samples, pn, config.seed))
            .transpose()?;

        let correlator = SpectralCorrelator::new(reference.samples(), config.normalization)?;

        debug!(
            num_samples = config.num_samples,
            pulse_samples = chirp.pulse_samples(),
            chirp_rate = config.chirp_rate(),
            normalization = %config.normalization,
            noise = noise.is_some(),
            "built matched filter pipeline"
        );

        Ok(Self {
            config,
            chirp,
            reference,
            noise,
            correlator,
            metrics: PowerMetrics,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn chirp(&self) -> &Waveform {
        &self.chirp
    }

    pub fn reference(&self) -> &Waveform {
        &self.reference
    }

    pub fn correlator(&self) -> &SpectralCorrelator {
        &self.correlator
    }

    /// Run the chain once with a fresh noise realization.
    pub fn run(&mut self) -> DspResult<MatchedFilterRun> {
        let noise = self.noise.as_mut().map(NoiseGenerator::generate);

        let signal_spectrum = self.correlator.transform(self.chirp.samples())?;
        let noise_spectrum = noise
            .as_ref()
            .map(|n| self.correlator.transform(n.samples()))
            .transpose()?;

        let filtered = self
            .correlator
            .filter_spectra(&signal_spectrum, noise_spectrum.as_ref())?;
        debug!(
            peak = ?filtered.signal().peak(),
            level_offset_db = filtered.level_offset_db(),
            "correlated branches"
        );

        let report = self.metrics.evaluate(&self.chirp, noise.as_ref(), &filtered)?;
        info!(%report, "matched filter run complete");

        Ok(MatchedFilterRun {
            chirp: self.chirp.clone(),
            reference: self.reference.clone(),
            noise,
            reference_spectrum: self.correlator.reference_spectrum().clone(),
            signal_spectrum,
            noise_spectrum,
            filtered,
            report,
            sample_rate: self.config.sample_rate,
        })
    }
}

/// Build a pipeline for `config` and run it once.
pub fn run_once(config: SimulationConfig) -> DspResult<MatchedFilterRun> {
    MatchedFilterPipeline::new(config)?.run()
}

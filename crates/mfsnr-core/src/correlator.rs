//! Spectral Correlator: Matched Filtering by Multiplication in Frequency
//!
//! ```text
//!   x ──► DFT ──► X ─┐
//!                    ×──► P[k] = X[k]·H[k] ──► IDFT ──► y
//!   h ──► DFT ──► H ─┘
//! ```
//!
//! The product of two length-N spectra is a *circular* convolution: the
//! pulse and the reference both repeat with period N, so a compressed peak
//! that would fall past the end of the frame wraps to its start. For a
//! chirp of `Ns` samples the peak sits about one pulse length in (bin
//! `Ns − 1 … Ns`), or near bin 0 when the pulse fills the whole frame.
//!
//! One [`SpectralCorrelator`] holds the reference spectrum and a single
//! [`FftProcessor`]. Signal and noise are filtered by the same instance via
//! [`filter_branches`](SpectralCorrelator::filter_branches) (or
//! [`filter_spectra`](SpectralCorrelator::filter_spectra) for frames already
//! transformed), the only way to build the [`CorrelatedBranches`] that
//! [`PowerMetrics`](crate::power::PowerMetrics) accepts.
//!
//! ## Example
//!
//! ```rust
//! use mfsnr_core::correlator::SpectralCorrelator;
//! use mfsnr_core::fft_utils::Normalization;
//! use num_complex::Complex64;
//!
//! let mut reference = vec![Complex64::new(0.0, 0.0); 64];
//! reference[..8].iter_mut().for_each(|s| *s = Complex64::new(1.0, 0.0));
//! let mut corr = SpectralCorrelator::new(&reference, Normalization::Unscaled).unwrap();
//!
//! let mut pulse = vec![Complex64::new(0.0, 0.0); 64];
//! pulse[0] = Complex64::new(1.0, 0.0);
//! let y = corr.correlate(&pulse).unwrap();
//! assert_eq!(y.len(), 64);
//! ```

use serde::Serialize;
use tracing::debug;

use crate::fft_utils::{FftProcessor, Normalization};
use crate::types::{ensure_len, DspError, DspResult, IQBuffer, IQSample};

/// Frequency-domain view of a frame, tagged with the convention that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    bins: IQBuffer,
    normalization: Normalization,
}

impl Spectrum {
    pub fn bins(&self) -> &[IQSample] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// `Σ|X[k]|²`
    pub fn energy(&self) -> f64 {
        self.bins.iter().map(|b| b.norm_sqr()).sum()
    }

    /// Display-only dB spectrum.
    pub fn power_db(&self) -> Vec<f64> {
        FftProcessor::power_spectrum_db(&self.bins)
    }

    pub fn magnitude(&self) -> Vec<f64> {
        FftProcessor::magnitude_spectrum(&self.bins)
    }
}

/// Time-domain output of the matched filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedFilterResult {
    samples: IQBuffer,
    normalization: Normalization,
}

impl MatchedFilterResult {
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

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// `(bin, |y|²)` of the strongest output sample.
    pub fn peak(&self) -> Option<(usize, f64)> {
        FftProcessor::find_peak(&self.samples)
    }

    /// Display-only `10·log10|y|²`.
    pub fn power_db(&self) -> Vec<f64> {
        FftProcessor::power_spectrum_db(&self.samples)
    }
}

/// Signal and noise outputs of one correlator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedBranches {
    signal: MatchedFilterResult,
    noise: Option<MatchedFilterResult>,
    level_offset_db: f64,
}

impl CorrelatedBranches {
    pub fn signal(&self) -> &MatchedFilterResult {
        &self.signal
    }

    pub fn noise(&self) -> Option<&MatchedFilterResult> {
        self.noise.as_ref()
    }

    pub fn normalization(&self) -> Normalization {
        self.signal.normalization
    }

    pub fn level_offset_db(&self) -> f64 {
        self.level_offset_db
    }

    /// What the receiver sees: filtered signal plus filtered noise.
    pub fn combined(&self) -> IQBuffer {
        match &self.noise {
            Some(noise) => self
                .signal
                .samples
                .iter()
                .zip(&noise.samples)
                .map(|(s, n)| s + n)
                .collect(),
            None => self.signal.samples.clone(),
        }
    }
}

/// Frequency-domain matched filter for one reference response.
#[derive(Debug)]
pub struct SpectralCorrelator {
    processor: FftProcessor,
    reference_spectrum: Spectrum,
    reference_energy: f64,
    /// Scalar folded into every product (`1/√E_h` for `ReferenceEnergy`)
    filter_gain: f64,
}

impl SpectralCorrelator {
    /// Plan transforms for `reference.len()` and precompute `H = DFT(h)`.
    pub fn new(reference: &[IQSample], normalization: Normalization) -> DspResult<Self> {
        let n = reference.len();
        let mut processor = FftProcessor::new(n, normalization)?;

        let reference_energy: f64 = reference.iter().map(|s| s.norm_sqr()).sum();
        if !(reference_energy.is_finite() && reference_energy > 0.0) {
            return Err(DspError::NumericDegeneracy(format!(
                "reference response has energy {reference_energy}"
            )));
        }

        let filter_gain = match normalization {
            Normalization::ReferenceEnergy => 1.0 / reference_energy.sqrt(),
            _ => 1.0,
        };

        let bins = processor.fft(reference)?;
        debug!(
            size = n,
            %normalization,
            reference_energy,
            "planned spectral correlator"
        );

        Ok(Self {
            processor,
            reference_spectrum: Spectrum {
                bins,
                normalization,
            },
            reference_energy,
            filter_gain,
        })
    }

    /// Frame length N.
    pub fn size(&self) -> usize {
        self.processor.size()
    }

    pub fn normalization(&self) -> Normalization {
        self.processor.normalization()
    }

    /// `E_h = Σ|h|²`
    pub fn reference_energy(&self) -> f64 {
        self.reference_energy
    }

    pub fn reference_spectrum(&self) -> &Spectrum {
        &self.reference_spectrum
    }

    /// Level shift of this convention relative to `ReferenceEnergy`, in dB.
    ///
    /// `ReferenceEnergy` leaves white noise power unchanged, so the offset
    /// converts any convention's output levels onto that scale.
    pub fn level_offset_db(&self) -> f64 {
        let n = self.size();
        let amplitude = self.normalization().convolution_scale(n)
            * self.filter_gain
            * self.reference_energy.sqrt();
        20.0 * amplitude.log10()
    }

    /// Forward transform under this correlator's convention.
    pub fn transform(&mut self, x: &[IQSample]) -> DspResult<Spectrum> {
        let bins = self.processor.fft(x)?;
        Ok(Spectrum {
            bins,
            normalization: self.normalization(),
        })
    }

    /// Filter an already-transformed frame.
    pub fn correlate_spectrum(&mut self, spectrum: &Spectrum) -> DspResult<MatchedFilterResult> {
        ensure_len(self.size(), spectrum.len())?;
        if spectrum.normalization != self.normalization() {
            return Err(DspError::invalid(
                "normalization",
                format!(
                    "spectrum computed as {} but correlator uses {}",
                    spectrum.normalization,
                    self.normalization()
                ),
            ));
        }

        let gain = self.filter_gain;
        let mut product: IQBuffer = spectrum
            .bins
            .iter()
            .zip(&self.reference_spectrum.bins)
            .map(|(x, h)| x * h * gain)
            .collect();
        self.processor.ifft_inplace(&mut product)?;

        Ok(MatchedFilterResult {
            samples: product,
            normalization: self.normalization(),
        })
    }

    /// `y = IDFT(DFT(x)·H)`.
    pub fn correlate(&mut self, x: &[IQSample]) -> DspResult<MatchedFilterResult> {
        let spectrum = self.transform(x)?;
        self.correlate_spectrum(&spectrum)
    }

    /// Filter the signal and (optionally) the noise with this instance.
    pub fn filter_branches(
        &mut self,
        signal: &[IQSample],
        noise: Option<&[IQSample]>,
    ) -> DspResult<CorrelatedBranches> {
        let signal = self.correlate(signal)?;
        let noise = noise.map(|n| self.correlate(n)).transpose()?;
        Ok(CorrelatedBranches {
            signal,
            noise,
            level_offset_db: self.level_offset_db(),
        })
    }

    /// [`filter_branches`](Self::filter_branches) for spectra from
    /// [`transform`](Self::transform); skips the forward FFTs.
    pub fn filter_spectra(
        &mut self,
        signal: &Spectrum,
        noise: Option<&Spectrum>,
    ) -> DspResult<CorrelatedBranches> {
        let signal = self.correlate_spectrum(signal)?;
        let noise = noise.map(|n| self.correlate_spectrum(n)).transpose()?;
        Ok(CorrelatedBranches {
            signal,
            noise,
            level_offset_db: self.level_offset_db(),
        })
    }
}

/// One-shot `correlate(x, h)`; `x` and `h` must have the same length.
pub fn correlate(
    x: &[IQSample],
    h: &[IQSample],
    normalization: Normalization,
) -> DspResult<MatchedFilterResult> {
    ensure_len(h.len(), x.len())?;
    SpectralCorrelator::new(h, normalization)?.correlate(x)
}

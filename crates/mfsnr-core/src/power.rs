//! Power and SNR metrics in dB
//!
//! Reduces sample sequences to scalar power levels referenced to unit
//! power (0 dB) and derives the matched-filter figures of merit:
//!
//! ```text
//! power_db(v)          = 10·log10(mean |v|²)
//! peak_power_db(v)     = 10·log10(max  |v|²)
//! processing_gain_db   = 10·log10(Ns)
//! input_snr_db         = power_db(signal over gate) − power_db(noise)
//! output_snr_db        = peak_power_db(filtered signal) − power_db(filtered noise)
//! ```
//!
//! Unlike a display spectrum these conversions never floor: a zero or
//! non-finite power is a [`DspError::NumericDegeneracy`].

use serde::Serialize;
use std::fmt;

use crate::correlator::CorrelatedBranches;
use crate::noise::NoiseRealization;
use crate::types::{ensure_len, DspError, DspResult, IQSample};
use crate::waveform::Waveform;

/// `10·log10(power)`; zero, negative or non-finite power is degenerate.
pub fn to_db(power: f64) -> DspResult<f64> {
    if power.is_finite() && power > 0.0 {
        Ok(10.0 * power.log10())
    } else {
        Err(DspError::NumericDegeneracy(format!(
            "cannot express power {power} in dB"
        )))
    }
}

/// `10^(db/10)`
#[inline]
pub fn from_db(db: f64) -> f64 {
    10.0f64.powf(db / 10.0)
}

/// `10^(db/20)`
#[inline]
pub fn db_to_amplitude(db: f64) -> f64 {
    10.0f64.powf(db / 20.0)
}

/// Mean of `|v|²`.
pub fn mean_power(samples: &[IQSample]) -> DspResult<f64> {
    if samples.is_empty() {
        return Err(DspError::NumericDegeneracy(
            "average power of an empty buffer".into(),
        ));
    }
    Ok(samples.iter().map(|s| s.norm_sqr()).sum::<f64>() / samples.len() as f64)
}

/// Average power in dB.
pub fn power_db(samples: &[IQSample]) -> DspResult<f64> {
    to_db(mean_power(samples)?)
}

/// Index and value of the largest `|v|²`.
pub fn peak_power(samples: &[IQSample]) -> DspResult<(usize, f64)> {
    crate::fft_utils::FftProcessor::find_peak(samples).ok_or_else(|| {
        DspError::NumericDegeneracy("peak power of an empty buffer".into())
    })
}

/// Peak power in dB.
pub fn peak_power_db(samples: &[IQSample]) -> DspResult<f64> {
    to_db(peak_power(samples)?.1)
}

/// Theoretical matched-filter gain over a one-sample detector, `10·log10(Ns)`.
pub fn processing_gain_db(pulse_samples: usize) -> DspResult<f64> {
    if pulse_samples == 0 {
        return Err(DspError::NumericDegeneracy(
            "processing gain of a zero-length pulse".into(),
        ));
    }
    to_db(pulse_samples as f64)
}

/// Scalar summary of one matched-filter run.
///
/// All levels are dB re unit power. Output levels are in the units of the
/// correlator's normalization; `level_offset_db` is that convention's
/// shift, so `output_peak_power_db ≈ input_signal_power_db +
/// processing_gain_db + level_offset_db` for a noiseless pulse.
///
/// Noise-dependent fields are `None` when the run has no noise branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerReport {
    pub input_signal_power_db: f64,
    pub input_noise_power_db: Option<f64>,
    pub output_peak_power_db: f64,
    /// Sample index of the compressed peak
    pub peak_bin: usize,
    pub output_signal_average_power_db: f64,
    pub output_noise_power_db: Option<f64>,
    pub processing_gain_db: f64,
    pub level_offset_db: f64,
    pub input_snr_db: Option<f64>,
    pub output_snr_db: Option<f64>,
}

impl PowerReport {
    /// Measured `output_snr_db − input_snr_db`.
    pub fn snr_improvement_db(&self) -> Option<f64> {
        Some(self.output_snr_db? - self.input_snr_db?)
    }

    /// Peak relative to input power with the convention offset removed.
    pub fn measured_gain_db(&self) -> f64 {
        self.output_peak_power_db - self.input_signal_power_db - self.level_offset_db
    }
}

impl fmt::Display for PowerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(v: Option<f64>) -> String {
            v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
        }
        write!(
            f,
            "Ps={:.2} dB Pn={} dB peak={:.2} dB @{} noise_out={} dB gain={:.2} dB SNR in={} dB out={} dB",
            self.input_signal_power_db,
            opt(self.input_noise_power_db),
            self.output_peak_power_db,
            self.peak_bin,
            opt(self.output_noise_power_db),
            self.processing_gain_db,
            opt(self.input_snr_db),
            opt(self.output_snr_db),
        )
    }
}

/// Reduces pipeline buffers to a [`PowerReport`].
///
/// Takes the filtered outputs as one [`CorrelatedBranches`] value, which
/// only a single correlator can produce, so both branches always share a
/// normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerMetrics;

impl PowerMetrics {
    pub fn evaluate(
        &self,
        signal: &Waveform,
        noise: Option<&NoiseRealization>,
        filtered: &CorrelatedBranches,
    ) -> DspResult<PowerReport> {
        let n = signal.len();
        ensure_len(n, filtered.signal().len())?;

        let input_signal_power_db = power_db(signal.active())?;
        let (peak_bin, peak) = peak_power(filtered.signal().samples())?;
        let output_peak_power_db = to_db(peak)?;
        let output_signal_average_power_db = power_db(filtered.signal().samples())?;
        let processing_gain_db = processing_gain_db(signal.pulse_samples())?;

        let (input_noise_power_db, output_noise_power_db) = match (noise, filtered.noise()) {
            (Some(raw), Some(out)) => {
                ensure_len(n, raw.len())?;
                ensure_len(n, out.len())?;
                (Some(power_db(raw.samples())?), Some(power_db(out.samples())?))
            }
            (None, None) => (None, None),
            _ => {
                return Err(DspError::invalid(
                    "noise",
                    "raw and filtered noise must be supplied together",
                ))
            }
        };

        let input_snr_db = input_noise_power_db.map(|pn| input_signal_power_db - pn);
        let output_snr_db = output_noise_power_db.map(|pn| output_peak_power_db - pn);

        Ok(PowerReport {
            input_signal_power_db,
            input_noise_power_db,
            output_peak_power_db,
            peak_bin,
            output_signal_average_power_db,
            output_noise_power_db,
            processing_gain_db,
            level_offset_db: filtered.level_offset_db(),
            input_snr_db,
            output_snr_db,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Complex;
    use approx::assert_relative_eq;

    #[test]
    fn test_db_conversions() {
        assert_relative_eq!(to_db(100.0).unwrap(), 20.0, epsilon = 1e-12);
        assert_relative_eq!(to_db(0.01).unwrap(), -20.0, epsilon = 1e-12);
        assert_relative_eq!(from_db(30.0), 1000.0, max_relative = 1e-12);
        assert_relative_eq!(db_to_amplitude(20.0), 10.0, max_relative = 1e-12);
    }

    #[test]
    fn test_zero_power_is_degenerate() {
        assert!(matches!(to_db(0.0), Err(DspError::NumericDegeneracy(_))));
        assert!(to_db(-1.0).is_err());
        assert!(to_db(f64::INFINITY).is_err());
        assert!(to_db(f64::NAN).is_err());
        let zeros = vec![Complex::new(0.0, 0.0); 8];
        assert!(power_db(&zeros).is_err());
        assert!(peak_power_db(&zeros).is_err());
    }

    #[test]
    fn test_empty_buffers_are_degenerate() {
        assert!(mean_power(&[]).is_err());
        assert!(peak_power(&[]).is_err());
    }

    #[test]
    fn test_average_and_peak() {
        let v = vec![
            Complex::new(1.0, 0.0),
            Complex::new(0.0, 3.0),
            Complex::new(0.0, 0.0),
            Complex::new(0.0, 0.0),
        ];
        assert_relative_eq!(mean_power(&v).unwrap(), 2.5);
        assert_relative_eq!(power_db(&v).unwrap(), 10.0 * 2.5f64.log10());
        let (idx, p) = peak_power(&v).unwrap();
        assert_eq!(idx, 1);
        assert_relative_eq!(p, 9.0);
        assert_relative_eq!(peak_power_db(&v).unwrap(), 10.0 * 9.0f64.log10());
    }

    #[test]
    fn test_processing_gain() {
        assert_relative_eq!(processing_gain_db(1).unwrap(), 0.0);
        assert_relative_eq!(processing_gain_db(256).unwrap(), 24.0824, epsilon = 1e-4);
        assert!(processing_gain_db(0).is_err());
    }

    #[test]
    fn test_report_display_and_improvement() {
        let report = PowerReport {
            input_signal_power_db: 0.0,
            input_noise_power_db: Some(0.0),
            output_peak_power_db: 24.0,
            peak_bin: 256,
            output_signal_average_power_db: 3.0,
            output_noise_power_db: Some(0.0),
            processing_gain_db: 24.08,
            level_offset_db: 0.0,
            input_snr_db: Some(0.0),
            output_snr_db: Some(24.0),
        };
        assert_relative_eq!(report.snr_improvement_db().unwrap(), 24.0);
        assert_relative_eq!(report.measured_gain_db(), 24.0);
        let line = report.to_string();
        assert!(line.contains("@256"));
        assert!(line.contains("out=24.00 dB"));

        let quiet = PowerReport {
            input_noise_power_db: None,
            output_noise_power_db: None,
            input_snr_db: None,
            output_snr_db: None,
            ..report
        };
        assert!(quiet.snr_improvement_db().is_none());
        assert!(quiet.to_string().contains("Pn=n/a"));
    }
}

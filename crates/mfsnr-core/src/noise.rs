//! Complex AWGN Generator
//!
//! Draws circularly-symmetric complex white Gaussian noise with a target
//! average power `P = 10^(power_db/10)`:
//!
//! ```text
//! n[k] = σ·(g_re + j·g_im),   g ~ N(0, 1) independent,   σ = √(P/2)
//! E[|n|²] = 2σ² = P
//! ```
//!
//! Each component carries half the power; this is the `1/√2` scaling of
//! each unit-variance draw. A generator owns its RNG, so successive
//! [`generate`](NoiseGenerator::generate) calls yield independent
//! realizations while a fixed seed reproduces the whole sequence.
//!
//! ## Example
//!
//! ```rust
//! use mfsnr_core::noise::NoiseGenerator;
//!
//! let mut gen = NoiseGenerator::new(1024, 0.0, Some(42)).unwrap();
//! let noise = gen.generate();
//! assert_eq!(noise.len(), 1024);
//! ```

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::power::from_db;
use crate::types::{Complex, DspError, DspResult, IQBuffer, IQSample};

/// One noise frame together with the power it was drawn for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoiseRealization {
    samples: IQBuffer,
    target_power_db: f64,
}

impl NoiseRealization {
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

    /// Expected per-sample power in dB (not the measured power).
    pub fn target_power_db(&self) -> f64 {
        self.target_power_db
    }
}

/// Seeded complex AWGN source.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    num_samples: usize,
    power_db: f64,
    /// Per-component deviation √(P/2)
    component_dist: Normal<f64>,
    rng: StdRng,
}

impl NoiseGenerator {
    /// Create a generator for frames of `num_samples` at `power_db`.
    ///
    /// `seed: None` seeds from OS entropy.
    pub fn new(num_samples: usize, power_db: f64, seed: Option<u64>) -> DspResult<Self> {
        if num_samples == 0 {
            return Err(DspError::invalid("num_samples", "must be > 0"));
        }
        if !power_db.is_finite() {
            return Err(DspError::invalid(
                "noise_power_db",
                format!("must be finite, got {power_db}"),
            ));
        }

        let std_dev = (from_db(power_db) / 2.0).sqrt();
        if !(std_dev.is_finite() && std_dev > 0.0) {
            return Err(DspError::invalid(
                "noise_power_db",
                format!("{power_db} dB is outside the representable power range"),
            ));
        }
        let component_dist = Normal::new(0.0, std_dev)
            .map_err(|e| DspError::invalid("noise_power_db", e.to_string()))?;

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            num_samples,
            power_db,
            component_dist,
            rng,
        })
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn target_power_db(&self) -> f64 {
        self.power_db
    }

    /// Linear target power `E[|n|²]`.
    pub fn target_power(&self) -> f64 {
        from_db(self.power_db)
    }

    /// Draw the next independent realization.
    pub fn generate(&mut self) -> NoiseRealization {
        let samples = (0..self.num_samples)
            .map(|_| {
                let re = self.component_dist.sample(&mut self.rng);
                let im = self.component_dist.sample(&mut self.rng);
                Complex::new(re, im)
            })
            .collect();

        NoiseRealization {
            samples,
            target_power_db: self.power_db,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_power(v: &[IQSample]) -> f64 {
        v.iter().map(|s| s.norm_sqr()).sum::<f64>() / v.len() as f64
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(NoiseGenerator::new(0, 0.0, Some(1)).unwrap_err().is_configuration());
        assert!(NoiseGenerator::new(8, f64::NEG_INFINITY, Some(1)).is_err());
        assert!(NoiseGenerator::new(8, f64::NAN, Some(1)).is_err());
        assert!(NoiseGenerator::new(8, 4000.0, Some(1)).is_err());
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let mut a = NoiseGenerator::new(256, 3.0, Some(42)).unwrap();
        let mut b = NoiseGenerator::new(256, 3.0, Some(42)).unwrap();
        assert_eq!(a.generate(), b.generate());
        assert_eq!(a.generate(), b.generate());
    }

    #[test]
    fn test_successive_draws_differ() {
        let mut gen = NoiseGenerator::new(64, 0.0, Some(7)).unwrap();
        let first = gen.generate();
        let second = gen.generate();
        assert_ne!(first.samples(), second.samples());
    }

    #[test]
    fn test_power_matches_target() {
        for power_db in [-10.0, 0.0, 6.0] {
            let mut gen = NoiseGenerator::new(100_000, power_db, Some(42)).unwrap();
            let noise = gen.generate();
            let measured = mean_power(noise.samples());
            let target = gen.target_power();
            assert!(
                (measured - target).abs() / target < 0.02,
                "target {target}, measured {measured}"
            );
        }
    }

    #[test]
    fn test_components_split_power() {
        let mut gen = NoiseGenerator::new(100_000, 0.0, Some(3)).unwrap();
        let noise = gen.generate();
        let n = noise.len() as f64;
        let re_var: f64 = noise.samples().iter().map(|s| s.re * s.re).sum::<f64>() / n;
        let im_var: f64 = noise.samples().iter().map(|s| s.im * s.im).sum::<f64>() / n;
        let mean_re: f64 = noise.samples().iter().map(|s| s.re).sum::<f64>() / n;
        assert!((re_var - 0.5).abs() < 0.02, "re variance {re_var}");
        assert!((im_var - 0.5).abs() < 0.02, "im variance {im_var}");
        assert!(mean_re.abs() < 0.01);
    }

    #[test]
    fn test_no_nan_or_inf() {
        let mut gen = NoiseGenerator::new(50_000, 20.0, Some(9)).unwrap();
        assert!(gen.generate().samples().iter().all(|s| s.re.is_finite() && s.im.is_finite()));
    }
}

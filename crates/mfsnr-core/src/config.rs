//! # Configuration
//!
//! One immutable [`SimulationConfig`] record carries every parameter of a
//! matched-filter run; nothing is read from process-wide state. Configs can
//! be built in code or loaded from YAML.
//!
//! ## Search path
//!
//! [`SimulationConfig::load`] uses the first file found:
//! 1. Path in the `MFSNR_CONFIG` environment variable
//! 2. `./mfsnr.yaml`
//! 3. `<user config dir>/mfsnr/config.yaml`
//!
//! ## Example
//!
//! ```yaml
//! num_samples: 1024
//! sample_rate: 100.0e6
//! start_frequency: 0.0
//! deviation: 20.0e6
//! pulse_duration: 2.56e-6
//! levels:
//!   mode: snr
//!   signal_power_db: 0.0
//!   input_snr_db: -10.0
//! normalization: reference_energy
//! seed: 42
//! logging:
//!   level: debug
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fft_utils::Normalization;
use crate::observe::LogConfig;
use crate::power::db_to_amplitude;
use crate::types::{DspError, DspResult};
use crate::waveform::ChirpParams;

/// Error type for loading and saving configuration files.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Configuration file not found
    NotFound(String),
    /// Failed to read or write the file
    ReadError(String),
    /// Malformed YAML
    ParseError(String),
    /// Parsed, but the values are unusable
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(msg) => write!(f, "config not found: {}", msg),
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<DspError> for ConfigError {
    fn from(err: DspError) -> Self {
        ConfigError::ValidationError(err.to_string())
    }
}

/// Target power levels for synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PowerLevels {
    /// Explicit levels; `noise_power_db: None` disables the noise branch.
    Absolute {
        signal_power_db: f64,
        #[serde(default)]
        noise_power_db: Option<f64>,
    },
    /// Noise level derived as `signal_power_db − input_snr_db`.
    Snr {
        signal_power_db: f64,
        input_snr_db: f64,
    },
}

impl Default for PowerLevels {
    fn default() -> Self {
        PowerLevels::Absolute {
            signal_power_db: 0.0,
            noise_power_db: Some(0.0),
        }
    }
}

impl PowerLevels {
    pub fn signal_power_db(&self) -> f64 {
        match *self {
            PowerLevels::Absolute { signal_power_db, .. } => signal_power_db,
            PowerLevels::Snr { signal_power_db, .. } => signal_power_db,
        }
    }

    pub fn noise_power_db(&self) -> Option<f64> {
        match *self {
            PowerLevels::Absolute { noise_power_db, .. } => noise_power_db,
            PowerLevels::Snr {
                signal_power_db,
                input_snr_db,
            } => Some(signal_power_db - input_snr_db),
        }
    }

    fn validate(&self) -> DspResult<()> {
        if !self.signal_power_db().is_finite() {
            return Err(DspError::invalid("signal_power_db", "must be finite"));
        }
        if let PowerLevels::Snr { input_snr_db, .. } = *self {
            if !input_snr_db.is_finite() {
                return Err(DspError::invalid("input_snr_db", "must be finite"));
            }
        }
        if let Some(pn) = self.noise_power_db() {
            if !pn.is_finite() {
                return Err(DspError::invalid(
                    "noise_power_db",
                    "must be finite; omit it to run without noise",
                ));
            }
        }
        Ok(())
    }
}

/// Complete parameter set of one matched-filter run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Frame length N
    pub num_samples: usize,
    /// Sample rate Fs in Hz (dt = 1/Fs)
    pub sample_rate: f64,
    /// Chirp start frequency f0 in Hz
    pub start_frequency: f64,
    /// Total chirp sweep in Hz
    pub deviation: f64,
    /// Pulse duration T0 in seconds; `None` means a quarter frame
    pub pulse_duration: Option<f64>,
    pub levels: PowerLevels,
    pub normalization: Normalization,
    /// Noise seed; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Subscriber settings for the host; pass to
    /// [`init_logging`](crate::observe::init_logging) before running.
    pub logging: LogConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_samples: 1024,
            sample_rate: 100e6,
            start_frequency: 0.0,
            deviation: 20e6,
            pulse_duration: None,
            levels: PowerLevels::default(),
            normalization: Normalization::default(),
            seed: None,
            logging: LogConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_pulse_duration(mut self, pulse_duration: f64) -> Self {
        self.pulse_duration = Some(pulse_duration);
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_levels(mut self, levels: PowerLevels) -> Self {
        self.levels = levels;
        self
    }

    /// Keep the signal level, derive noise from an input SNR.
    pub fn with_input_snr(mut self, input_snr_db: f64) -> Self {
        self.levels = PowerLevels::Snr {
            signal_power_db: self.levels.signal_power_db(),
            input_snr_db,
        };
        self
    }

    /// Keep the signal level, drop the noise branch.
    pub fn without_noise(mut self) -> Self {
        self.levels = PowerLevels::Absolute {
            signal_power_db: self.levels.signal_power_db(),
            noise_power_db: None,
        };
        self
    }

    /// `dt = 1/Fs`
    pub fn sample_interval(&self) -> f64 {
        1.0 / self.sample_rate
    }

    /// T0, defaulting to `(N/4)·dt`.
    pub fn pulse_duration(&self) -> f64 {
        self.pulse_duration
            .unwrap_or_else(|| self.num_samples as f64 / 4.0 * self.sample_interval())
    }

    /// `Ns = round(T0/dt)`
    pub fn pulse_samples(&self) -> usize {
        self.chirp_params().pulse_samples()
    }

    /// `Sr = Δ / (2·T0)`
    pub fn chirp_rate(&self) -> f64 {
        self.chirp_params().chirp_rate()
    }

    pub fn signal_power_db(&self) -> f64 {
        self.levels.signal_power_db()
    }

    pub fn noise_power_db(&self) -> Option<f64> {
        self.levels.noise_power_db()
    }

    /// Waveform parameters; the chirp amplitude follows the signal level.
    pub fn chirp_params(&self) -> ChirpParams {
        ChirpParams {
            num_samples: self.num_samples,
            sample_interval: self.sample_interval(),
            start_frequency: self.start_frequency,
            deviation: self.deviation,
            pulse_duration: self.pulse_duration(),
            amplitude: db_to_amplitude(self.signal_power_db()),
        }
    }

    /// Check every constraint before any numeric work runs.
    pub fn validate(&self) -> DspResult<()> {
        if self.num_samples == 0 {
            return Err(DspError::invalid("num_samples", "must be > 0"));
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(DspError::invalid(
                "sample_rate",
                format!("must be finite and > 0, got {}", self.sample_rate),
            ));
        }
        self.levels.validate()?;
        if self.pulse_duration.is_none() && self.pulse_samples() == 0 {
            return Err(DspError::NumericDegeneracy(format!(
                "default pulse_duration (N/4)*dt = {:e} s rounds to zero samples for num_samples = {}",
                self.pulse_duration(),
                self.num_samples
            )));
        }
        self.chirp_params().validate()
    }

    /// Load configuration from the default search path.
    ///
    /// Returns the default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("MFSNR_CONFIG") {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(format!(
                    "MFSNR_CONFIG points to {}",
                    path.display()
                )));
            }
            return Self::load_from(&path);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_yaml()?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./mfsnr.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "mfsnr") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths
    }
}

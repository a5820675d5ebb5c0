//! Typed configuration: circuit constants, display defaults and the
//! per-channel calibration file. Everything is checked when it is loaded.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::drivers::framing::{SyncMode, CHANNELS};
use crate::drivers::LinearTrend;
pub const ROLL_DURATION_MIN: usize = 2000;
pub const ROLL_DURATION_MAX: usize = 400_000;
pub const ROLL_DURATION_DEFAULT: usize = 10_000;
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}
fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}
fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and > 0, got {value}")))
    }
}
fn check_channel(field: &str, channel: usize) -> Result<(), ConfigError> {
    if (1..=CHANNELS).contains(&channel) {
        Ok(())
    } else {
        Err(invalid(field, format!("channel {channel} outside 1..={CHANNELS}")))
    }
}
/// Charge amplifier constants and the front end sample rate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitConfig {
    /// Feedback resistance (ohm).
    #[serde(rename = "Rf")]
    pub rf: f64,
    /// Feedback capacitance (farad).
    #[serde(rename = "Cf")]
    pub cf: f64,
    /// Piezoelectric charge constant (coulomb per newton).
    pub d33: f64,
    /// Samples per second.
    #[serde(rename = "T")]
    pub sample_rate_hz: f64,
}
impl CircuitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("Rf", self.rf)?;
        positive("Cf", self.cf)?;
        positive("d33", self.d33)?;
        positive("T", self.sample_rate_hz)
    }
    pub fn samples_to_seconds(&self, samples: usize) -> f64 {
        samples as f64 / self.sample_rate_hz
    }
}
fn default_roll_duration() -> usize {
    ROLL_DURATION_DEFAULT
}
fn default_channel() -> usize {
    1
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayConfig {
    #[serde(default = "default_roll_duration")]
    pub roll_duration: usize,
    /// 1-based channel fed to the reconstruction.
    #[serde(default = "default_channel")]
    pub channel: usize,
    #[serde(default)]
    pub additional_channels: Vec<usize>,
}
impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            roll_duration: ROLL_DURATION_DEFAULT,
            channel: 1,
            additional_channels: Vec::new(),
        }
    }
}
impl DisplayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(ROLL_DURATION_MIN..=ROLL_DURATION_MAX).contains(&self.roll_duration) {
            return Err(invalid(
                "display.roll_duration",
                format!(
                    "{} outside {ROLL_DURATION_MIN}..={ROLL_DURATION_MAX}",
                    self.roll_duration
                ),
            ));
        }
        check_channel("display.channel", self.channel)?;
        for &channel in &self.additional_channels {
            check_channel("display.additional_channels", channel)?;
        }
        Ok(())
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcquisitionConfig {
    pub circuit: CircuitConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub reconstruct: bool,
    #[serde(default)]
    pub sync: SyncMode,
}
impl AcquisitionConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_yaml_str(&read(path.as_ref())?)
    }
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.circuit.validate()?;
        self.display.validate()?;
        if let SyncMode::Strict { frames: 0 } = self.sync {
            return Err(invalid("sync.frames", "strict sync needs at least one frame"));
        }
        Ok(())
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// 1-based channel number.
    pub number: usize,
    pub offset_mean: f64,
    #[serde(default)]
    pub a: f64,
    #[serde(default)]
    pub b: f64,
}
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFile {
    pub channels: Vec<CalibrationEntry>,
}
impl CalibrationFile {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let file: Self = serde_yaml::from_str(text)?;
        file.validate()?;
        Ok(file)
    }
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_yaml_str(&read(path.as_ref())?)
    }
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        fs::write(path, self.to_yaml_string()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for entry in &self.channels {
            check_channel("channels.number", entry.number)?;
            if !seen.insert(entry.number) {
                return Err(invalid(
                    "channels.number",
                    format!("channel {} listed twice", entry.number),
                ));
            }
        }
        Ok(())
    }
    pub fn entry(&self, number: usize) -> Option<&CalibrationEntry> {
        self.channels.iter().find(|e| e.number == number)
    }
    /// Offset per logical channel; channels without an entry get 0.
    pub fn offsets(&self) -> [f64; CHANNELS] {
        let mut offsets = [0.0; CHANNELS];
        for entry in &self.channels {
            if let Some(slot) = offsets.get_mut(entry.number.wrapping_sub(1)) {
                *slot = entry.offset_mean;
            }
        }
        offsets
    }
    /// Stores `means[number - 1]` as each entry's offset.
    pub fn set_offsets(&mut self, means: &[f64]) {
        for entry in &mut self.channels {
            if let Some(&mean) = means.get(entry.number.wrapping_sub(1)) {
                entry.offset_mean = mean;
            }
        }
    }
    /// Applies one trend to every channel.
    pub fn set_trend(&mut self, trend: LinearTrend) {
        for entry in &mut self.channels {
            entry.a = trend.a;
            entry.b = trend.b;
        }
    }
}

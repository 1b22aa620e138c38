use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::estimators::{Method, PhaseMappingConfig};
use crate::filters::FilterFamily;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub acquisition: AcquisitionConfig,
    pub detectors: Vec<DetectorConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AcquisitionConfig {
    /// Nominal sample rate of the acquisition stream, Hz.
    pub fs: f64,
    /// Capacity of the shared sample buffer.
    pub buffer_size: usize,
    #[serde(default)]
    pub source: SignalSource,
}

/// Where the demo binary pulls its samples from. The library itself only
/// consumes the shared-buffer contract.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Simulated,
    Csv { path: String },
}

impl Default for SignalSource {
    fn default() -> Self {
        SignalSource::Simulated
    }
}

/// One closed-loop target. Defaults track a theta-band oscillation at a
/// 1.5 kHz acquisition rate.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    pub name: String,
    pub method: Method,
    /// Index of the pre-programmed hardware stimulation routine.
    pub stim_function: u32,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_target_phase")]
    pub target_phase: f64,
    #[serde(default = "default_low_cut")]
    pub low_cut: f64,
    #[serde(default = "default_high_cut")]
    pub high_cut: f64,
    /// Sample rate the filter is designed against, Hz.
    #[serde(default = "default_fs")]
    pub fs: f64,
    #[serde(default = "default_filter_order")]
    pub filter_order: usize,
    #[serde(default)]
    pub filter_family: FilterFamily,
    /// Only read by the phase-mapping method.
    #[serde(default)]
    pub phase_mapping: PhaseMappingConfig,
}

fn default_window_size() -> usize {
    400
}
fn default_target_phase() -> f64 {
    PI
}
fn default_low_cut() -> f64 {
    6.0
}
fn default_high_cut() -> f64 {
    9.0
}
fn default_fs() -> f64 {
    1500.0
}
fn default_filter_order() -> usize {
    2
}

impl DetectorConfig {
    /// A fully defaulted record; handy for tests and bindings.
    pub fn example(name: &str) -> Self {
        Self {
            name: name.to_string(),
            method: Method::Echt,
            stim_function: 1,
            window_size: default_window_size(),
            target_phase: default_target_phase(),
            low_cut: default_low_cut(),
            high_cut: default_high_cut(),
            fs: default_fs(),
            filter_order: default_filter_order(),
            filter_family: FilterFamily::default(),
            phase_mapping: PhaseMappingConfig::default(),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let config_str = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&config_str)?)
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), ConfigError> {
    let yaml = serde_yaml::to_string(config)?;
    Ok(fs::write(path, yaml)?)
}

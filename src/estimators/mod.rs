pub mod analytic;
pub mod echt;
pub mod hilbert;
pub mod phase_map;

use std::f64::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::DetectorConfig;
use crate::errors::{ConfigError, EstimateError};
use crate::filters::FilterSpec;

pub use echt::EchtEstimator;
pub use hilbert::FilteredHilbertEstimator;
pub use phase_map::{PhaseMappingConfig, PhaseMappingEstimator};

/// The closed set of estimation methods. Selected once at construction,
/// never re-dispatched per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "echt")]
    Echt,
    #[serde(rename = "ht", alias = "hilbert")]
    Hilbert,
    #[serde(rename = "pm")]
    PhaseMapping,
}

impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "echt" => Ok(Method::Echt),
            "ht" | "hilbert" => Ok(Method::Hilbert),
            "pm" => Ok(Method::PhaseMapping),
            other => Err(ConfigError::UnknownMethod(other.to_string())),
        }
    }
}

/// One phase estimate per acquisition cycle, from the latest window of
/// samples.
pub trait PhaseEstimator: Send {
    /// Instantaneous phase at the end of `window`, normalized onto the
    /// principal cycle (`-pi` at a trough). `Ok(None)` means the estimator
    /// has not seen enough history yet; the caller skips the cycle.
    fn estimate_phase(&mut self, window: &[f64]) -> Result<Option<f64>, EstimateError>;

    /// Whether the refractory gate may re-arm, given the previous and
    /// current estimates. The default detects the phase wrap at a trough;
    /// the phase-mapping estimator overrides this with its own
    /// critical-point detector.
    fn rearm_event(&self, prev_phase: Option<f64>, curr_phase: f64) -> bool {
        matches!(prev_phase, Some(prev) if prev - curr_phase > PI)
    }

    fn method(&self) -> Method;
}

/// Build the estimator a detector was configured with.
pub fn build(config: &DetectorConfig) -> Result<Box<dyn PhaseEstimator>, ConfigError> {
    let spec = FilterSpec::new(
        config.filter_family,
        config.filter_order,
        config.low_cut,
        config.high_cut,
        config.fs,
    )?;
    match config.method {
        Method::Echt => Ok(Box::new(EchtEstimator::new(&spec, config.window_size))),
        Method::Hilbert => Ok(Box::new(FilteredHilbertEstimator::new(
            &spec,
            config.window_size,
        ))),
        Method::PhaseMapping => Ok(Box::new(PhaseMappingEstimator::new(
            &spec,
            config.window_size,
            config.phase_mapping.clone(),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_parse_like_the_config_strings() {
        assert_eq!("echt".parse::<Method>().unwrap(), Method::Echt);
        assert_eq!("ht".parse::<Method>().unwrap(), Method::Hilbert);
        assert_eq!("hilbert".parse::<Method>().unwrap(), Method::Hilbert);
        assert_eq!("pm".parse::<Method>().unwrap(), Method::PhaseMapping);
        assert!(matches!(
            "fft".parse::<Method>(),
            Err(ConfigError::UnknownMethod(_))
        ));
    }

    #[test]
    fn build_rejects_bad_filter_configuration() {
        let mut config = DetectorConfig::example("bad");
        config.low_cut = 10.0;
        config.high_cut = 6.0;
        assert!(matches!(
            build(&config),
            Err(ConfigError::InvalidPassband { .. })
        ));
    }

    #[test]
    fn build_selects_the_configured_method() {
        for (method, expected) in [
            (Method::Echt, Method::Echt),
            (Method::Hilbert, Method::Hilbert),
            (Method::PhaseMapping, Method::PhaseMapping),
        ] {
            let mut config = DetectorConfig::example("selection");
            config.method = method;
            let estimator = build(&config).expect("valid config");
            assert_eq!(estimator.method(), expected);
        }
    }
}

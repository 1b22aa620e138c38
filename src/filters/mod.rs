pub mod design;
pub mod response;
pub mod sosfilt;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Pole/zero placement family for the band-pass design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterFamily {
    #[serde(rename = "butter")]
    Butterworth,
    #[serde(rename = "cheby1")]
    Chebyshev1,
    #[serde(rename = "ellip")]
    Elliptic,
}

impl Default for FilterFamily {
    fn default() -> Self {
        FilterFamily::Butterworth
    }
}

impl FromStr for FilterFamily {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "butter" => Ok(FilterFamily::Butterworth),
            "cheby1" => Ok(FilterFamily::Chebyshev1),
            "ellip" => Ok(FilterFamily::Elliptic),
            other => Err(ConfigError::UnknownFamily(other.to_string())),
        }
    }
}

/// Output form requested from the designer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterForm {
    #[serde(rename = "tf")]
    TransferFunction,
    #[serde(rename = "sos")]
    CascadedSections,
}

/// Immutable description of one band-pass design. Built once per estimator,
/// never mutated afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilterSpec {
    pub family: FilterFamily,
    pub order: usize,
    pub low_cut: f64,
    pub high_cut: f64,
    pub fs: f64,
}

impl FilterSpec {
    pub fn new(
        family: FilterFamily,
        order: usize,
        low_cut: f64,
        high_cut: f64,
        fs: f64,
    ) -> Result<Self, ConfigError> {
        if order == 0 {
            return Err(ConfigError::InvalidParameter(
                "filter order must be at least 1".to_string(),
            ));
        }
        if !fs.is_finite() || fs <= 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "sample rate {fs} must be finite and positive"
            )));
        }
        if low_cut >= high_cut {
            return Err(ConfigError::InvalidPassband {
                low: low_cut,
                high: high_cut,
            });
        }
        let nyquist = fs / 2.0;
        if low_cut <= 0.0 || high_cut >= nyquist {
            return Err(ConfigError::CutoffOutOfRange {
                low: low_cut,
                high: high_cut,
                nyquist,
            });
        }
        Ok(Self {
            family,
            order,
            low_cut,
            high_cut,
            fs,
        })
    }

    pub fn transfer_function(&self) -> TransferFunction {
        match design::design(self, FilterForm::TransferFunction) {
            BandPassCoefficients::TransferFunction(tf) => tf,
            BandPassCoefficients::CascadedSections(_) => unreachable!(),
        }
    }

    pub fn sections(&self) -> Vec<Sos> {
        match design::design(self, FilterForm::CascadedSections) {
            BandPassCoefficients::CascadedSections(sos) => sos,
            BandPassCoefficients::TransferFunction(_) => unreachable!(),
        }
    }
}

/// Direct-form numerator/denominator pair, `a[0]` normalized to 1.
#[derive(Debug, Clone)]
pub struct TransferFunction {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

/// One second-order section, coefficients normalized so `a[0] == 1`.
#[derive(Debug, Clone, Copy)]
pub struct Sos {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

/// Designer output for either requested form.
#[derive(Debug, Clone)]
pub enum BandPassCoefficients {
    TransferFunction(TransferFunction),
    CascadedSections(Vec<Sos>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_cutoffs_are_a_configuration_error() {
        let err = FilterSpec::new(FilterFamily::Butterworth, 2, 9.0, 6.0, 1500.0);
        assert!(matches!(err, Err(ConfigError::InvalidPassband { .. })));
    }

    #[test]
    fn cutoffs_must_sit_inside_the_nyquist_band() {
        let err = FilterSpec::new(FilterFamily::Butterworth, 2, 6.0, 800.0, 1500.0);
        assert!(matches!(err, Err(ConfigError::CutoffOutOfRange { .. })));
    }

    #[test]
    fn unknown_family_name_is_rejected() {
        let err = "bessel".parse::<FilterFamily>();
        assert!(matches!(err, Err(ConfigError::UnknownFamily(_))));
    }
}

use std::collections::VecDeque;
use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::analytic::normalize_phase;
use super::{Method, PhaseEstimator};
use crate::errors::{ConfigError, EstimateError};
use crate::filters::sosfilt::sosfiltfilt;
use crate::filters::{FilterSpec, Sos};

/// Tuning block for the phase-mapping method. `derv_bar`, `num_to_wait`
/// and the lockout values trade noise robustness against missed or
/// spurious critical points and usually need per-preparation tuning;
/// `derv_bar` in particular scales with the raw signal amplitude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseMappingConfig {
    #[serde(default = "default_regr_buffer_size")]
    pub regr_buffer_size: usize,
    #[serde(default = "default_num_to_wait")]
    pub num_to_wait: usize,
    #[serde(default = "default_derv_bar")]
    pub derv_bar: f64,
    #[serde(default = "default_default_slope")]
    pub default_slope: f64,
    #[serde(default = "default_gradient_factor")]
    pub gradient_factor: f64,
    #[serde(default)]
    pub reset_on: bool,
    #[serde(default = "default_reset_threshold")]
    pub reset_threshold: u32,
    #[serde(default)]
    pub lock_on: bool,
    #[serde(default = "default_lockdown")]
    pub lockdown: u32,
}

fn default_regr_buffer_size() -> usize {
    50
}
fn default_num_to_wait() -> usize {
    10
}
fn default_derv_bar() -> f64 {
    0.01
}
fn default_default_slope() -> f64 {
    0.012
}
fn default_gradient_factor() -> f64 {
    1.0
}
fn default_reset_threshold() -> u32 {
    250
}
fn default_lockdown() -> u32 {
    50
}

impl Default for PhaseMappingConfig {
    fn default() -> Self {
        Self {
            regr_buffer_size: default_regr_buffer_size(),
            num_to_wait: default_num_to_wait(),
            derv_bar: default_derv_bar(),
            default_slope: default_default_slope(),
            gradient_factor: default_gradient_factor(),
            reset_on: false,
            reset_threshold: default_reset_threshold(),
            lock_on: false,
            lockdown: default_lockdown(),
        }
    }
}

/// Online phase-mapping estimator.
///
/// Tracks the sign of the local derivative of the zero-phase filtered
/// signal, snaps the phase to 0 or pi at detected critical points, and
/// extrapolates linearly in between with a learned per-sample slope. No
/// FFT or Hilbert step; calls must see windows in acquisition order.
pub struct PhaseMappingEstimator {
    config: PhaseMappingConfig,
    window_size: usize,
    sections: Vec<Sos>,
    // First row of the pseudo-inverse of the fixed [index, 1] design
    // matrix; dotting it with the rolling buffer yields the slope
    slope_weights: DVector<f64>,
    regr_buffer: VecDeque<f64>,
    sign_history: VecDeque<bool>,
    curr_sign: bool,
    sample_count: Option<i64>,
    slope: f64,
    in_lock: u32,
    trough_event: bool,
}

impl PhaseMappingEstimator {
    pub fn new(
        spec: &FilterSpec,
        window_size: usize,
        config: PhaseMappingConfig,
    ) -> Result<Self, ConfigError> {
        if config.regr_buffer_size < 2 {
            return Err(ConfigError::InvalidParameter(
                "regr_buffer_size must be at least 2".to_string(),
            ));
        }
        if config.regr_buffer_size > window_size {
            return Err(ConfigError::InvalidParameter(format!(
                "regr_buffer_size {} exceeds window size {}",
                config.regr_buffer_size, window_size
            )));
        }
        if config.num_to_wait == 0 {
            return Err(ConfigError::InvalidParameter(
                "num_to_wait must be at least 1".to_string(),
            ));
        }
        if !(config.default_slope.is_finite() && config.default_slope > 0.0) {
            return Err(ConfigError::InvalidParameter(
                "default_slope must be finite and positive".to_string(),
            ));
        }
        if !(config.gradient_factor.is_finite() && config.gradient_factor > 0.0) {
            return Err(ConfigError::InvalidParameter(
                "gradient_factor must be finite and positive".to_string(),
            ));
        }

        let size = config.regr_buffer_size;
        let design =
            DMatrix::from_fn(size, 2, |row, col| if col == 0 { row as f64 } else { 1.0 });
        let pinv = design
            .pseudo_inverse(1e-12)
            .map_err(|err| ConfigError::InvalidParameter(format!("regression matrix: {err}")))?;
        let slope_weights = pinv.row(0).transpose();

        Ok(Self {
            slope: config.default_slope,
            sign_history: VecDeque::from(vec![true; config.num_to_wait]),
            config,
            window_size,
            sections: spec.sections(),
            slope_weights,
            regr_buffer: VecDeque::with_capacity(size),
            curr_sign: true,
            sample_count: None,
            in_lock: 0,
            trough_event: false,
        })
    }

    fn derivative(&self) -> f64 {
        self.slope_weights
            .iter()
            .zip(self.regr_buffer.iter())
            .map(|(w, x)| w * x)
            .sum()
    }

    fn force_reset_due(&self) -> bool {
        self.config.reset_on
            && self
                .sample_count
                .map_or(false, |count| count >= self.config.reset_threshold as i64)
    }
}

impl PhaseEstimator for PhaseMappingEstimator {
    fn estimate_phase(&mut self, window: &[f64]) -> Result<Option<f64>, EstimateError> {
        if window.len() != self.window_size {
            return Err(EstimateError::WindowLengthMismatch {
                expected: self.window_size,
                got: window.len(),
            });
        }

        let filtered = sosfiltfilt(&self.sections, window);

        // Seed the rolling buffer on the first call, then slide by one
        if self.regr_buffer.is_empty() {
            let tail = filtered.len() - self.config.regr_buffer_size;
            self.regr_buffer.extend(&filtered[tail..]);
        } else {
            self.regr_buffer.pop_front();
            self.regr_buffer.push_back(filtered[filtered.len() - 1]);
        }

        let derivative = self.derivative();
        if !derivative.is_finite() {
            return Err(EstimateError::NonFinitePhase);
        }

        if self.in_lock > 0 {
            self.in_lock -= 1;
        }

        // Extrapolate from the last critical point, if one has been seen
        let mut phase = match self.sample_count {
            Some(count) => count as f64 * self.slope,
            None => 0.0,
        };

        self.sign_history.pop_front();
        self.sign_history.push_back(derivative > 0.0);

        if let Some(count) = self.sample_count.as_mut() {
            *count += 1;
        }

        // Sign flip: the whole history disagrees with the tracked sign and
        // the derivative is strong enough to trust
        let history_flipped = if self.curr_sign {
            self.sign_history.iter().all(|&rising| !rising)
        } else {
            self.sign_history.iter().all(|&rising| rising)
        };
        let flip = history_flipped && derivative.abs() >= self.config.derv_bar;
        let force = self.force_reset_due();

        self.trough_event = false;
        if (flip || force) && self.in_lock == 0 {
            phase = if self.curr_sign { PI } else { 0.0 };

            if let Some(count) = self.sample_count.filter(|&count| count > 0) {
                if self.curr_sign {
                    self.slope = PI / count as f64;
                } else {
                    // Peak-to-trough transitions damp the slope and may arm
                    // the lockout
                    self.slope = 2.0 * PI * self.config.gradient_factor / count as f64;
                    if self.config.lock_on {
                        self.in_lock = self.config.lockdown;
                    }
                }
            }

            let half_cycle = (PI / self.slope) as i64;
            self.sample_count = Some(if self.curr_sign { half_cycle } else { 0 });
            self.curr_sign = !self.curr_sign;
            // Flipping into a rising half-cycle means a trough was crossed
            self.trough_event = self.curr_sign;
            for sign in self.sign_history.iter_mut() {
                *sign = self.curr_sign;
            }
        }

        match self.sample_count {
            Some(_) => Ok(Some(normalize_phase(phase))),
            None => Ok(None),
        }
    }

    // The gate re-arms on the estimator's own critical-point detector, not
    // on a wrap of the returned phase.
    fn rearm_event(&self, _prev_phase: Option<f64>, _curr_phase: f64) -> bool {
        self.trough_event
    }

    fn method(&self) -> Method {
        Method::PhaseMapping
    }
}

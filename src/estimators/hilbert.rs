use std::f64::consts::PI;

use super::analytic::{analytic_signal, normalize_phase, FftPair};
use super::{Method, PhaseEstimator};
use crate::errors::EstimateError;
use crate::filters::sosfilt::sosfiltfilt;
use crate::filters::{FilterSpec, Sos};

/// Filtered-Hilbert estimator: zero-phase band-pass filtering followed by a
/// standard frequency-domain analytic-signal transform.
pub struct FilteredHilbertEstimator {
    window_size: usize,
    sections: Vec<Sos>,
    fft: FftPair,
}

impl FilteredHilbertEstimator {
    pub fn new(spec: &FilterSpec, window_size: usize) -> Self {
        Self {
            window_size,
            sections: spec.sections(),
            fft: FftPair::new(window_size),
        }
    }
}

impl PhaseEstimator for FilteredHilbertEstimator {
    fn estimate_phase(&mut self, window: &[f64]) -> Result<Option<f64>, EstimateError> {
        if window.len() != self.window_size {
            return Err(EstimateError::WindowLengthMismatch {
                expected: self.window_size,
                got: window.len(),
            });
        }

        let filtered = sosfiltfilt(&self.sections, window);
        let analytic = analytic_signal(&self.fft, &filtered);

        let angle = analytic[self.window_size - 1].arg();
        if !angle.is_finite() {
            return Err(EstimateError::NonFinitePhase);
        }
        Ok(Some(normalize_phase(angle + PI)))
    }

    fn method(&self) -> Method {
        Method::Hilbert
    }
}

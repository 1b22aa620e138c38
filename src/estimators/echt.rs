use std::f64::consts::PI;

use num_complex::Complex64;

use super::analytic::{analytic_mask, fftshift, ifftshift, normalize_phase, FftPair};
use super::{Method, PhaseEstimator};
use crate::errors::EstimateError;
use crate::filters::response::freqz_at;
use crate::filters::{FilterSpec, TransferFunction};

/// Endpoint-corrected Hilbert transform estimator.
///
/// Applies the band-pass filter in the frequency domain together with the
/// analytic-signal mask in a single pass, which compensates the edge
/// distortion a time-domain filter-then-Hilbert chain would leave on the
/// newest sample.
pub struct EchtEstimator {
    window_size: usize,
    fft: FftPair,
    mask: Vec<f64>,
    // Filter response at the centered bin frequencies, fixed for a fixed
    // window length and sample rate
    response: Vec<Complex64>,
}

impl EchtEstimator {
    pub fn new(spec: &FilterSpec, window_size: usize) -> Self {
        let tf = spec.transfer_function();
        Self {
            window_size,
            fft: FftPair::new(window_size),
            mask: analytic_mask(window_size),
            response: centered_response(&tf, window_size, spec.fs),
        }
    }
}

// Response samples across [-n/2, n/2) bins, scaled by the window duration.
// The ceil reproduces the half-integer bin grid of odd-length windows.
fn centered_response(tf: &TransferFunction, n: usize, fs: f64) -> Vec<Complex64> {
    let duration = n as f64 / fs;
    let freqs: Vec<f64> = (0..n)
        .map(|i| (-(n as f64) / 2.0 + i as f64).ceil() / duration)
        .collect();
    freqz_at(tf, &freqs, fs)
}

impl PhaseEstimator for EchtEstimator {
    fn estimate_phase(&mut self, window: &[f64]) -> Result<Option<f64>, EstimateError> {
        if window.len() != self.window_size {
            return Err(EstimateError::WindowLengthMismatch {
                expected: self.window_size,
                got: window.len(),
            });
        }

        let mut buf: Vec<Complex64> = window.iter().map(|&x| Complex64::new(x, 0.0)).collect();
        self.fft.forward(&mut buf);

        for (value, &mask) in buf.iter_mut().zip(self.mask.iter()) {
            *value *= mask;
        }

        // Apply the filter response on the centered spectrum, then restore
        // bin order and invert
        fftshift(&mut buf);
        for (value, &coeff) in buf.iter_mut().zip(self.response.iter()) {
            *value *= coeff;
        }
        ifftshift(&mut buf);
        self.fft.inverse_normalized(&mut buf);

        let angle = buf[self.window_size - 1].arg();
        if !angle.is_finite() {
            return Err(EstimateError::NonFinitePhase);
        }
        Ok(Some(normalize_phase(angle + PI)))
    }

    fn method(&self) -> Method {
        Method::Echt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterFamily;

    const FS: f64 = 1500.0;
    const WINDOW: usize = 400;
    const TONE_HZ: f64 = 7.5;

    fn estimator() -> EchtEstimator {
        let spec = FilterSpec::new(FilterFamily::Butterworth, 2, 6.0, 9.0, FS).expect("valid spec");
        EchtEstimator::new(&spec, WINDOW)
    }

    fn tone(start: usize, len: usize) -> Vec<f64> {
        (start..start + len)
            .map(|i| (2.0 * PI * TONE_HZ * i as f64 / FS).sin())
            .collect()
    }

    #[test]
    fn phase_advances_monotonically_between_wraps() {
        let mut estimator = estimator();
        let mut prev = None;
        let mut wraps = 0usize;
        let total = 600usize;

        for start in 0..total {
            let phase = estimator
                .estimate_phase(&tone(start, WINDOW))
                .expect("estimate")
                .expect("ready");
            if let Some(prev) = prev {
                let delta: f64 = phase - prev;
                if delta < -PI {
                    wraps += 1;
                } else {
                    assert!(delta > -0.2, "phase went backwards: {prev} -> {phase}");
                }
            }
            prev = Some(phase);
        }

        // 600 samples at 7.5 Hz / 1500 Hz span three periods
        assert!(
            (2..=3).contains(&wraps),
            "expected one wrap per period, saw {wraps}"
        );
    }

    #[test]
    fn estimate_is_stationary_for_a_stationary_tone() {
        let mut estimator = estimator();
        let first = estimator
            .estimate_phase(&tone(0, WINDOW))
            .expect("estimate")
            .expect("ready");
        // one full period later the phase must agree
        let period = (FS / TONE_HZ) as usize;
        let second = estimator
            .estimate_phase(&tone(period, WINDOW))
            .expect("estimate")
            .expect("ready");
        let delta = (first - second).abs();
        assert!(delta < 0.1 || (2.0 * PI - delta) < 0.1, "drift {delta}");
    }

    #[test]
    fn window_length_mismatch_is_a_transient_error() {
        let mut estimator = estimator();
        let result = estimator.estimate_phase(&tone(0, WINDOW - 1));
        assert!(matches!(
            result,
            Err(EstimateError::WindowLengthMismatch { .. })
        ));
    }

    #[test]
    fn odd_window_lengths_are_supported() {
        let spec = FilterSpec::new(FilterFamily::Butterworth, 2, 6.0, 9.0, FS).expect("valid spec");
        let mut estimator = EchtEstimator::new(&spec, 401);
        let phase = estimator
            .estimate_phase(&tone(0, 401))
            .expect("estimate")
            .expect("ready");
        assert!((-PI..PI).contains(&phase));
    }
}

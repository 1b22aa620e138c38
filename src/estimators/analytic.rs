use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

const TWO_PI: f64 = 2.0 * PI;

/// Forward/inverse FFT plans for one fixed window length. Planned once at
/// estimator construction so the per-cycle path never allocates a plan.
pub struct FftPair {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    len: usize,
}

impl FftPair {
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn forward(&self, buf: &mut [Complex64]) {
        self.forward.process(buf);
    }

    /// Inverse transform including the 1/n scaling rustfft leaves out.
    pub fn inverse_normalized(&self, buf: &mut [Complex64]) {
        self.inverse.process(buf);
        let scale = 1.0 / self.len as f64;
        for value in buf.iter_mut() {
            *value *= scale;
        }
    }
}

/// Analytic-signal spectrum mask: zero the negative frequencies, double the
/// positive ones, keep DC (and, for even lengths, the Nyquist bin) unscaled.
pub fn analytic_mask(n: usize) -> Vec<f64> {
    let mut mask = vec![0.0; n];
    if n == 0 {
        return mask;
    }
    mask[0] = 1.0;
    if n % 2 == 0 {
        mask[n / 2] = 1.0;
        for value in mask.iter_mut().take(n / 2).skip(1) {
            *value = 2.0;
        }
    } else {
        for value in mask.iter_mut().take((n + 1) / 2).skip(1) {
            *value = 2.0;
        }
    }
    mask
}

/// Standard frequency-domain analytic signal of a real window.
pub fn analytic_signal(fft: &FftPair, window: &[f64]) -> Vec<Complex64> {
    let mut buf: Vec<Complex64> = window.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    fft.forward(&mut buf);
    for (value, mask) in buf.iter_mut().zip(analytic_mask(window.len())) {
        *value *= mask;
    }
    fft.inverse_normalized(&mut buf);
    buf
}

/// Move the zero-frequency bin to the center of the spectrum.
pub fn fftshift<T: Copy>(buf: &mut [T]) {
    let n = buf.len();
    buf.rotate_right(n / 2);
}

/// Undo [`fftshift`].
pub fn ifftshift<T: Copy>(buf: &mut [T]) {
    let n = buf.len();
    buf.rotate_left(n / 2);
}

/// Map an estimate onto the principal cycle via modulo 2pi and a -pi
/// shift. A trough lands on `-pi`, the start of the cycle, so the fire
/// comparison can never mistake it for a late phase.
pub fn normalize_phase(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(TWO_PI) - PI;
    if wrapped >= PI {
        wrapped - TWO_PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mask_keeps_dc_and_nyquist_for_even_lengths() {
        let mask = analytic_mask(8);
        assert_eq!(mask, vec![1.0, 2.0, 2.0, 2.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn mask_keeps_only_dc_for_odd_lengths() {
        let mask = analytic_mask(7);
        assert_eq!(mask, vec![1.0, 2.0, 2.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn shift_round_trips_for_even_and_odd_lengths() {
        for n in [8usize, 9] {
            let original: Vec<usize> = (0..n).collect();
            let mut buf = original.clone();
            fftshift(&mut buf);
            ifftshift(&mut buf);
            assert_eq!(buf, original);
        }
    }

    #[test]
    fn analytic_signal_of_a_sinusoid_has_flat_envelope() {
        let n = 256;
        let window: Vec<f64> = (0..n)
            .map(|i| (TWO_PI * 8.0 * i as f64 / n as f64).sin())
            .collect();
        let fft = FftPair::new(n);
        let analytic = analytic_signal(&fft, &window);

        // away from the edges the envelope of a pure tone is constant
        for sample in &analytic[32..n - 32] {
            assert_abs_diff_eq!(sample.norm(), 1.0, epsilon = 0.05);
        }
    }

    #[test]
    fn normalization_lands_in_the_half_open_interval() {
        for raw in [-7.0, -PI, 0.0, PI, TWO_PI, 9.42] {
            let phase = normalize_phase(raw);
            assert!((-PI..PI).contains(&phase), "{raw} -> {phase}");
        }
        // a snapped trough reads as the start of a cycle
        assert_abs_diff_eq!(normalize_phase(0.0), -PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_phase(TWO_PI), -PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_phase(1.5 * PI), 0.5 * PI, epsilon = 1e-12);
    }
}

use std::f64::consts::PI;

use num_complex::Complex64;

use super::TransferFunction;

/// Evaluate the transfer function at the given frequencies in Hz. Negative
/// frequencies are legal; the endpoint-corrected estimator evaluates the
/// response across the full centered spectrum.
pub fn freqz_at(tf: &TransferFunction, freqs_hz: &[f64], fs: f64) -> Vec<Complex64> {
    freqs_hz
        .iter()
        .map(|&f| {
            let omega = 2.0 * PI * f / fs;
            let z_inv = Complex64::from_polar(1.0, -omega);
            eval_poly(&tf.b, z_inv) / eval_poly(&tf.a, z_inv)
        })
        .collect()
}

pub fn magnitude_at(tf: &TransferFunction, freq_hz: f64, fs: f64) -> f64 {
    freqz_at(tf, &[freq_hz], fs)[0].norm()
}

// Sum of c[m] * z^-m, accumulated in ascending powers
fn eval_poly(coeffs: &[f64], z_inv: Complex64) -> Complex64 {
    let mut acc = Complex64::new(0.0, 0.0);
    let mut power = Complex64::new(1.0, 0.0);
    for &c in coeffs {
        acc += power * c;
        power *= z_inv;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn moving_average_has_unit_dc_gain() {
        let tf = TransferFunction {
            b: vec![0.5, 0.5],
            a: vec![1.0],
        };
        let response = freqz_at(&tf, &[0.0], 100.0);
        assert_abs_diff_eq!(response[0].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(response[0].im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn response_is_conjugate_symmetric_for_real_coefficients() {
        let tf = TransferFunction {
            b: vec![0.2, 0.3, 0.1],
            a: vec![1.0, -0.4, 0.25],
        };
        let response = freqz_at(&tf, &[12.5, -12.5], 250.0);
        assert_abs_diff_eq!(response[0].re, response[1].re, epsilon = 1e-12);
        assert_abs_diff_eq!(response[0].im, -response[1].im, epsilon = 1e-12);
    }
}

//! Band-pass IIR design: analog prototype, band transform, bilinear
//! transform, then either a transfer-function pair or cascaded sections.

use std::f64::consts::PI;

use num_complex::Complex64;

use super::{BandPassCoefficients, FilterFamily, FilterForm, FilterSpec, Sos, TransferFunction};

// Ripple constants for the families that need them; the per-target config
// record carries no ripple fields.
const PASSBAND_RIPPLE_DB: f64 = 1.0;
const STOPBAND_ATTEN_DB: f64 = 40.0;

const REAL_TOL: f64 = 1e-8;

/// Analog or digital filter as zeros, poles and gain.
struct Zpk {
    z: Vec<Complex64>,
    p: Vec<Complex64>,
    k: f64,
}

/// Design the band-pass filter described by `spec` in the requested form.
/// `spec` is validated at construction, so the pipeline itself cannot fail.
pub fn design(spec: &FilterSpec, form: FilterForm) -> BandPassCoefficients {
    // Pre-warp the band edges for the bilinear transform
    let warped_low = 2.0 * spec.fs * (PI * spec.low_cut / spec.fs).tan();
    let warped_high = 2.0 * spec.fs * (PI * spec.high_cut / spec.fs).tan();
    let bw = warped_high - warped_low;
    let w0 = (warped_low * warped_high).sqrt();

    let prototype = analog_prototype(spec.family, spec.order);
    let bandpass = lowpass_to_bandpass(prototype, w0, bw);
    let digital = bilinear(bandpass, spec.fs);

    match form {
        FilterForm::TransferFunction => {
            BandPassCoefficients::TransferFunction(zpk_to_tf(&digital))
        }
        FilterForm::CascadedSections => BandPassCoefficients::CascadedSections(zpk_to_sos(&digital)),
    }
}

// ANALOG PROTOTYPES -----------------------------------------------------------

fn analog_prototype(family: FilterFamily, order: usize) -> Zpk {
    match family {
        FilterFamily::Butterworth => butterworth_prototype(order),
        FilterFamily::Chebyshev1 => chebyshev1_prototype(order, PASSBAND_RIPPLE_DB),
        FilterFamily::Elliptic => elliptic_prototype(order, PASSBAND_RIPPLE_DB, STOPBAND_ATTEN_DB),
    }
}

// Maximally flat: poles equally spaced on the left half of the unit circle.
fn butterworth_prototype(order: usize) -> Zpk {
    let n = order as i64;
    let p = (0..order)
        .map(|i| {
            let m = (-n + 1 + 2 * i as i64) as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n as f64))
        })
        .collect();
    Zpk {
        z: Vec::new(),
        p,
        k: 1.0,
    }
}

// Equiripple passband: Butterworth angles warped onto an ellipse.
fn chebyshev1_prototype(order: usize, ripple_db: f64) -> Zpk {
    let n = order as f64;
    let eps = (10f64.powf(ripple_db / 10.0) - 1.0).sqrt();
    let mu = (1.0 / eps).asinh() / n;

    let p: Vec<Complex64> = (0..order)
        .map(|i| {
            let m = (-(order as i64) + 1 + 2 * i as i64) as f64;
            let theta = PI * m / (2.0 * n);
            // -sinh(mu + j*theta)
            Complex64::new(-mu.sinh() * theta.cos(), -mu.cosh() * theta.sin())
        })
        .collect();

    let mut k = p
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &pole| acc * -pole)
        .re;
    if order % 2 == 0 {
        k /= (1.0 + eps * eps).sqrt();
    }
    Zpk {
        z: Vec::new(),
        p,
        k,
    }
}

// Equiripple passband and stopband, via the Landen/AGM construction of the
// Jacobi elliptic functions.
fn elliptic_prototype(order: usize, ripple_db: f64, atten_db: f64) -> Zpk {
    let n = order as f64;
    let eps_p = (10f64.powf(ripple_db / 10.0) - 1.0).sqrt();
    let eps_s = (10f64.powf(atten_db / 10.0) - 1.0).sqrt();
    let k1 = eps_p / eps_s;
    let k = elliptic_degree(order, k1);

    let pairs = order / 2;
    let odd = order % 2 == 1;

    let big_k = complete_elliptic_k(k);
    let big_k1 = complete_elliptic_k(k1);
    let k1p = (1.0 - k1 * k1).sqrt();

    // asn(j/eps, k1) is purely imaginary, so v0 reduces to a real incomplete
    // elliptic integral of modulus k1'
    let v0 = incomplete_elliptic_f((1.0 / eps_p).atan(), k1p) / (n * big_k1);

    let mut z = Vec::with_capacity(order);
    let mut p = Vec::with_capacity(order);

    for i in 1..=pairs {
        let u = (2 * i - 1) as f64 / n;
        let cd = jacobi_cd_real(u * big_k, k);
        let zero_im = 1.0 / (k * cd);
        z.push(Complex64::new(0.0, zero_im));
        z.push(Complex64::new(0.0, -zero_im));

        let pole = Complex64::new(0.0, 1.0)
            * jacobi_cd_complex(Complex64::new(u * big_k, -v0 * big_k), k);
        p.push(pole);
        p.push(pole.conj());
    }
    if odd {
        let kp2 = 1.0 - k * k;
        let (sn, cn, _) = jacobi_sncndn(v0 * big_k, kp2);
        p.push(Complex64::new(-sn / cn, 0.0));
    }

    let num = p
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &pole| acc * -pole);
    let den = z
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &zero| acc * -zero);
    let mut gain = (num / den).re;
    if !odd {
        gain /= (1.0 + eps_p * eps_p).sqrt();
    }

    Zpk { z, p, k: gain }
}

// Solve the elliptic degree equation for the selectivity modulus.
fn elliptic_degree(order: usize, k1: f64) -> f64 {
    let n = order as f64;
    let k1p = (1.0 - k1 * k1).sqrt();
    let big_k1p = complete_elliptic_k(k1p);
    let mut product = 1.0;
    for i in 1..=(order / 2) {
        let u = (2 * i - 1) as f64 / n;
        let (sn, _, _) = jacobi_sncndn(u * big_k1p, k1p * k1p);
        product *= sn.powi(4);
    }
    let kp = k1p.powi(order as i32) * product;
    (1.0 - kp * kp).sqrt().clamp(0.0, 1.0 - 1e-15)
}

// JACOBI / ELLIPTIC HELPERS ---------------------------------------------------

// Complete elliptic integral of the first kind via the arithmetic-geometric
// mean.
fn complete_elliptic_k(k: f64) -> f64 {
    let mut a = 1.0f64;
    let mut b = (1.0 - k * k).max(0.0).sqrt();
    while (a - b).abs() > 1e-15 * a {
        let next_a = 0.5 * (a + b);
        b = (a * b).sqrt();
        a = next_a;
    }
    PI / (2.0 * a)
}

// Incomplete elliptic integral of the first kind F(phi, k), composite
// Simpson rule. Runs once per filter construction; accuracy well beyond
// what the pole placement needs.
fn incomplete_elliptic_f(phi: f64, k: f64) -> f64 {
    let steps = 2048usize;
    let h = phi / steps as f64;
    let integrand =
        |theta: f64| 1.0 / (1.0 - (k * theta.sin()).powi(2)).max(f64::MIN_POSITIVE).sqrt();
    let mut sum = integrand(0.0) + integrand(phi);
    for i in 1..steps {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * integrand(i as f64 * h);
    }
    sum * h / 3.0
}

// Jacobi sn/cn/dn for real argument and parameter m = k^2, by the
// descending AGM with backward phase recovery (Abramowitz & Stegun 16.4).
fn jacobi_sncndn(u: f64, m: f64) -> (f64, f64, f64) {
    if m < 1e-14 {
        return (u.sin(), u.cos(), 1.0);
    }
    if 1.0 - m < 1e-14 {
        let sech = 1.0 / u.cosh();
        return (u.tanh(), sech, sech);
    }

    let mut a = vec![1.0f64];
    let mut c = vec![m.sqrt()];
    let mut b = (1.0 - m).sqrt();
    while c[c.len() - 1].abs() > 1e-15 {
        let an = a[a.len() - 1];
        a.push(0.5 * (an + b));
        c.push(0.5 * (an - b));
        b = (an * b).sqrt();
        if a.len() > 64 {
            break;
        }
    }

    let levels = a.len() - 1;
    let mut phi = 2f64.powi(levels as i32) * a[levels] * u;
    for i in (1..=levels).rev() {
        phi = 0.5 * (phi + ((c[i] / a[i]) * phi.sin()).asin());
    }

    let sn = phi.sin();
    let cn = phi.cos();
    let dn = (1.0 - m * sn * sn).max(0.0).sqrt();
    (sn, cn, dn)
}

fn jacobi_cd_real(u: f64, k: f64) -> f64 {
    let (_, cn, dn) = jacobi_sncndn(u, k * k);
    cn / dn
}

// cd(x + jy, k) through the addition formulas, using real sn/cn/dn of
// modulus k along x and of the complementary modulus along y.
fn jacobi_cd_complex(u: Complex64, k: f64) -> Complex64 {
    let m = k * k;
    let (s, c, d) = jacobi_sncndn(u.re, m);
    let (s1, c1, d1) = jacobi_sncndn(u.im, 1.0 - m);

    let denom = c1 * c1 + m * s * s * s1 * s1;
    let cn = Complex64::new(c * c1, -s * d * s1 * d1) / denom;
    let dn = Complex64::new(d * c1 * d1, -m * s * c * s1) / denom;
    cn / dn
}

// TRANSFORMS ------------------------------------------------------------------

// Low-pass prototype (cutoff 1 rad/s) to band-pass with center w0 and
// width bw, in the zpk domain.
fn lowpass_to_bandpass(proto: Zpk, w0: f64, bw: f64) -> Zpk {
    let degree = proto.p.len() - proto.z.len();
    let w0sq = Complex64::new(w0 * w0, 0.0);

    let split = |roots: &[Complex64]| -> Vec<Complex64> {
        let mut out = Vec::with_capacity(roots.len() * 2);
        for &r in roots {
            let scaled = r * (bw / 2.0);
            let shift = (scaled * scaled - w0sq).sqrt();
            out.push(scaled + shift);
            out.push(scaled - shift);
        }
        out
    };

    let mut z = split(&proto.z);
    let p = split(&proto.p);
    z.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));

    Zpk {
        z,
        p,
        k: proto.k * bw.powi(degree as i32),
    }
}

// Analog to digital via the bilinear transform.
fn bilinear(analog: Zpk, fs: f64) -> Zpk {
    let fs2 = Complex64::new(2.0 * fs, 0.0);
    let degree = analog.p.len() - analog.z.len();

    let z: Vec<Complex64> = analog.z.iter().map(|&s| (fs2 + s) / (fs2 - s)).collect();
    let p: Vec<Complex64> = analog.p.iter().map(|&s| (fs2 + s) / (fs2 - s)).collect();

    let num = analog
        .z
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &s| acc * (fs2 - s));
    let den = analog
        .p
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &s| acc * (fs2 - s));
    let k = analog.k * (num / den).re;

    let mut z = z;
    z.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));

    Zpk { z, p, k }
}

// OUTPUT FORMS ----------------------------------------------------------------

fn poly_from_roots(roots: &[Complex64]) -> Vec<f64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &r in roots {
        coeffs.push(Complex64::new(0.0, 0.0));
        for i in (1..coeffs.len()).rev() {
            let lower = coeffs[i - 1];
            coeffs[i] = coeffs[i] - r * lower;
        }
    }
    // Roots come in conjugate pairs, so the imaginary parts cancel
    coeffs.iter().map(|c| c.re).collect()
}

fn zpk_to_tf(zpk: &Zpk) -> TransferFunction {
    let b: Vec<f64> = poly_from_roots(&zpk.z)
        .into_iter()
        .map(|c| c * zpk.k)
        .collect();
    let a = poly_from_roots(&zpk.p);
    TransferFunction { b, a }
}

fn is_real(c: Complex64) -> bool {
    c.im.abs() <= REAL_TOL * (1.0 + c.re.abs())
}

fn take_closest(pool: &mut Vec<Complex64>, target: Complex64) -> Complex64 {
    let idx = pool
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (*a - target)
                .norm()
                .partial_cmp(&(*b - target).norm())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    pool.swap_remove(idx)
}

fn take_closest_real(pool: &mut Vec<Complex64>, target: Complex64) -> Complex64 {
    let idx = pool
        .iter()
        .enumerate()
        .filter(|(_, c)| is_real(**c))
        .min_by(|(_, a), (_, b)| {
            (*a - target)
                .norm()
                .partial_cmp(&(*b - target).norm())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(idx, _)| idx);
    match idx {
        Some(idx) => pool.swap_remove(idx),
        // Counts come out even for every band-pass design built here, so a
        // lone real root has a real partner; fall back to nearest otherwise
        None => take_closest(pool, target),
    }
}

fn take_partner(pool: &mut Vec<Complex64>, root: Complex64) -> Complex64 {
    if is_real(root) {
        take_closest_real(pool, root)
    } else {
        take_closest(pool, root.conj())
    }
}

// Pair conjugate poles with their nearest zeros, most selective poles first.
fn zpk_to_sos(zpk: &Zpk) -> Vec<Sos> {
    let mut poles = zpk.p.clone();
    let mut zeros = zpk.z.clone();
    let mut sections = Vec::with_capacity(poles.len() / 2);

    while !poles.is_empty() {
        let idx = poles
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (1.0 - a.norm())
                    .abs()
                    .partial_cmp(&(1.0 - b.norm()).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let p1 = poles.swap_remove(idx);
        let p2 = take_partner(&mut poles, p1);

        let z1 = take_closest(&mut zeros, p1);
        let z2 = take_partner(&mut zeros, z1);

        sections.push(Sos {
            b: [1.0, -(z1 + z2).re, (z1 * z2).re],
            a: [1.0, -(p1 + p2).re, (p1 * p2).re],
        });
    }

    if let Some(first) = sections.first_mut() {
        for coeff in first.b.iter_mut() {
            *coeff *= zpk.k;
        }
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::response::{freqz_at, magnitude_at};
    use crate::filters::sosfilt::sosfilt;

    fn spec(family: FilterFamily, order: usize) -> FilterSpec {
        FilterSpec::new(family, order, 6.0, 9.0, 1500.0).expect("valid spec")
    }

    fn passband_dominates(family: FilterFamily, order: usize) {
        let spec = spec(family, order);
        let tf = spec.transfer_function();
        let center = (spec.low_cut * spec.high_cut).sqrt();
        let center_mag = magnitude_at(&tf, center, spec.fs);
        // one octave outside the band on either side
        for outside in [spec.low_cut / 2.0, spec.high_cut * 2.0] {
            let outside_mag = magnitude_at(&tf, outside, spec.fs);
            assert!(
                center_mag > outside_mag,
                "{family:?} order {order}: center {center_mag} vs {outside} Hz {outside_mag}"
            );
        }
    }

    #[test]
    fn passband_gain_exceeds_stopband_for_all_families() {
        for family in [
            FilterFamily::Butterworth,
            FilterFamily::Chebyshev1,
            FilterFamily::Elliptic,
        ] {
            for order in [2, 3, 4] {
                passband_dominates(family, order);
            }
        }
    }

    #[test]
    fn butterworth_center_gain_is_near_unity() {
        let spec = spec(FilterFamily::Butterworth, 2);
        let tf = spec.transfer_function();
        let center_mag = magnitude_at(&tf, (spec.low_cut * spec.high_cut).sqrt(), spec.fs);
        assert!(
            (0.7..=1.3).contains(&center_mag),
            "center magnitude {center_mag}"
        );
    }

    #[test]
    fn bandpass_blocks_dc() {
        // butter and cheby1 put true zeros at dc; the elliptic design only
        // promises the stopband attenuation there
        for family in [FilterFamily::Butterworth, FilterFamily::Chebyshev1] {
            let spec = spec(family, 2);
            let tf = spec.transfer_function();
            let response = freqz_at(&tf, &[0.0], spec.fs);
            assert!(response[0].norm() < 1e-6, "{family:?} leaks dc");
        }
        let spec = spec(FilterFamily::Elliptic, 2);
        let tf = spec.transfer_function();
        let response = freqz_at(&tf, &[0.0], spec.fs);
        assert!(response[0].norm() < 0.05, "elliptic leaks dc");
    }

    #[test]
    fn sections_match_transfer_function_response() {
        for order in [2, 3] {
            let spec = spec(FilterFamily::Butterworth, order);
            let tf = spec.transfer_function();
            let sos = spec.sections();
            for f in [4.0, 7.5, 12.0] {
                let tf_mag = magnitude_at(&tf, f, spec.fs);
                let sos_mag: f64 = sos
                    .iter()
                    .map(|section| {
                        let section_tf = TransferFunction {
                            b: section.b.to_vec(),
                            a: section.a.to_vec(),
                        };
                        magnitude_at(&section_tf, f, spec.fs)
                    })
                    .product();
                assert!(
                    (tf_mag - sos_mag).abs() <= 1e-6 * (1.0 + tf_mag),
                    "order {order} at {f} Hz: tf {tf_mag} vs sos {sos_mag}"
                );
            }
        }
    }

    #[test]
    fn cascaded_sections_are_stable() {
        for family in [
            FilterFamily::Butterworth,
            FilterFamily::Chebyshev1,
            FilterFamily::Elliptic,
        ] {
            let sos = spec(family, 3).sections();
            let mut impulse = vec![0.0; 12000];
            impulse[0] = 1.0;
            let out = sosfilt(&sos, &impulse);
            let peak = out.iter().fold(0.0f64, |acc, &v| acc.max(v.abs()));
            let tail = out[11000..].iter().fold(0.0f64, |acc, &v| acc.max(v.abs()));
            assert!(peak.is_finite() && peak > 0.0);
            assert!(tail < 1e-2 * peak, "{family:?} impulse response rings on");
        }
    }
}

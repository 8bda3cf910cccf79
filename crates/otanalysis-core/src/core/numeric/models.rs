//! Piecewise force models fitted to press and pull segments.

const PASCAL_SCALE: f64 = 1e6;

/// Flat baseline, then a linear ramp. `p = [x0, k, y0]`.
#[inline]
pub fn approach_linear(t: f64, p: &[f64]) -> f64 {
    let (x0, k, y0) = (p[0], p[1], p[2]);
    if t < x0 { y0 } else { y0 + k * (t - x0) }
}

/// Flat baseline, then a Hertzian 3/2-power ramp. `p = [x0, k, y0]`.
#[inline]
pub fn approach_sphere(t: f64, p: &[f64]) -> f64 {
    let (x0, k, y0) = (p[0], p[1], p[2]);
    if t < x0 {
        y0
    } else {
        y0 + k * (t - x0).powf(1.5)
    }
}

/// Linear ramp up to the release, then a flat endline. `p = [k, x0, endline]`.
#[inline]
pub fn retraction(t: f64, p: &[f64]) -> f64 {
    let (k, x0, endline) = (p[0], p[1], p[2]);
    if t < x0 { k * (t - x0) + endline } else { endline }
}

/// Young's modulus (Pa) from the sphere-model coefficient.
///
/// `E = |k|·1e6·(3/4)·(1 - η²) / sqrt(R·δ³)`, rounded to two decimals.
pub fn young_modulus(k: f64, eta: f64, bead_radius: f64, indentation: f64) -> f64 {
    let young = k.abs() * PASCAL_SCALE * 3.0 / 4.0 * (1.0 - eta.powi(2))
        / (bead_radius * indentation.powi(3)).sqrt();
    (young * 100.0).round() / 100.0
}

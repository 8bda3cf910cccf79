//! Contact and release detection on smoothed force, and the piecewise model
//! fits of the press and pull segments.
//!
//! Event indices are searched on the smoothed series; every reported value
//! is read back from the unsmoothed corrected force at that index.

use tracing::{debug, warn};

use super::config::AnalysisConfig;
use super::error::EngineError;
use crate::core::models::curve::Curve;
use crate::core::models::features::{Estimate, FitModel, IndexedValue, PressFit, PullFit};
use crate::core::numeric::fitting::{FitResult, curve_fit};
use crate::core::numeric::models::{approach_linear, approach_sphere, retraction, young_modulus};
use crate::core::numeric::series::{argmin, derivative};
use crate::core::numeric::smoothing::savgol;

/// Force interval treated as baseline noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseBand {
    pub lower: f64,
    pub upper: f64,
}

impl NoiseBand {
    /// `[baseline - std, baseline + std * tolerance]`
    pub fn new(baseline: f64, std: f64, tolerance: f64) -> Self {
        Self {
            lower: baseline - std,
            upper: baseline + std * tolerance,
        }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Band around the corrected press baseline.
pub fn noise_band(curve: &Curve, tolerance: f64) -> Result<NoiseBand, EngineError> {
    let baseline = curve
        .features
        .baseline_corrected_press
        .ok_or(EngineError::MissingFeature("baseline_corrected_press"))?;
    let std = curve
        .features
        .std_corrected_press
        .ok_or(EngineError::MissingFeature("std_corrected_press"))?;
    Ok(NoiseBand::new(baseline, std, tolerance))
}

/// Last in-band sample: the press leaves the band at contact and never returns.
pub fn find_contact(smoothed: &[f64], band: NoiseBand) -> Option<usize> {
    smoothed.iter().rposition(|v| band.contains(*v))
}

/// First in-band sample: the pull enters the band when the bead leaves the cell.
pub fn find_release(smoothed: &[f64], band: NoiseBand) -> Option<usize> {
    smoothed.iter().position(|v| band.contains(*v))
}

/// First sample after the maximum that drops back below `threshold`,
/// shifted one sample past the crossing.
pub fn find_return_endline(smoothed: &[f64], max_index: usize, threshold: f64) -> Option<usize> {
    let last = smoothed.len().checked_sub(1)?;
    smoothed
        .get(max_index..)?
        .iter()
        .position(|v| *v < threshold)
        .map(|offset| (max_index + offset + 1).min(last))
}

/// Steepest descent of the smoothed force after the maximum.
pub fn find_transition(smoothed: &[f64], time: &[f64], max_index: usize, window: usize) -> Option<usize> {
    let slope = derivative(smoothed, time, window);
    let after = slope.get(max_index..)?;
    argmin(after).map(|i| i + max_index).filter(|&i| i > 0)
}

fn estimate(fit: &FitResult, index: usize) -> Estimate {
    Estimate {
        value: fit.params[index],
        error: fit.error(index),
    }
}

fn secant(x: &[f64], y: &[f64], a: usize, b: usize) -> f64 {
    let dx = x[a] - x[b];
    if dx == 0.0 { 0.0 } else { (y[a] - y[b]) / dx }
}

/// Locates the contact point and fits the approach model to the press.
pub fn fit_press(curve: &mut Curve, config: &AnalysisConfig) -> Result<(), EngineError> {
    let main = curve
        .features
        .main_axis
        .ok_or(EngineError::MissingFeature("main_axis"))?;
    let band = noise_band(curve, config.factor_noise)?;
    let baseline = curve.features.baseline_corrected_press.unwrap_or(0.0);

    let press = curve.press();
    let force = press.corrected.axis(main.axis).to_vec();
    let time = press.corrected.series_time.clone();
    if force.is_empty() {
        return Err(EngineError::Internal("press segment holds no samples".into()));
    }
    let smooth = savgol(&force, config.width_window_smooth, config.windows.smooth_order);

    let contact = find_contact(&smooth, band).unwrap_or_else(|| {
        curve.note("Contact not found in the press noise band");
        0
    });
    curve.features.contact_point = Some(IndexedValue::force(contact, force[contact]));
    curve.graphics.threshold_press = Some(band.lower);
    curve.features.model = config.model;

    let far = force.len().saturating_sub(10);
    let p0 = [
        time[contact.saturating_sub(1)],
        secant(&time, &smooth, far, contact),
        baseline,
    ];
    let model: fn(f64, &[f64]) -> f64 = match config.model {
        FitModel::Linear => approach_linear,
        FitModel::Sphere => approach_sphere,
    };

    match curve_fit(model, &time, &smooth, &p0) {
        Ok(fit) => {
            let slope = estimate(&fit, 1);
            let (young, young_error) = match config.model {
                FitModel::Linear => (None, None),
                FitModel::Sphere => {
                    let modulus = |k: f64| {
                        let e = young_modulus(k, config.eta, config.bead_radius, config.windows.indentation_depth);
                        (e.is_finite() && e >= 0.0).then_some(e)
                    };
                    (modulus(slope.value), slope.error.and_then(modulus))
                }
            };
            curve.graphics.fitted_press = time.iter().map(|t| model(*t, &fit.params)).collect();
            debug!(curve = %curve.title, contact, slope = slope.value, "Press fitted");
            curve.features.press_fit = Some(PressFit {
                model: config.model,
                contact_time: estimate(&fit, 0),
                slope,
                baseline: estimate(&fit, 2),
                young_modulus: young,
                young_error,
            });
        }
        Err(e) => {
            warn!(curve = %curve.title, error = %e, "Press fit failed");
            curve.note(format!("Press fit failed: {e}"));
            curve.features.press_fit = None;
        }
    }
    Ok(())
}

/// Locates the release point and fits the retraction model to the pull.
pub fn fit_pull(curve: &mut Curve, config: &AnalysisConfig) -> Result<(), EngineError> {
    let main = curve
        .features
        .main_axis
        .ok_or(EngineError::MissingFeature("main_axis"))?;
    let band = noise_band(curve, config.factor_noise)?;
    let baseline = curve.features.baseline_corrected_press.unwrap_or(0.0);

    let pull = curve.pull();
    let force = pull.corrected.axis(main.axis).to_vec();
    let time = pull.corrected.time.clone();
    if force.is_empty() {
        return Err(EngineError::Internal("pull segment holds no samples".into()));
    }
    let smooth = savgol(&force, config.width_window_smooth, config.windows.smooth_order);

    let release = find_release(&smooth, band).unwrap_or_else(|| {
        curve.note("Release not found in the pull noise band");
        0
    });
    curve.features.point_release = Some(IndexedValue::force(release, force[release]));
    curve.graphics.threshold_pull = Some(band.upper);

    let last = force.len() - 1;
    let near = (if release > 40 { release - 20 } else { 20 }).min(last);
    let far = if release > 100 { release - 100 } else { 0 };
    let p0 = [secant(&time, &smooth, near, far), time[release], baseline];

    match curve_fit(retraction, &time, &smooth, &p0) {
        Ok(fit) => {
            curve.graphics.fitted_pull = time.iter().map(|t| retraction(*t, &fit.params)).collect();
            debug!(curve = %curve.title, release, slope = fit.params[0], "Pull fitted");
            curve.features.pull_fit = Some(PullFit {
                slope: estimate(&fit, 0),
                release_time: estimate(&fit, 1),
                endline: estimate(&fit, 2),
            });
        }
        Err(e) => {
            warn!(curve = %curve.title, error = %e, "Pull fit failed");
            curve.note(format!("Pull fit failed: {e}"));
            curve.features.pull_fit = None;
        }
    }
    curve.graphics.smooth_pull = smooth;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::models::segment::Phase;
    use crate::engine::config::AnalysisConfigBuilder;
    use crate::engine::normalizer::tests::{header, segment};
    use crate::engine::normalizer::{compute_statistics, detect_extremes, normalize};

    /// 1 pN, in newtons.
    pub(crate) const NOISE: f64 = 1e-12;

    /// Alternating noise that averages to exactly zero over even windows.
    pub(crate) fn noise(i: usize) -> f64 {
        if i % 2 == 0 { NOISE } else { -NOISE }
    }

    /// Flat noise until `contact`, then a ramp of `-10` pN per sample.
    pub(crate) fn press_signal(len: usize, contact: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                if i <= contact {
                    noise(i)
                } else {
                    -10.0 * NOISE * (i - contact) as f64
                }
            })
            .collect()
    }

    /// Compressed start climbing to the baseline at `release`, then `tail(i)`.
    pub(crate) fn pull_signal(len: usize, release: usize, tail: impl Fn(usize) -> f64) -> Vec<f64> {
        (0..len)
            .map(|i| {
                if i < release {
                    -10.0 * NOISE * (release - i) as f64
                } else {
                    tail(i)
                }
            })
            .collect()
    }

    pub(crate) fn config() -> AnalysisConfig {
        AnalysisConfigBuilder::with_defaults()
            .width_window_smooth(5)
            .build()
            .unwrap()
    }

    pub(crate) fn prepared_curve(press: Vec<f64>, pull: Vec<f64>) -> Curve {
        let t_wait = press.len() as f64 * 0.001;
        let t_pull = t_wait + 0.1;
        let segments = vec![
            segment(0, Phase::Press, press, 0.0, None),
            segment(1, Phase::Wait, vec![0.0; 100], t_wait, None),
            segment(2, Phase::Pull, pull, t_pull, None),
        ];
        let mut curve = Curve::new("memory", "b1c1-test", header("3.14159265"), segments).unwrap();
        let config = config();
        normalize(&mut curve, &config.windows).unwrap();
        compute_statistics(&mut curve, &config.windows).unwrap();
        detect_extremes(&mut curve).unwrap();
        curve
    }

    #[test]
    fn band_is_asymmetric() {
        let band = NoiseBand::new(1.0, 2.0, 5.0);
        assert_eq!(band, NoiseBand { lower: -1.0, upper: 11.0 });
        assert!(band.contains(-1.0) && band.contains(11.0));
        assert!(!band.contains(-1.5));
    }

    #[test]
    fn contact_is_last_and_release_first_in_band() {
        let band = NoiseBand::new(0.0, 1.0, 2.0);
        let series = [-5.0, 0.5, 0.0, -3.0, 0.2, 9.0];
        assert_eq!(find_contact(&series, band), Some(4));
        assert_eq!(find_release(&series, band), Some(1));
        assert_eq!(find_contact(&[9.0, 9.0], band), None);
    }

    #[test]
    fn return_endline_is_searched_after_the_maximum() {
        let series = [0.0, 0.0, 3.0, 8.0, 6.0, 2.0, 0.5, 0.0];
        assert_eq!(find_return_endline(&series, 3, 1.0), Some(7));
        assert_eq!(find_return_endline(&series, 3, 0.1), Some(7));
        assert_eq!(find_return_endline(&series, 3, -1.0), None);
    }

    #[test]
    fn transition_is_the_steepest_drop_after_the_maximum() {
        let series = [0.0, 4.0, 8.0, 7.5, 7.0, 1.0, 0.5, 0.4, 0.3, 0.2];
        let time: Vec<f64> = (0..series.len()).map(|i| i as f64).collect();
        let transition = find_transition(&series, &time, 2, 4).unwrap();
        assert!((4..=5).contains(&transition));
    }

    #[test]
    fn press_contact_is_recovered_within_two_samples() {
        let contact = 1500;
        let mut curve = prepared_curve(press_signal(1800, contact), pull_signal(1800, 300, noise));
        fit_press(&mut curve, &config()).unwrap();

        let found = curve.features.contact_point.unwrap().index;
        assert!(found.abs_diff(contact) <= 2, "contact {found} vs {contact}");
        assert_eq!(curve.features.model, FitModel::Linear);
        let fit = curve.features.press_fit.as_ref().unwrap();
        assert!(fit.slope.value < 0.0);
        assert_eq!(curve.graphics.fitted_press.len(), 1800);
    }

    #[test]
    fn pull_release_is_recovered_within_two_samples() {
        let release = 300;
        let mut curve = prepared_curve(press_signal(1800, 1500), pull_signal(1800, release, noise));
        fit_pull(&mut curve, &config()).unwrap();

        let found = curve.features.point_release.unwrap().index;
        assert!(found.abs_diff(release) <= 2, "release {found} vs {release}");
        assert_eq!(curve.graphics.smooth_pull.len(), 1800);
        assert!(curve.graphics.threshold_pull.unwrap() > 0.0);
    }

    #[test]
    fn sphere_model_reports_a_non_negative_modulus() {
        let mut config = config();
        config.model = FitModel::Sphere;
        let mut curve = prepared_curve(press_signal(1800, 1500), pull_signal(1800, 300, noise));
        fit_press(&mut curve, &config).unwrap();
        let fit = curve.features.press_fit.as_ref().unwrap();
        assert_eq!(fit.model, FitModel::Sphere);
        assert!(fit.young_modulus.is_none_or(|e| e >= 0.0));
    }
}

use tracing::{debug, info};

use super::config::AnalysisConfig;
use super::detection::{find_return_endline, find_transition, noise_band};
use super::error::EngineError;
use crate::core::models::curve::Curve;
use crate::core::models::features::{
    Category, ClassificationFit, ClassificationFitKind, IndexedValue, JumpMetrics,
};
use crate::core::numeric::fitting::linear_fit;
use crate::core::numeric::series::argmax;
use crate::core::numeric::smoothing::savgol;

/// Compares the pull endline with the press baseline.
///
/// Returns `None` when the endline lies strictly inside the noise band,
/// `ITU` when it stays above and `RE` otherwise.
pub fn compare_baselines(curve: &Curve, config: &AnalysisConfig) -> Result<Option<Category>, EngineError> {
    let main = curve
        .features
        .main_axis
        .ok_or(EngineError::MissingFeature("main_axis"))?;
    let baseline = curve
        .features
        .baseline_corrected_press
        .ok_or(EngineError::MissingFeature("baseline_corrected_press"))?;
    let std = curve
        .features
        .std_corrected_press
        .ok_or(EngineError::MissingFeature("std_corrected_press"))?;

    let endline = curve.pull().baseline(main.axis, true, config.windows.baseline);
    let margin = std * config.factor_noise;
    let tentative = if endline > baseline - margin && endline < baseline + margin {
        None
    } else if endline > baseline + margin {
        Some(Category::Itu)
    } else {
        Some(Category::Re)
    };
    debug!(curve = %curve.title, endline, baseline, margin, ?tentative, "Baselines compared");
    Ok(tentative)
}

/// Assigns the curve its category and records jump metrics and
/// classification fits.
///
/// Requires the press statistics and the pull fit. A `manual` run stores the
/// result as the user-facing category; otherwise as the automatic one.
pub fn classify(curve: &mut Curve, config: &AnalysisConfig, manual: bool) -> Result<Category, EngineError> {
    let main = curve
        .features
        .main_axis
        .ok_or(EngineError::MissingFeature("main_axis"))?;
    if curve.graphics.smooth_pull.len() != curve.pull().len() {
        curve.graphics.smooth_pull = savgol(
            curve.pull().corrected.axis(main.axis),
            config.width_window_smooth,
            config.windows.smooth_order,
        );
    }

    curve.features.jump = JumpMetrics::default();
    curve.features.classification_slopes = Default::default();
    curve.graphics.classification_fits.clear();
    curve.features.point_return_endline = None;
    curve.features.transition_point = None;

    let max_curve = curve
        .features
        .force_max_curve
        .ok_or(EngineError::MissingFeature("force_max_curve"))?;

    let category = match compare_baselines(curve, config)? {
        None => classify_jump(curve, config)?,
        Some(Category::Itu) => {
            infinite_tube(curve, config)?;
            Category::Itu
        }
        Some(other) => other,
    };
    let category = if max_curve.value <= config.jump_force {
        Category::Nad
    } else {
        category
    };
    if category == Category::Nad {
        curve.features.point_return_endline = None;
        curve.features.transition_point = None;
    }

    let force_max_pull = {
        let pull = curve.pull().corrected.axis(main.axis);
        argmax(pull).map(|i| IndexedValue::force(i, pull[i]))
    };
    curve.features.force_max_pull = force_max_pull;

    let features = &mut curve.features;
    features.tolerance = Some(config.factor_noise);
    features.drug = config.drug.clone();
    features.condition = config.condition.clone();
    if manual {
        features.category = Some(category);
    } else {
        features.automatic_category = Some(category);
    }
    info!(curve = %curve.title, %category, manual, "Curve classified");
    Ok(category)
}

/// Jump analysis for curves whose endline matches the press baseline.
fn classify_jump(curve: &mut Curve, config: &AnalysisConfig) -> Result<Category, EngineError> {
    let main = curve
        .features
        .main_axis
        .ok_or(EngineError::MissingFeature("main_axis"))?;
    let band = noise_band(curve, config.factor_noise)?;
    let release = curve
        .features
        .point_release
        .ok_or(EngineError::MissingFeature("point_release"))?
        .index;

    let smooth = curve.graphics.smooth_pull.clone();
    let pull = curve.pull();
    let force = pull.corrected.axis(main.axis).to_vec();
    let time = pull.corrected.time.clone();
    let distance = pull.corrected.distance.clone();
    let speed = pull.features.speed.or_else(|| pull.header.speed());

    let Some(imax) = argmax(&smooth) else {
        return Ok(Category::Re);
    };
    let Some(ret) = find_return_endline(&smooth, imax, band.upper) else {
        debug!(curve = %curve.title, "No return to the endline");
        return Ok(Category::Re);
    };
    curve.features.point_return_endline = Some(IndexedValue::force(ret, force[ret]));
    let transition = find_transition(&smooth, &time, imax, config.windows.derivative);
    curve.features.transition_point = transition.map(|i| IndexedValue::force(i, force[i]));

    let nb_start = imax as i64 - release as i64;
    let nb_end = ret as i64 - imax as i64;
    let time_end = time[ret] - time[imax];
    let mut jump = JumpMetrics {
        force_start: Some(smooth[imax] - smooth[release]),
        force_end: Some(smooth[imax] - smooth[ret]),
        nb_points_start: Some(nb_start),
        nb_points_end: Some(nb_end),
        time_start: Some(time[imax] - time[release]),
        time_end: Some(time_end),
        ..Default::default()
    };

    match &distance {
        Some(d) => {
            jump.distance_start = Some(d[imax] - d[release]);
            jump.distance_end = Some(d[ret] - d[imax]);

            let divisor = config.windows.classification_divisor;
            let (imax_i, release_i, ret_i) = (imax as i64, release as i64, ret as i64);
            let width_start = nb_start.div_euclid(divisor);
            let width_end = nb_end.div_euclid(divisor);
            let windows = [
                (ClassificationFitKind::Max, imax_i - width_start, imax_i),
                (ClassificationFitKind::Release, release_i, release_i + width_start),
                (ClassificationFitKind::ReturnEndline, ret_i - width_end, ret_i),
            ];
            for (kind, start, end) in windows {
                classification_fit(curve, kind, d, &smooth, start, end);
            }
            if let Some(tr) = transition
                && imax + 2 < tr
            {
                classification_fit(
                    curve,
                    ClassificationFitKind::MaxTransition,
                    d,
                    &smooth,
                    imax_i + 2,
                    tr as i64,
                );
            }
        }
        None => {
            jump.distance_end = speed.map(|v| v * 1e9 * time_end);
        }
    }

    let distance_end = jump.distance_end.unwrap_or(f64::INFINITY);
    let category = if nb_end < config.jump_point && distance_end < config.jump_distance {
        Category::Ad
    } else {
        Category::Ftu
    };
    debug!(curve = %curve.title, nb_end, distance_end, %category, "Jump analyzed");
    curve.features.jump = jump;
    Ok(category)
}

/// Metrics for a tube still attached at the end of the pull.
fn infinite_tube(curve: &mut Curve, config: &AnalysisConfig) -> Result<(), EngineError> {
    let main = curve
        .features
        .main_axis
        .ok_or(EngineError::MissingFeature("main_axis"))?;
    let smooth = curve.graphics.smooth_pull.clone();
    let pull = curve.pull();
    let force = pull.corrected.axis(main.axis).to_vec();
    let distance = pull.corrected.distance.clone();
    let Some(last) = force.len().checked_sub(1) else {
        return Ok(());
    };
    let imax = argmax(&force).unwrap_or(0);

    curve.features.transition_point = Some(IndexedValue::force(last, force[last]));
    curve.features.jump.force_end = Some((force[imax] - force[last]).abs());
    if let Some(d) = &distance {
        curve.features.jump.distance_end = Some(d[last] - d[imax]);
        let start = last.saturating_sub(config.windows.itu_transition_fit) as i64;
        classification_fit(
            curve,
            ClassificationFitKind::MaxTransition,
            d,
            &smooth,
            start,
            last as i64,
        );
    }
    debug!(curve = %curve.title, max = imax, last, "Infinite tube");
    Ok(())
}

/// Line of smoothed force against distance over `start..end`; windows too
/// short or out of range are skipped.
fn classification_fit(
    curve: &mut Curve,
    kind: ClassificationFitKind,
    distance: &[f64],
    smooth: &[f64],
    start: i64,
    end: i64,
) {
    let len = distance.len().min(smooth.len()) as i64;
    if start < 0 || end > len || end - start < 2 {
        return;
    }
    let (start, end) = (start as usize, end as usize);
    let x = &distance[start..end];
    match linear_fit(x, &smooth[start..end]) {
        Ok(line) => {
            curve.features.classification_slopes.set(kind, line.slope);
            curve.graphics.classification_fits.push(ClassificationFit {
                kind,
                distance: x.to_vec(),
                fitted: x.iter().map(|v| line.at(*v)).collect(),
            });
        }
        Err(e) => curve.note(format!("{kind:?} classification fit failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::detection::fit_pull;
    use crate::engine::detection::tests::{NOISE, config, noise, prepared_curve, press_signal, pull_signal};

    fn classified(pull: Vec<f64>) -> (Curve, Category) {
        let config = config();
        let mut curve = prepared_curve(press_signal(1800, 1500), pull);
        fit_pull(&mut curve, &config).unwrap();
        let category = classify(&mut curve, &config, false).unwrap();
        (curve, category)
    }

    /// A tube bump of `height` pN peaking at `peak` and lasting `width`
    /// samples on each side.
    fn bump(peak: usize, width: usize, height: f64) -> impl Fn(usize) -> f64 {
        move |i| {
            let offset = i.abs_diff(peak);
            if offset < width {
                height * NOISE * (1.0 - offset as f64 / width as f64)
            } else {
                noise(i)
            }
        }
    }

    #[test]
    fn flat_pull_is_no_adhesion() {
        let (curve, category) = classified(pull_signal(1800, 300, noise));
        assert_eq!(category, Category::Nad);
        assert_eq!(curve.features.automatic_category, Some(Category::Nad));
        assert!(curve.features.point_return_endline.is_none());
        assert!(curve.features.transition_point.is_none());
    }

    #[test]
    fn short_bump_is_adhesion() {
        let (curve, category) = classified(pull_signal(1800, 300, bump(500, 40, 30.0)));
        assert_eq!(category, Category::Ad);
        assert!(curve.features.point_return_endline.is_some());
        assert!(curve.features.jump.force_start.unwrap() > 20.0);
        assert!(curve.features.jump.nb_points_end.unwrap() < 200);
    }

    #[test]
    fn long_tube_is_finite_tube() {
        let (curve, category) = classified(pull_signal(1800, 300, bump(700, 350, 30.0)));
        assert_eq!(category, Category::Ftu);
        assert!(curve.features.jump.nb_points_end.unwrap() >= 200);
    }

    #[test]
    fn raised_endline_is_infinite_tube() {
        let rising = |i: usize| NOISE * 0.05 * (i as f64 - 300.0);
        let (curve, category) = classified(pull_signal(1800, 300, rising));
        assert_eq!(category, Category::Itu);
        assert_eq!(curve.features.transition_point.unwrap().index, 1799);
        assert_eq!(curve.features.force_max_pull.unwrap().index, 1799);
    }

    #[test]
    fn lowered_endline_is_rejected() {
        let tube = bump(500, 40, 60.0);
        let (_, category) = classified(pull_signal(1800, 300, move |i| tube(i) - 20.0 * NOISE));
        assert_eq!(category, Category::Re);
    }

    #[test]
    fn weak_maximum_is_no_adhesion_whatever_the_endline() {
        let (curve, category) = classified(pull_signal(1800, 300, |i| noise(i) - 20.0 * NOISE));
        assert_eq!(category, Category::Nad);
        assert!(curve.features.force_max_curve.unwrap().value <= config().jump_force);
    }

    #[test]
    fn manual_run_sets_the_user_category() {
        let config = config();
        let mut curve = prepared_curve(press_signal(1800, 1500), pull_signal(1800, 300, noise));
        fit_pull(&mut curve, &config).unwrap();
        classify(&mut curve, &config, true).unwrap();
        assert_eq!(curve.features.category, Some(Category::Nad));
        assert_eq!(curve.features.automatic_category, None);
        assert_eq!(curve.features.tolerance, Some(config.factor_noise));
    }

    #[test]
    fn classification_is_deterministic() {
        let pull = pull_signal(1800, 300, bump(500, 40, 30.0));
        let (a, _) = classified(pull.clone());
        let (b, _) = classified(pull);
        assert_eq!(a.features, b.features);
    }
}

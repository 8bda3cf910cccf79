use std::f64::consts::{FRAC_PI_2, PI};

use tracing::{debug, warn};

use super::config::Windows;
use super::error::{AxisError, EngineError};
use crate::core::io::error::IncompleteError;
use crate::core::models::channel::Axis;
use crate::core::models::curve::{Curve, CurveHeader};
use crate::core::models::features::{IndexedValue, Sign, SignedAxis, Unit};
use crate::core::numeric::series;

const PICONEWTON: f64 = 1e12;
const NANOMETER: f64 = 1e9;
/// N/m to pN/nm.
const STIFFNESS_SCALE: f64 = 1e3;
const SAMPLE_SCANNER: &str = "sample-scanner";

/// Maps a scan angle onto one of the four canonical directions.
///
/// Each direction owns the open interval `(center - tolerance, center + tolerance)`;
/// both `π` and `-π` mean `-x`.
pub fn classify_angle(angle: f64, tolerance: f64) -> Option<SignedAxis> {
    let near = |center: f64| (angle - center).abs() < tolerance;
    if near(PI) || near(-PI) {
        Some(SignedAxis::new(Sign::Minus, Axis::X))
    } else if near(0.0) {
        Some(SignedAxis::new(Sign::Plus, Axis::X))
    } else if near(-FRAC_PI_2) {
        Some(SignedAxis::new(Sign::Minus, Axis::Y))
    } else if near(FRAC_PI_2) {
        Some(SignedAxis::new(Sign::Plus, Axis::Y))
    } else {
        None
    }
}

pub fn identify_main_axis(header: &CurveHeader, tolerance: f64) -> Result<SignedAxis, AxisError> {
    match header.scanner() {
        Some(SAMPLE_SCANNER) => {}
        Some(other) => return Err(AxisError::Scanner(other.to_string())),
        None => return Err(AxisError::MissingScanner),
    }
    let angle = header.scan_angle().ok_or(AxisError::MissingAngle)?;
    classify_angle(angle, tolerance).ok_or(AxisError::Angle(angle))
}

/// Converts every segment to calibrated force (pN), rebased time and
/// bending-corrected distance (nm), then reverses a `+` main axis.
///
/// The main axis is identified once; a curve that already carries one keeps it.
pub fn normalize(curve: &mut Curve, windows: &Windows) -> Result<SignedAxis, EngineError> {
    let main = match curve.features.main_axis {
        Some(axis) => axis,
        None => match identify_main_axis(&curve.header, windows.angle_tolerance) {
            Ok(axis) => axis,
            Err(e) => {
                warn!(curve = %curve.title, error = %e, "Main axis not identified");
                curve.note(e.to_string());
                return Err(e.into());
            }
        },
    };
    curve.features.main_axis = Some(main);

    let stiffness = match curve.header.calibrations.stiffness(main.axis) {
        Some(k) if k != 0.0 => k,
        _ => {
            let channel = main.axis.channel_name().to_string();
            curve.note(format!("No stiffness calibration for {channel}"));
            return Err(EngineError::MissingCalibration(channel));
        }
    };
    let stiffness = stiffness * STIFFNESS_SCALE;
    curve.features.stiffness = Some(stiffness);

    for axis in Axis::ALL {
        let baseline = curve.press().baseline(axis, false, windows.baseline);
        for segment in curve.segments_mut() {
            let force = segment
                .raw
                .axis(axis)
                .iter()
                .map(|v| (v - baseline) * PICONEWTON)
                .collect();
            *segment.corrected.axis_mut(axis) = force;
        }
    }

    let series_origin = curve
        .segments()
        .first()
        .and_then(|s| s.raw.series_time.first().copied())
        .unwrap_or(0.0);
    for segment in curve.segments_mut() {
        let origin = segment.raw.time.first().copied().unwrap_or(0.0);
        segment.corrected.time = segment.raw.time.iter().map(|t| t - origin).collect();
        segment.corrected.series_time = segment
            .raw
            .series_time
            .iter()
            .map(|t| t - series_origin)
            .collect();

        segment.corrected.distance = segment.raw.distance.as_ref().map(|distance| {
            let force = segment.corrected.axis(main.axis);
            let bent: Vec<f64> = distance
                .iter()
                .zip(force)
                .map(|(d, f)| d * NANOMETER - f / stiffness)
                .collect();
            let offset = bent.first().copied().unwrap_or(0.0);
            bent.iter().map(|x| (x - offset).abs()).collect()
        });

        if segment.is_motion() {
            segment.features.speed = segment.header.speed();
        }
    }

    if main.sign == Sign::Plus {
        reverse(curve);
    }
    debug!(curve = %curve.title, axis = %main, stiffness, "Curve normalized");
    Ok(main)
}

/// Negates the corrected deflection of every axis in every segment.
pub fn reverse(curve: &mut Curve) {
    for segment in curve.segments_mut() {
        for axis in Axis::ALL {
            segment
                .corrected
                .axis_mut(axis)
                .iter_mut()
                .for_each(|v| *v = -*v);
        }
    }
}

/// A pull holding fewer than `pulling_length` percent of its declared points
/// is incomplete.
pub fn check_truncation(curve: &Curve, pulling_length: f64) -> Result<(), IncompleteError> {
    let pull = curve.pull();
    let actual = pull.len();
    let Some(declared) = pull.header.num_points() else {
        return Ok(());
    };
    if declared != actual && declared as f64 * pulling_length.trunc() / 100.0 > actual as f64 {
        return Err(IncompleteError::Points {
            phase: pull.phase.name(),
            declared,
            actual,
        });
    }
    Ok(())
}

/// Press baselines and noise levels on the main axis, raw and corrected.
pub fn compute_statistics(curve: &mut Curve, windows: &Windows) -> Result<(), EngineError> {
    let main = curve
        .features
        .main_axis
        .ok_or(EngineError::MissingFeature("main_axis"))?;
    let press = curve.press();
    let (baseline_origin, baseline_corrected, std_origin, std_corrected) = if press.is_motion() {
        (
            press.baseline(main.axis, false, windows.baseline),
            press.baseline(main.axis, true, windows.baseline),
            press.std(main.axis, false, windows.std),
            press.std(main.axis, true, windows.std),
        )
    } else {
        (0.0, 0.0, 0.0, 0.0)
    };

    let features = &mut curve.features;
    features.baseline_origin_press = Some(baseline_origin);
    features.baseline_corrected_press = Some(baseline_corrected);
    features.std_origin_press = Some(std_origin);
    features.std_corrected_press = Some(std_corrected);
    Ok(())
}

/// Minimum of the press, and curve-wide minimum and maximum on the main axis.
///
/// Curve-wide extremes start at zero, so a curve that never goes negative
/// reports a zero minimum at index 0.
pub fn detect_extremes(curve: &mut Curve) -> Result<(), EngineError> {
    let main = curve
        .features
        .main_axis
        .ok_or(EngineError::MissingFeature("main_axis"))?;

    let press = curve.press().corrected.axis(main.axis);
    let force_min_press = series::argmin(press).map(|i| IndexedValue::force(i, press[i]));

    let mut min_curve = IndexedValue::force(0, 0.0);
    let mut time_min_curve = IndexedValue::new(0, 0.0, Unit::Second);
    let mut max_curve = IndexedValue::force(0, 0.0);
    for segment in curve.segments() {
        let force = segment.corrected.axis(main.axis);
        if let Some(i) = series::argmin(force)
            && force[i] < min_curve.value
        {
            min_curve = IndexedValue::force(i, force[i]);
            let time = segment.corrected.series_time.get(i).copied().unwrap_or(0.0);
            time_min_curve = IndexedValue::new(i, time, Unit::Second);
        }
        if let Some(i) = series::argmax(force)
            && force[i] > max_curve.value
        {
            max_curve = IndexedValue::force(i, force[i]);
        }
    }

    let features = &mut curve.features;
    features.force_min_press = force_min_press;
    features.force_min_curve = Some(min_curve);
    features.time_min_curve = Some(time_min_curve);
    features.force_max_curve = Some(max_curve);
    Ok(())
}

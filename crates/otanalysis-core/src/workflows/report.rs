//! Flat, one-row-per-curve record of an analysis result.
//!
//! Every field is a scalar so the record serializes directly into a CSV/TSV
//! row; column names carry their unit.

use crate::core::models::curve::Curve;
use crate::core::models::features::{Category, FitModel, IndexedValue, OpticalState};
use crate::core::models::segment::{Phase, Segment};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static COUPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(b\d+)(c\d+)").expect("couple pattern is a valid regex"));

/// Identity fields parsed from a `b<N>c<N>[letters]-<date>-<hh.mm.ss.ms>` title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleInfo {
    pub bead: Option<String>,
    pub cell: Option<String>,
    pub couple: Option<String>,
    pub date: Option<String>,
    pub hour: Option<String>,
}

impl TitleInfo {
    pub fn parse(title: &str) -> Self {
        let parts: Vec<&str> = title.split('-').collect();
        let captures = parts.first().and_then(|first| COUPLE.captures(first));
        let group = |i: usize| {
            captures
                .as_ref()
                .and_then(|c| c.get(i))
                .map(|m| m.as_str().to_string())
        };
        Self {
            bead: group(1),
            cell: group(2),
            couple: group(0),
            date: parts.get(1).map(|d| d.to_string()),
            hour: parts
                .get(2)
                .map(|h| h.split('.').take(4).collect::<Vec<_>>().join(".")),
        }
    }
}

/// Declared acquisition settings of a motion segment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct MotionSettings {
    distance: Option<f64>,
    speed: Option<f64>,
    frequency: Option<f64>,
}

impl MotionSettings {
    fn of(segment: Option<&Segment>) -> Self {
        let Some(header) = segment.map(|s| &s.header) else {
            return Self::default();
        };
        let frequency = header
            .duration()
            .filter(|d| *d != 0.0)
            .zip(header.num_points())
            .map(|(duration, n)| n as f64 / duration);
        Self {
            distance: header.length(),
            speed: header.speed(),
            frequency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveRecord {
    pub file: String,
    pub title: String,
    #[serde(rename = "automatic_type")]
    pub automatic_category: Option<Category>,
    #[serde(rename = "type")]
    pub category: Option<Category>,
    #[serde(rename = "AL")]
    pub alignment: Option<&'static str>,
    #[serde(rename = "AL_axe")]
    pub alignment_axes: String,
    pub incomplete: bool,
    pub optical_state: OpticalState,
    pub model: FitModel,
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Hour")]
    pub hour: Option<String>,
    pub condition: Option<String>,
    pub drug: Option<String>,
    pub tolerance: Option<f64>,
    pub bead: Option<String>,
    pub cell: Option<String>,
    pub couple: Option<String>,
    pub main_axis: Option<String>,

    #[serde(rename = "stiffness (N/m)")]
    pub stiffness: Option<f64>,
    #[serde(rename = "theorical_contact_force (N)")]
    pub theoretical_contact_force: Option<f64>,
    #[serde(rename = "theorical_distance_Press (m)")]
    pub press_distance: Option<f64>,
    #[serde(rename = "theorical_speed_Press (m/s)")]
    pub press_speed: Option<f64>,
    #[serde(rename = "theorical_freq_Press (Hz)")]
    pub press_frequency: Option<f64>,
    #[serde(rename = "time_segment_pause_Wait (s)")]
    pub pause_time: f64,
    #[serde(rename = "theorical_distance_Pull (m)")]
    pub pull_distance: Option<f64>,
    #[serde(rename = "theorical_speed_Pull (m/s)")]
    pub pull_speed: Option<f64>,
    #[serde(rename = "theorical_freq_Pull (Hz)")]
    pub pull_frequency: Option<f64>,

    #[serde(rename = "baseline_origin_press (N)")]
    pub baseline_origin_press: Option<f64>,
    #[serde(rename = "baseline_corrected_press (pN)")]
    pub baseline_corrected_press: Option<f64>,
    #[serde(rename = "std_origin_press (N)")]
    pub std_origin_press: Option<f64>,
    #[serde(rename = "std_corrected_press (pN)")]
    pub std_corrected_press: Option<f64>,

    #[serde(rename = "slope (pN/nm)")]
    pub slope: Option<f64>,
    #[serde(rename = "error (pN/nm)")]
    pub slope_error: Option<f64>,
    #[serde(rename = "young (Pa)")]
    pub young: Option<f64>,
    #[serde(rename = "error young (Pa)")]
    pub young_error: Option<f64>,

    pub contact_point_index: Option<usize>,
    #[serde(rename = "contact_point_value (pN)")]
    pub contact_point_value: Option<f64>,
    pub force_min_press_index: Option<usize>,
    #[serde(rename = "force_min_press_value (pN)")]
    pub force_min_press_value: Option<f64>,
    pub force_min_curve_index: Option<usize>,
    #[serde(rename = "force_min_curve_value (pN)")]
    pub force_min_curve_value: Option<f64>,
    pub time_min_curve_index: Option<usize>,
    #[serde(rename = "time_min_curve_value (s)")]
    pub time_min_curve_value: Option<f64>,
    pub point_release_index: Option<usize>,
    #[serde(rename = "point_release_value (pN)")]
    pub point_release_value: Option<f64>,
    pub force_max_pull_index: Option<usize>,
    #[serde(rename = "force_max_pull_value (pN)")]
    pub force_max_pull_value: Option<f64>,
    pub force_max_curve_index: Option<usize>,
    #[serde(rename = "force_max_curve_value (pN)")]
    pub force_max_curve_value: Option<f64>,
    pub transition_point_index: Option<usize>,
    #[serde(rename = "transition_point_value (pN)")]
    pub transition_point_value: Option<f64>,
    pub point_return_endline_index: Option<usize>,
    #[serde(rename = "point_return_endline_value (pN)")]
    pub point_return_endline_value: Option<f64>,

    #[serde(rename = "jump_force_start_pull (pN)")]
    pub jump_force_start: Option<f64>,
    #[serde(rename = "jump_force_end_pull (pN)")]
    pub jump_force_end: Option<f64>,
    pub jump_nb_points_start: Option<i64>,
    pub jump_nb_points_end: Option<i64>,
    #[serde(rename = "jump_time_start_pull (s)")]
    pub jump_time_start: Option<f64>,
    #[serde(rename = "jump_time_end_pull (s)")]
    pub jump_time_end: Option<f64>,
    #[serde(rename = "jump_distance_start_pull (nm)")]
    pub jump_distance_start: Option<f64>,
    #[serde(rename = "jump_distance_end_pull (nm)")]
    pub jump_distance_end: Option<f64>,

    #[serde(rename = "slope_fitted_classification_max (pN/nm)")]
    pub slope_max: Option<f64>,
    #[serde(rename = "slope_fitted_classification_release (pN/nm)")]
    pub slope_release: Option<f64>,
    #[serde(rename = "slope_fitted_classification_max_transition (pN/nm)")]
    pub slope_max_transition: Option<f64>,
    #[serde(rename = "slope_fitted_classification_return_endline (pN/nm)")]
    pub slope_return_endline: Option<f64>,
}

fn split(point: Option<&IndexedValue>) -> (Option<usize>, Option<f64>) {
    (point.map(|p| p.index), point.map(|p| p.value))
}

impl CurveRecord {
    pub fn from_curve(curve: &Curve) -> Self {
        let f = &curve.features;
        let title = TitleInfo::parse(&curve.title);
        let press = MotionSettings::of(curve.segment(Phase::Press));
        let pull = MotionSettings::of(curve.segment(Phase::Pull));
        let pause_time = curve
            .segment(Phase::Wait)
            .and_then(|s| s.header.duration())
            .unwrap_or(0.0);
        let setpoint = curve
            .segment(Phase::Press)
            .and_then(|s| s.header.setpoint())
            .or_else(|| curve.header.setpoint());

        let press_fit = f.press_fit.as_ref();
        let (slope, slope_error) = match (f.model, press_fit) {
            (FitModel::Linear, Some(fit)) => (Some(fit.slope.value), fit.slope.error),
            _ => (None, None),
        };

        let (contact_point_index, contact_point_value) = split(f.contact_point.as_ref());
        let (force_min_press_index, force_min_press_value) = split(f.force_min_press.as_ref());
        let (force_min_curve_index, force_min_curve_value) = split(f.force_min_curve.as_ref());
        let (time_min_curve_index, time_min_curve_value) = split(f.time_min_curve.as_ref());
        let (point_release_index, point_release_value) = split(f.point_release.as_ref());
        let (force_max_pull_index, force_max_pull_value) = split(f.force_max_pull.as_ref());
        let (force_max_curve_index, force_max_curve_value) = split(f.force_max_curve.as_ref());
        let (transition_point_index, transition_point_value) = split(f.transition_point.as_ref());
        let (point_return_endline_index, point_return_endline_value) =
            split(f.point_return_endline.as_ref());

        Self {
            file: curve.source.clone(),
            title: curve.title.clone(),
            automatic_category: f.automatic_category,
            category: f.resolved_category(),
            alignment: f.alignment.as_ref().map(|a| a.code()),
            alignment_axes: f
                .alignment
                .as_ref()
                .map(|a| a.axes().iter().map(ToString::to_string).collect::<Vec<_>>().join(","))
                .unwrap_or_default(),
            incomplete: f.incomplete,
            optical_state: f.optical_state,
            model: f.model,
            date: title.date,
            hour: title.hour,
            condition: f.condition.clone(),
            drug: f.drug.clone(),
            tolerance: f.tolerance,
            bead: title.bead,
            cell: title.cell,
            couple: title.couple,
            main_axis: f.main_axis.map(|a| a.to_string()),

            stiffness: f.stiffness.map(|k| k / 1e3),
            theoretical_contact_force: setpoint,
            press_distance: press.distance,
            press_speed: press.speed,
            press_frequency: press.frequency,
            pause_time,
            pull_distance: pull.distance,
            pull_speed: pull.speed,
            pull_frequency: pull.frequency,

            baseline_origin_press: f.baseline_origin_press,
            baseline_corrected_press: f.baseline_corrected_press,
            std_origin_press: f.std_origin_press,
            std_corrected_press: f.std_corrected_press,

            slope,
            slope_error,
            young: press_fit.and_then(|fit| fit.young_modulus),
            young_error: press_fit.and_then(|fit| fit.young_error),

            contact_point_index,
            contact_point_value,
            force_min_press_index,
            force_min_press_value,
            force_min_curve_index,
            force_min_curve_value,
            time_min_curve_index,
            time_min_curve_value,
            point_release_index,
            point_release_value,
            force_max_pull_index,
            force_max_pull_value,
            force_max_curve_index,
            force_max_curve_value,
            transition_point_index,
            transition_point_value,
            point_return_endline_index,
            point_return_endline_value,

            jump_force_start: f.jump.force_start,
            jump_force_end: f.jump.force_end,
            jump_nb_points_start: f.jump.nb_points_start,
            jump_nb_points_end: f.jump.nb_points_end,
            jump_time_start: f.jump.time_start,
            jump_time_end: f.jump.time_end,
            jump_distance_start: f.jump.distance_start,
            jump_distance_end: f.jump.distance_end,

            slope_max: f.classification_slopes.max,
            slope_release: f.classification_slopes.release,
            slope_max_transition: f.classification_slopes.max_transition,
            slope_return_endline: f.classification_slopes.return_endline,
        }
    }
}

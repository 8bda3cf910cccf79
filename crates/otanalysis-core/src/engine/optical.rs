//! Removal of the optical effect: a force drift recorded before contact that
//! comes from laser-path coupling rather than mechanics.
//!
//! The drift is estimated as a smoothed copy of the press up to contact and
//! subtracted from the press and, mirrored in time, from the pull after release.

use tracing::{info, warn};

use super::config::Windows;
use super::error::EngineError;
use crate::core::models::curve::Curve;
use crate::core::models::features::{IndexedValue, OpticalState, Sign};
use crate::core::models::segment::Segment;
use crate::core::numeric::fitting::linear_fit;
use crate::core::numeric::series::{head, mean, tail};
use crate::core::numeric::smoothing::savgol;

const PICONEWTON: f64 = 1e12;

#[derive(Debug, Clone, PartialEq)]
pub enum CorrectionOutcome {
    Applied { press_index: usize, pull_index: usize },
    Skipped(String),
}

/// First press sample at or after the point where the line fitted to the
/// last samples crosses the press baseline.
pub fn theoretical_contact(force: &[f64], time: &[f64], windows: &Windows) -> Result<usize, String> {
    let baseline = mean(head(force, windows.optical_baseline));
    let line = linear_fit(
        tail(time, windows.optical_press_fit),
        tail(force, windows.optical_press_fit),
    )
    .map_err(|e| format!("press line fit failed: {e}"))?;
    let crossing = line
        .crossing(baseline)
        .map_err(|e| format!("press line never crosses the baseline: {e}"))?;
    time.iter()
        .position(|t| *t >= crossing)
        .ok_or_else(|| "theoretical contact lies after the press".to_string())
}

/// Last pull sample at or before the point where the line fitted to the
/// samples from `start` on crosses the pull endline.
pub fn theoretical_release(
    force: &[f64],
    time: &[f64],
    start: usize,
    windows: &Windows,
) -> Result<usize, String> {
    let end = windows.optical_pull_fit.min(force.len());
    if start >= end {
        return Err(format!("pull fit window {start}..{end} is empty"));
    }
    let baseline = mean(tail(force, windows.optical_baseline));
    let line = linear_fit(&time[start..end], &force[start..end])
        .map_err(|e| format!("pull line fit failed: {e}"))?;
    let crossing = line
        .crossing(baseline)
        .map_err(|e| format!("pull line never crosses the endline: {e}"))?;
    time.iter()
        .rposition(|t| *t <= crossing)
        .ok_or_else(|| "theoretical release lies before the pull".to_string())
}

/// Main-axis force of `segment` as normalization left it, before any
/// optical correction.
fn normalized_force(curve: &Curve, segment: &Segment, windows: &Windows) -> Result<Vec<f64>, EngineError> {
    let main = curve
        .features
        .main_axis
        .ok_or(EngineError::MissingFeature("main_axis"))?;
    let baseline = curve.press().baseline(main.axis, false, windows.baseline);
    let sign = if main.sign == Sign::Plus { -1.0 } else { 1.0 };
    Ok(segment
        .raw
        .axis(main.axis)
        .iter()
        .map(|v| sign * (v - baseline) * PICONEWTON)
        .collect())
}

/// Subtracts `drift[k]` for `k` in `range` from the press, and from the pull
/// at the sample mirrored around `(press_pivot, pull_pivot)`.
fn subtract_drift(
    press: &mut [f64],
    pull: &mut [f64],
    drift: &[f64],
    range: std::ops::RangeInclusive<usize>,
    press_pivot: usize,
    pull_pivot: usize,
) {
    for k in range {
        press[k] -= drift[k];
        let Some(offset) = press_pivot.checked_sub(k) else {
            continue;
        };
        if let Some(value) = pull.get_mut(pull_pivot + offset) {
            *value -= drift[k];
        }
    }
}

/// Estimates the theoretical contact and release from line fits and removes
/// the drift up to contact.
///
/// Any failure leaves the curve untouched in the `No_correction` state.
pub fn correct_automatic(curve: &mut Curve, windows: &Windows) -> Result<CorrectionOutcome, EngineError> {
    let main = curve
        .features
        .main_axis
        .ok_or(EngineError::MissingFeature("main_axis"))?;

    let press_force = curve.press().corrected.axis(main.axis).to_vec();
    let press_time = curve.press().corrected.series_time.clone();
    let pull_force = curve.pull().corrected.axis(main.axis).to_vec();
    let pull_time = curve.pull().corrected.series_time.clone();

    let pull_start = match (curve.features.force_min_curve, curve.features.force_min_press) {
        (Some(curve_min), Some(press_min)) if curve_min.value > press_min.value => curve_min.index,
        _ => 0,
    };

    let pivots = theoretical_contact(&press_force, &press_time, windows).and_then(|press_index| {
        theoretical_release(&pull_force, &pull_time, pull_start, windows)
            .map(|pull_index| (press_index, pull_index))
    });
    let (press_index, pull_index) = match pivots {
        Ok(pivots) => pivots,
        Err(reason) => {
            warn!(curve = %curve.title, %reason, "Optical correction skipped");
            curve.note(format!("Optical correction skipped: {reason}"));
            curve.features.optical_state = OpticalState::NoCorrection;
            return Ok(CorrectionOutcome::Skipped(reason));
        }
    };

    curve.graphics.contact_theoretical_press =
        Some(IndexedValue::force(press_index, press_force[press_index]));
    curve.graphics.contact_theoretical_pull =
        Some(IndexedValue::force(pull_index, pull_force[pull_index]));

    let drift = savgol(
        &press_force,
        windows.optical_smooth_window,
        windows.optical_smooth_order,
    );
    let mut press = press_force;
    let mut pull = pull_force;
    subtract_drift(&mut press, &mut pull, &drift, 0..=press_index, press_index, pull_index);

    *curve.press_mut().corrected.axis_mut(main.axis) = press;
    *curve.pull_mut().corrected.axis_mut(main.axis) = pull;
    curve.features.optical_state = OpticalState::AutoCorrection;
    info!(curve = %curve.title, press_index, pull_index, "Optical effect corrected");
    Ok(CorrectionOutcome::Applied {
        press_index,
        pull_index,
    })
}

/// A user-bounded correction staged on a curve until accepted.
///
/// Dropping the session without [`accept`](Self::accept) leaves the curve as
/// it was.
pub struct ManualCorrection<'c> {
    curve: &'c mut Curve,
    press: Vec<f64>,
    pull: Vec<f64>,
    start: usize,
    end: usize,
}

impl<'c> ManualCorrection<'c> {
    /// Stages a correction of press samples `start..=end`, starting again from
    /// the uncorrected force.
    pub fn propose(
        curve: &'c mut Curve,
        start: usize,
        end: usize,
        windows: &Windows,
    ) -> Result<Self, EngineError> {
        let press_force = normalized_force(curve, curve.press(), windows)?;
        let mut pull = normalized_force(curve, curve.pull(), windows)?;
        if start > end || end >= press_force.len() {
            return Err(EngineError::InvalidRange {
                start,
                end,
                len: press_force.len(),
            });
        }

        let press_pivot = curve
            .graphics
            .contact_theoretical_press
            .or(curve.features.contact_point)
            .map_or(end, |p| p.index);
        let pull_pivot = curve
            .graphics
            .contact_theoretical_pull
            .or(curve.features.point_release)
            .map_or(0, |p| p.index);

        let drift = savgol(
            &press_force,
            windows.optical_smooth_window,
            windows.optical_smooth_order,
        );
        let mut press = press_force;
        subtract_drift(&mut press, &mut pull, &drift, start..=end, press_pivot, pull_pivot);

        Ok(Self {
            curve,
            press,
            pull,
            start,
            end,
        })
    }

    pub fn range(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    /// Staged press and pull force.
    pub fn preview(&self) -> (&[f64], &[f64]) {
        (&self.press, &self.pull)
    }

    /// Writes the staged series into the curve.
    pub fn accept(self) -> Result<(), EngineError> {
        let main = self
            .curve
            .features
            .main_axis
            .ok_or(EngineError::MissingFeature("main_axis"))?;
        *self.curve.press_mut().corrected.axis_mut(main.axis) = self.press;
        *self.curve.pull_mut().corrected.axis_mut(main.axis) = self.pull;
        self.curve.features.optical_state = OpticalState::ManualCorrection;
        self.curve.note(format!(
            "Manual optical correction over {}..={}",
            self.start, self.end
        ));
        Ok(())
    }

    /// Discards the staged series.
    pub fn cancel(self) {}
}

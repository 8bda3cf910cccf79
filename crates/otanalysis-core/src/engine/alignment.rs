use tracing::info;

use super::config::AnalysisConfig;
use super::error::EngineError;
use crate::core::models::curve::Curve;
use crate::core::models::features::Alignment;

const PICONEWTON: f64 = 1e12;

/// Largest off-axis excursion (pN) tolerated before a curve is misaligned.
pub fn alignment_threshold(curve: &Curve, threshold_align: f64) -> f64 {
    let min_curve = curve
        .features
        .force_min_curve
        .map(|f| f.value.abs())
        .unwrap_or(0.0);
    let setpoint = curve
        .press()
        .header
        .setpoint()
        .or_else(|| curve.header.setpoint())
        .unwrap_or(0.0);
    let from_minimum = min_curve * threshold_align / 100.0;
    let from_setpoint = threshold_align * setpoint / 100.0 * PICONEWTON;
    from_minimum.max(from_setpoint)
}

/// Checks every segment's lateral and `z` deflection against the threshold.
///
/// Offending axes of all segments are merged in order of discovery.
pub fn check_alignment(curve: &mut Curve, config: &AnalysisConfig) -> Result<Alignment, EngineError> {
    let main = curve
        .features
        .main_axis
        .ok_or(EngineError::MissingFeature("main_axis"))?;
    let threshold = alignment_threshold(curve, config.threshold_align);

    let mut offending = Vec::new();
    for segment in curve.segments() {
        if let Alignment::Misaligned(axes) =
            segment.check_alignment(main.axis, threshold, config.windows.baseline)
        {
            for axis in axes {
                if !offending.contains(&axis) {
                    offending.push(axis);
                }
            }
        }
    }

    let alignment = if offending.is_empty() {
        Alignment::Aligned
    } else {
        let axes: Vec<String> = offending.iter().map(ToString::to_string).collect();
        info!(curve = %curve.title, axes = ?axes, threshold, "Curve misaligned");
        curve.note(format!("Misaligned on {}", axes.join(", ")));
        Alignment::Misaligned(offending)
    };

    curve.graphics.threshold_alignment = Some(threshold);
    curve.features.alignment = Some(alignment.clone());
    Ok(alignment)
}

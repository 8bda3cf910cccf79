use crate::core::io::error::LoadError;
use crate::core::models::curve::Curve;
use crate::core::models::features::Category;
use crate::engine::config::{AnalysisConfig, OpticalMode};
use crate::engine::error::EngineError;
use crate::engine::optical::CorrectionOutcome;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::{alignment, classifier, detection, normalizer, optical};
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};

use super::load::load_curve;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Normalizes the curve and computes everything the fits depend on.
///
/// An incomplete pull is marked on the curve before the error is returned.
#[instrument(skip_all, name = "prepare_curve", fields(curve = %curve.title))]
pub fn prepare(curve: &mut Curve, config: &AnalysisConfig) -> Result<(), EngineError> {
    normalizer::normalize(curve, &config.windows)?;
    if let Err(e) = normalizer::check_truncation(curve, config.pulling_length) {
        curve.features.incomplete = true;
        curve.note(e.to_string());
        return Err(e.into());
    }
    normalizer::compute_statistics(curve, &config.windows)?;
    normalizer::detect_extremes(curve)?;
    alignment::check_alignment(curve, config)?;
    Ok(())
}

/// Runs the automatic pipeline on a freshly decoded curve.
#[instrument(skip_all, name = "analysis_workflow", fields(curve = %curve.title))]
pub fn run(
    curve: &mut Curve,
    config: &AnalysisConfig,
    reporter: &ProgressReporter,
) -> Result<Category, EngineError> {
    // === Phase 0: Normalization ===
    reporter.report(Progress::PhaseStart {
        name: "Normalization",
    });
    prepare(curve, config)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Optical effect (optional) ===
    if config.optical == OpticalMode::Correction {
        reporter.report(Progress::PhaseStart {
            name: "Optical Correction",
        });
        if let CorrectionOutcome::Skipped(reason) = optical::correct_automatic(curve, &config.windows)? {
            reporter.message(format!("{}: optical correction skipped ({reason})", curve.title));
        }
        reporter.report(Progress::PhaseFinish);
    }

    fit_and_classify(curve, config, reporter, false)
}

/// Re-runs the fits and classification after a user correction; the result
/// becomes the curve's user-facing category.
#[instrument(skip_all, name = "reanalysis_workflow", fields(curve = %curve.title))]
pub fn reanalyze(
    curve: &mut Curve,
    config: &AnalysisConfig,
    reporter: &ProgressReporter,
) -> Result<Category, EngineError> {
    fit_and_classify(curve, config, reporter, true)
}

fn fit_and_classify(
    curve: &mut Curve,
    config: &AnalysisConfig,
    reporter: &ProgressReporter,
    manual: bool,
) -> Result<Category, EngineError> {
    // === Phase 2: Contact, release and model fits ===
    reporter.report(Progress::PhaseStart { name: "Fitting" });
    detection::fit_press(curve, config)?;
    detection::fit_pull(curve, config)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Classification ===
    reporter.report(Progress::PhaseStart {
        name: "Classification",
    });
    let category = classifier::classify(curve, config, manual)?;
    reporter.report(Progress::PhaseFinish);

    info!(
        category = %category,
        optical = %curve.features.optical_state,
        "Analysis complete."
    );
    Ok(category)
}

/// Loads and analyzes one file.
pub fn analyze_file(
    path: &Path,
    config: &AnalysisConfig,
    reporter: &ProgressReporter,
) -> Result<Curve, AnalysisError> {
    let mut curve = load_curve(path)?;
    run(&mut curve, config, reporter)?;
    Ok(curve)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::io::error::IncompleteError;
    use crate::core::io::text::parse_text_curve;
    use crate::core::models::features::OpticalState;
    use crate::engine::config::AnalysisConfigBuilder;
    use crate::engine::optical::ManualCorrection;
    use std::sync::Mutex;

    const STEP: f64 = 0.001;
    const PN: f64 = 1e-12;

    fn noise(i: usize) -> f64 {
        if i % 2 == 0 { PN } else { -PN }
    }

    pub(crate) fn press() -> Vec<f64> {
        (0..1800)
            .map(|i| if i <= 1500 { noise(i) } else { -10.0 * PN * (i - 1500) as f64 })
            .collect()
    }

    pub(crate) fn pull(tail: impl Fn(usize) -> f64) -> Vec<f64> {
        (0..1800)
            .map(|i| if i < 300 { -10.0 * PN * (300 - i) as f64 } else { tail(i) })
            .collect()
    }

    pub(crate) fn flat_pull() -> Vec<f64> {
        pull(noise)
    }

    fn block(index: usize, style: &str, values: &[f64], t0: f64) -> String {
        let duration = (values.len() - 1) as f64 * STEP;
        let mut s = format!(
            "# segmentIndex: {index}\n\
             # segment-settings.style: {style}\n\
             # segment-settings.num-points: {n}\n\
             # segment-settings.duration: {duration}\n\
             # segment-settings.length: 5.0E-6\n\
             # segment-settings.setpoint.value: 2.0E-11\n\
             #\n\
             # units: s s N N N\n\
             # columns: time seriesTime xSignal1 ySignal1 zSignal1\n\
             #\n",
            n = values.len()
        );
        for (i, v) in values.iter().enumerate() {
            let t = i as f64 * STEP;
            s += &format!("{t} {} {v} 0 0\n", t0 + t);
        }
        s
    }

    /// A three-segment text export with `-x` as main axis.
    pub(crate) fn text_curve(press: &[f64], pull: &[f64], segments: usize) -> String {
        let mut s = String::from(
            "# settings.segments.size: 3\n\
             # settings.segment.0.style: motion\n\
             # settings.segment.1.style: pause\n\
             # settings.segment.1.duration: 0.1\n\
             # settings.segment.2.style: motion\n\
             # settings.segment.0.direction.phi: 3.141592653589793\n\
             # settings.segment.0.xy-scanner.scanner: sample-scanner\n\
             # settings.segment.0.setpoint.value: 2.0E-11\n\
             #\n\
             # xSignal1_sensitivity: 1.0E-7 m/V\n\
             # xSignal1_stiffness: 1.0E-4 N/m\n\
             #\n",
        );
        let t_wait = press.len() as f64 * STEP;
        let t_pull = t_wait + 0.1 + STEP;
        let blocks = [
            block(0, "motion", press, 0.0),
            block(1, "pause", &[0.0; 101], t_wait),
            block(2, "motion", pull, t_pull),
        ];
        s += &blocks[..segments].join("\n");
        s
    }

    fn config() -> AnalysisConfig {
        AnalysisConfigBuilder::with_defaults()
            .width_window_smooth(5)
            .build()
            .unwrap()
    }

    fn analyzed(press: &[f64], pull: &[f64], config: &AnalysisConfig) -> (Curve, Category) {
        let mut curve = parse_text_curve(&text_curve(press, pull, 3), "memory", "b1c1-2021.01.01-10.00.00.000").unwrap();
        let category = run(&mut curve, config, &ProgressReporter::new()).unwrap();
        (curve, category)
    }

    #[test]
    fn flat_curve_is_no_adhesion_end_to_end() {
        let (curve, category) = analyzed(&press(), &flat_pull(), &config());
        assert_eq!(category, Category::Nad);
        assert_eq!(curve.features.resolved_category(), Some(Category::Nad));
        assert!(curve.features.alignment.as_ref().unwrap().is_aligned());
        let contact = curve.features.contact_point.unwrap().index;
        assert!(contact.abs_diff(1500) <= 2);
    }

    #[test]
    fn rising_pull_is_infinite_tube_end_to_end() {
        let pull = pull(|i| 0.05 * PN * (i as f64 - 300.0));
        let (curve, category) = analyzed(&press(), &pull, &config());
        assert_eq!(category, Category::Itu);
        assert_eq!(curve.features.transition_point.unwrap().index, 1799);
    }

    #[test]
    fn repeated_runs_agree() {
        let pull = pull(|i| {
            let offset = i.abs_diff(500);
            if offset < 40 { 30.0 * PN * (1.0 - offset as f64 / 40.0) } else { noise(i) }
        });
        let (a, category_a) = analyzed(&press(), &pull, &config());
        let (b, category_b) = analyzed(&press(), &pull, &config());
        assert_eq!(category_a, category_b);
        assert_eq!(a.features, b.features);
    }

    #[test]
    fn truncated_text_never_reaches_the_classifier() {
        let content = text_curve(&press(), &flat_pull(), 2);
        let err = parse_text_curve(&content, "memory", "b1c1-x").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Incomplete(IncompleteError::Segments { declared: 3, actual: 2 })
        ));
    }

    #[test]
    fn short_pull_is_marked_incomplete() {
        let content = text_curve(&press(), &flat_pull(), 3).replace(
            "# segmentIndex: 2\n# segment-settings.style: motion\n# segment-settings.num-points: 1800\n",
            "# segmentIndex: 2\n# segment-settings.style: motion\n# segment-settings.num-points: 9000\n",
        );
        assert!(content.contains("num-points: 9000"));
        let mut curve = parse_text_curve(&content, "memory", "b1c1-x").unwrap();
        let err = run(&mut curve, &config(), &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::Incomplete(_)));
        assert!(curve.features.incomplete);
        assert_eq!(curve.features.automatic_category, None);
    }

    #[test]
    fn optical_correction_runs_when_enabled() {
        let mut config = config();
        config.optical = OpticalMode::Correction;
        let (curve, _) = analyzed(&press(), &flat_pull(), &config);
        assert_eq!(curve.features.optical_state, OpticalState::AutoCorrection);
        assert!(curve.graphics.contact_theoretical_press.is_some());
    }

    #[test]
    fn manual_correction_then_reanalysis_sets_user_category() {
        let config = config();
        let (mut curve, automatic) = analyzed(&press(), &flat_pull(), &config);
        ManualCorrection::propose(&mut curve, 100, 400, &config.windows)
            .unwrap()
            .accept()
            .unwrap();
        let manual = reanalyze(&mut curve, &config, &ProgressReporter::new()).unwrap();

        assert_eq!(curve.features.automatic_category, Some(automatic));
        assert_eq!(curve.features.category, Some(manual));
        assert_eq!(curve.features.optical_state, OpticalState::ManualCorrection);
    }

    #[test]
    fn phases_are_reported_in_order() {
        let names = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                names.lock().unwrap().push(name);
            }
        }));
        let mut curve = parse_text_curve(&text_curve(&press(), &flat_pull(), 3), "memory", "b1c1-x").unwrap();
        run(&mut curve, &config(), &reporter).unwrap();
        drop(reporter);
        assert_eq!(
            names.into_inner().unwrap(),
            vec!["Normalization", "Fitting", "Classification"]
        );
    }

    #[test]
    fn analyze_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b1c1-2021.01.01-10.00.00.000.txt");
        std::fs::write(&path, text_curve(&press(), &flat_pull(), 3)).unwrap();

        let curve = analyze_file(&path, &config(), &ProgressReporter::new()).unwrap();
        assert_eq!(curve.title, "b1c1-2021.01.01-10.00.00.000");
        assert_eq!(curve.features.automatic_category, Some(Category::Nad));
    }
}

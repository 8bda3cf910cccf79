use super::defaults::DefaultsConfig;
use super::file::{FileAnalysisConfig, FileConfig, FileModel, FileOpticalMode, FileWindowsConfig};
use super::models::AppConfig;
use crate::cli::AnalyzeArgs;
use crate::error::{CliError, Result};
use otanalysis::engine::config::{self as core_config, OpticalMode, Windows};
use std::str::FromStr;

pub fn build_config(args: &AnalyzeArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;
    let analysis = file_config.analysis.take().unwrap_or_default();
    let base = &defaults.analysis;

    let optical = if args.optical_correction {
        OpticalMode::Correction
    } else {
        analysis.optical.map(Into::into).unwrap_or(base.optical)
    };

    let mut builder = core_config::AnalysisConfigBuilder::new()
        .threshold_align(
            args.threshold_align
                .or(analysis.threshold_align)
                .unwrap_or(base.threshold_align),
        )
        .pulling_length(
            args.pulling_length
                .or(analysis.pulling_length)
                .unwrap_or(base.pulling_length),
        )
        .model(
            args.model
                .map(Into::into)
                .or(analysis.model.map(Into::into))
                .unwrap_or(base.model),
        )
        .eta(args.eta.or(analysis.eta).unwrap_or(base.eta))
        .bead_radius(args.bead_radius.or(analysis.bead_radius).unwrap_or(base.bead_radius))
        .factor_noise(
            args.factor_noise
                .or(analysis.factor_noise)
                .unwrap_or(base.factor_noise),
        )
        .jump_force(args.jump_force.or(analysis.jump_force).unwrap_or(base.jump_force))
        .jump_point(args.jump_point.or(analysis.jump_point).unwrap_or(base.jump_point))
        .jump_distance(
            args.jump_distance
                .or(analysis.jump_distance)
                .unwrap_or(base.jump_distance),
        )
        .width_window_smooth(
            args.width_window_smooth
                .or(analysis.width_window_smooth)
                .unwrap_or(base.width_window_smooth),
        )
        .optical(optical)
        .windows(merge_windows(file_config.windows.take(), base.windows));

    if let Some(drug) = args.drug.clone().or(analysis.drug) {
        builder = builder.drug(drug);
    }
    if let Some(condition) = args.condition.clone().or(analysis.condition) {
        builder = builder.condition(condition);
    }

    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        input_path: args.input.clone(),
        results_path: args.output.join(&defaults.results_file),
        rejected_dir: (!args.no_routing).then(|| args.output.join(&defaults.rejected_dir)),
        core_config,
    })
}

fn merge_windows(file_val: Option<FileWindowsConfig>, defaults: Windows) -> Windows {
    let f = file_val.unwrap_or_default();
    Windows {
        baseline: f.baseline.unwrap_or(defaults.baseline),
        std: f.std.unwrap_or(defaults.std),
        optical_baseline: f.optical_baseline.unwrap_or(defaults.optical_baseline),
        optical_press_fit: f.optical_press_fit.unwrap_or(defaults.optical_press_fit),
        optical_pull_fit: f.optical_pull_fit.unwrap_or(defaults.optical_pull_fit),
        optical_smooth_window: f
            .optical_smooth_window
            .unwrap_or(defaults.optical_smooth_window),
        optical_smooth_order: f
            .optical_smooth_order
            .unwrap_or(defaults.optical_smooth_order),
        itu_transition_fit: f.itu_transition_fit.unwrap_or(defaults.itu_transition_fit),
        classification_divisor: f
            .classification_divisor
            .unwrap_or(defaults.classification_divisor),
        smooth_order: f.smooth_order.unwrap_or(defaults.smooth_order),
        derivative: f.derivative.unwrap_or(defaults.derivative),
        angle_tolerance: f.angle_tolerance.unwrap_or(defaults.angle_tolerance),
        indentation_depth: f.indentation_depth.unwrap_or(defaults.indentation_depth),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn parse_model(key: &str, value: &str) -> Result<FileModel> {
    match value.trim() {
        "linear" => Ok(FileModel::Linear),
        "sphere" => Ok(FileModel::Sphere),
        _ => Err(CliError::Config(format!(
            "Invalid model for {}: {} (expected 'linear' or 'sphere')",
            key, value
        ))),
    }
}

fn parse_optical(key: &str, value: &str) -> Result<FileOpticalMode> {
    match value.trim() {
        "none" => Ok(FileOpticalMode::None),
        "correction" => Ok(FileOpticalMode::Correction),
        _ => Err(CliError::Config(format!(
            "Invalid optical mode for {}: {} (expected 'none' or 'correction')",
            key, value
        ))),
    }
}

fn set_analysis(a: &mut FileAnalysisConfig, key: &str, field: &str, value: &str) -> Result<()> {
    match field {
        "threshold-align" => a.threshold_align = Some(parse_value(key, value, "float")?),
        "pulling-length" => a.pulling_length = Some(parse_value(key, value, "float")?),
        "model" => a.model = Some(parse_model(key, value)?),
        "eta" => a.eta = Some(parse_value(key, value, "float")?),
        "bead-radius" => a.bead_radius = Some(parse_value(key, value, "float")?),
        "factor-noise" => a.factor_noise = Some(parse_value(key, value, "float")?),
        "jump-force" => a.jump_force = Some(parse_value(key, value, "float")?),
        "jump-point" => a.jump_point = Some(parse_value(key, value, "integer")?),
        "jump-distance" => a.jump_distance = Some(parse_value(key, value, "float")?),
        "width-window-smooth" => {
            a.width_window_smooth = Some(parse_value(key, value, "integer")?)
        }
        "optical" => a.optical = Some(parse_optical(key, value)?),
        "drug" => a.drug = Some(value.to_string()),
        "condition" => a.condition = Some(value.to_string()),
        _ => return Err(unsupported(key)),
    }
    Ok(())
}

fn set_windows(w: &mut FileWindowsConfig, key: &str, field: &str, value: &str) -> Result<()> {
    let int = || parse_value::<usize>(key, value, "integer");
    match field {
        "baseline" => w.baseline = Some(int()?),
        "std" => w.std = Some(int()?),
        "optical-baseline" => w.optical_baseline = Some(int()?),
        "optical-press-fit" => w.optical_press_fit = Some(int()?),
        "optical-pull-fit" => w.optical_pull_fit = Some(int()?),
        "optical-smooth-window" => w.optical_smooth_window = Some(int()?),
        "optical-smooth-order" => w.optical_smooth_order = Some(int()?),
        "itu-transition-fit" => w.itu_transition_fit = Some(int()?),
        "classification-divisor" => {
            w.classification_divisor = Some(parse_value(key, value, "integer")?)
        }
        "smooth-order" => w.smooth_order = Some(int()?),
        "derivative" => w.derivative = Some(int()?),
        "angle-tolerance" => w.angle_tolerance = Some(parse_value(key, value, "float")?),
        "indentation-depth" => w.indentation_depth = Some(parse_value(key, value, "float")?),
        _ => return Err(unsupported(key)),
    }
    Ok(())
}

fn unsupported(key: &str) -> CliError {
    CliError::Config(format!("Unsupported configuration key for --set: '{}'", key))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();
        match key.split_once('.') {
            Some(("analysis", field)) => set_analysis(
                config.analysis.get_or_insert_with(Default::default),
                key,
                field,
                value,
            )?,
            Some(("windows", field)) => set_windows(
                config.windows.get_or_insert_with(Default::default),
                key,
                field,
                value,
            )?,
            _ => return Err(unsupported(key)),
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use otanalysis::core::models::features::FitModel;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn parse_args(extra: &[&str]) -> AnalyzeArgs {
        let mut args = vec!["otanalysis", "analyze", "-i", "curves", "-o", "out"];
        args.extend_from_slice(extra);
        let Commands::Analyze(args) = Cli::parse_from(args).command;
        args
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("otanalysis.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let app = build_config(&parse_args(&[])).expect("build ok");
        assert_eq!(app.core_config, core_config::AnalysisConfig::default());
        assert_eq!(app.results_path, PathBuf::from("out/otanalysis_results.tsv"));
        assert_eq!(app.rejected_dir, Some(PathBuf::from("out/File_rejected")));
    }

    #[test]
    fn file_values_fill_analysis_and_windows() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [analysis]
            jump-force = 8.0
            model = "sphere"
            optical = "correction"
            condition = "37C"

            [windows]
            baseline = 500
            "#,
        );
        let app = build_config(&parse_args(&["-c", path.to_str().unwrap()])).expect("build ok");
        let cfg = app.core_config;
        assert_eq!(cfg.jump_force, 8.0);
        assert_eq!(cfg.model, FitModel::Sphere);
        assert_eq!(cfg.optical, OpticalMode::Correction);
        assert_eq!(cfg.condition.as_deref(), Some("37C"));
        assert_eq!(cfg.windows.baseline, 500);
        assert_eq!(cfg.windows.std, Windows::default().std);
        assert_eq!(cfg.jump_point, 200);
    }

    #[test]
    fn precedence_is_cli_then_set_then_file() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[analysis]\njump-force = 8.0\njump-point = 50\neta = 0.2\n",
        );
        let args = parse_args(&[
            "-c",
            path.to_str().unwrap(),
            "--jump-force",
            "12",
            "-S",
            "analysis.jump-force=10",
            "-S",
            "analysis.jump-point=75",
        ]);
        let cfg = build_config(&args).expect("build ok").core_config;
        assert_eq!(cfg.jump_force, 12.0);
        assert_eq!(cfg.jump_point, 75);
        assert_eq!(cfg.eta, 0.2);
    }

    #[test]
    fn set_values_reach_windows() {
        let args = parse_args(&["-S", "windows.angle-tolerance=0.05", "-S", "windows.std=300"]);
        let cfg = build_config(&args).expect("build ok").core_config;
        assert!((cfg.windows.angle_tolerance - 0.05).abs() < 1e-12);
        assert_eq!(cfg.windows.std, 300);
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        for bad in ["analysis.eta", "analysis.colour=red", "plot.width=3", "analysis.jump-point=x"] {
            let result = build_config(&parse_args(&["-S", bad]));
            assert!(matches!(result, Err(CliError::Config(_))), "{bad} should fail");
        }
    }

    #[test]
    fn invalid_parameters_surface_core_validation() {
        let result = build_config(&parse_args(&["--eta", "1.5"]));
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("eta")));
    }

    #[test]
    fn routing_can_be_disabled() {
        let app = build_config(&parse_args(&["--no-routing", "--optical-correction"])).unwrap();
        assert_eq!(app.rejected_dir, None);
        assert_eq!(app.core_config.optical, OpticalMode::Correction);
    }
}

use crate::error::{CliError, Result};
use otanalysis::core::models::features::FitModel;
use otanalysis::engine::config::OpticalMode;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileModel {
    Linear,
    Sphere,
}

impl From<FileModel> for FitModel {
    fn from(m: FileModel) -> Self {
        match m {
            FileModel::Linear => FitModel::Linear,
            FileModel::Sphere => FitModel::Sphere,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileOpticalMode {
    None,
    Correction,
}

impl From<FileOpticalMode> for OpticalMode {
    fn from(m: FileOpticalMode) -> Self {
        match m {
            FileOpticalMode::None => OpticalMode::None,
            FileOpticalMode::Correction => OpticalMode::Correction,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileAnalysisConfig {
    pub threshold_align: Option<f64>,
    pub pulling_length: Option<f64>,
    pub model: Option<FileModel>,
    pub eta: Option<f64>,
    pub bead_radius: Option<f64>,
    pub factor_noise: Option<f64>,
    pub jump_force: Option<f64>,
    pub jump_point: Option<i64>,
    pub jump_distance: Option<f64>,
    pub width_window_smooth: Option<usize>,
    pub optical: Option<FileOpticalMode>,
    pub drug: Option<String>,
    pub condition: Option<String>,
}

/// Overrides for the empirical window sizes; absent keys keep their defaults.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileWindowsConfig {
    pub baseline: Option<usize>,
    pub std: Option<usize>,
    pub optical_baseline: Option<usize>,
    pub optical_press_fit: Option<usize>,
    pub optical_pull_fit: Option<usize>,
    pub optical_smooth_window: Option<usize>,
    pub optical_smooth_order: Option<usize>,
    pub itu_transition_fit: Option<usize>,
    pub classification_divisor: Option<i64>,
    pub smooth_order: Option<usize>,
    pub derivative: Option<usize>,
    pub angle_tolerance: Option<f64>,
    pub indentation_depth: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub analysis: Option<FileAnalysisConfig>,
    pub windows: Option<FileWindowsConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Reading configuration file");
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

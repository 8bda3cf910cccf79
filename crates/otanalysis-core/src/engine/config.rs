use crate::core::models::features::FitModel;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Whether the automatic optical-effect correction runs before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpticalMode {
    #[default]
    None,
    Correction,
}

/// Empirically tuned window sizes and tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Windows {
    /// Samples averaged for a baseline (head of press, tail of pull).
    pub baseline: usize,
    /// Samples used for the baseline standard deviation.
    pub std: usize,
    pub optical_baseline: usize,
    pub optical_press_fit: usize,
    pub optical_pull_fit: usize,
    pub optical_smooth_window: usize,
    pub optical_smooth_order: usize,
    pub itu_transition_fit: usize,
    /// Jump point counts are divided by this to size the classification fits.
    pub classification_divisor: i64,
    pub smooth_order: usize,
    pub derivative: usize,
    /// Radians around each canonical scan direction.
    pub angle_tolerance: f64,
    /// Indentation depth used in the Young modulus estimate.
    pub indentation_depth: f64,
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            baseline: 1000,
            std: 200,
            optical_baseline: 3000,
            optical_press_fit: 600,
            optical_pull_fit: 500,
            optical_smooth_window: 51,
            optical_smooth_order: 3,
            itu_transition_fit: 2000,
            classification_divisor: 3,
            smooth_order: 2,
            derivative: 4,
            angle_tolerance: 0.01,
            indentation_depth: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Percent of the press minimum (or setpoint) tolerated on off-axes.
    pub threshold_align: f64,
    /// Percent of the declared pull points a curve must carry.
    pub pulling_length: f64,
    pub model: FitModel,
    /// Poisson ratio.
    pub eta: f64,
    /// Bead radius (µm).
    pub bead_radius: f64,
    /// Multiple of the press standard deviation that counts as noise.
    pub factor_noise: f64,
    /// pN
    pub jump_force: f64,
    pub jump_point: i64,
    /// nm
    pub jump_distance: f64,
    pub width_window_smooth: usize,
    pub optical: OpticalMode,
    pub drug: Option<String>,
    pub condition: Option<String>,
    pub windows: Windows,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold_align: 30.0,
            pulling_length: 50.0,
            model: FitModel::Linear,
            eta: 0.5,
            bead_radius: 1.0,
            factor_noise: 5.0,
            jump_force: 5.0,
            jump_point: 200,
            jump_distance: 200.0,
            width_window_smooth: 151,
            optical: OpticalMode::None,
            drug: None,
            condition: None,
            windows: Windows::default(),
        }
    }
}

#[derive(Default)]
pub struct AnalysisConfigBuilder {
    threshold_align: Option<f64>,
    pulling_length: Option<f64>,
    model: Option<FitModel>,
    eta: Option<f64>,
    bead_radius: Option<f64>,
    factor_noise: Option<f64>,
    jump_force: Option<f64>,
    jump_point: Option<i64>,
    jump_distance: Option<f64>,
    width_window_smooth: Option<usize>,
    optical: Option<OpticalMode>,
    drug: Option<String>,
    condition: Option<String>,
    windows: Option<Windows>,
}

impl From<AnalysisConfig> for AnalysisConfigBuilder {
    fn from(config: AnalysisConfig) -> Self {
        Self {
            threshold_align: Some(config.threshold_align),
            pulling_length: Some(config.pulling_length),
            model: Some(config.model),
            eta: Some(config.eta),
            bead_radius: Some(config.bead_radius),
            factor_noise: Some(config.factor_noise),
            jump_force: Some(config.jump_force),
            jump_point: Some(config.jump_point),
            jump_distance: Some(config.jump_distance),
            width_window_smooth: Some(config.width_window_smooth),
            optical: Some(config.optical),
            drug: config.drug,
            condition: config.condition,
            windows: Some(config.windows),
        }
    }
}

impl AnalysisConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the documented defaults.
    pub fn with_defaults() -> Self {
        AnalysisConfig::default().into()
    }

    pub fn threshold_align(mut self, percent: f64) -> Self {
        self.threshold_align = Some(percent);
        self
    }
    pub fn pulling_length(mut self, percent: f64) -> Self {
        self.pulling_length = Some(percent);
        self
    }
    pub fn model(mut self, model: FitModel) -> Self {
        self.model = Some(model);
        self
    }
    pub fn eta(mut self, eta: f64) -> Self {
        self.eta = Some(eta);
        self
    }
    pub fn bead_radius(mut self, radius: f64) -> Self {
        self.bead_radius = Some(radius);
        self
    }
    pub fn factor_noise(mut self, factor: f64) -> Self {
        self.factor_noise = Some(factor);
        self
    }
    pub fn jump_force(mut self, force: f64) -> Self {
        self.jump_force = Some(force);
        self
    }
    pub fn jump_point(mut self, points: i64) -> Self {
        self.jump_point = Some(points);
        self
    }
    pub fn jump_distance(mut self, distance: f64) -> Self {
        self.jump_distance = Some(distance);
        self
    }
    pub fn width_window_smooth(mut self, width: usize) -> Self {
        self.width_window_smooth = Some(width);
        self
    }
    pub fn optical(mut self, mode: OpticalMode) -> Self {
        self.optical = Some(mode);
        self
    }
    pub fn drug(mut self, drug: impl Into<String>) -> Self {
        self.drug = Some(drug.into());
        self
    }
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
    pub fn windows(mut self, windows: Windows) -> Self {
        self.windows = Some(windows);
        self
    }

    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let config = AnalysisConfig {
            threshold_align: self
                .threshold_align
                .ok_or(ConfigError::MissingParameter("threshold_align"))?,
            pulling_length: self
                .pulling_length
                .ok_or(ConfigError::MissingParameter("pulling_length"))?,
            model: self.model.ok_or(ConfigError::MissingParameter("model"))?,
            eta: self.eta.ok_or(ConfigError::MissingParameter("eta"))?,
            bead_radius: self
                .bead_radius
                .ok_or(ConfigError::MissingParameter("bead_radius"))?,
            factor_noise: self
                .factor_noise
                .ok_or(ConfigError::MissingParameter("factor_noise"))?,
            jump_force: self
                .jump_force
                .ok_or(ConfigError::MissingParameter("jump_force"))?,
            jump_point: self
                .jump_point
                .ok_or(ConfigError::MissingParameter("jump_point"))?,
            jump_distance: self
                .jump_distance
                .ok_or(ConfigError::MissingParameter("jump_distance"))?,
            width_window_smooth: self
                .width_window_smooth
                .ok_or(ConfigError::MissingParameter("width_window_smooth"))?,
            optical: self.optical.unwrap_or_default(),
            drug: self.drug,
            condition: self.condition,
            windows: self.windows.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

impl AnalysisConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &'static str, reason: &str| {
            Err(ConfigError::InvalidValue {
                name,
                reason: reason.to_string(),
            })
        };

        for (name, value) in [
            ("threshold_align", self.threshold_align),
            ("pulling_length", self.pulling_length),
        ] {
            if !(value > 0.0 && value <= 100.0) {
                return invalid(name, "must be a percentage in (0, 100]");
            }
        }
        if !(0.0..1.0).contains(&self.eta) {
            return invalid("eta", "Poisson ratio must lie in [0, 1)");
        }
        if !(self.bead_radius > 0.0) {
            return invalid("bead_radius", "must be positive");
        }
        if !(self.factor_noise > 0.0) {
            return invalid("factor_noise", "must be positive");
        }
        if !(self.jump_force >= 0.0) {
            return invalid("jump_force", "must not be negative");
        }
        if self.jump_point < 0 {
            return invalid("jump_point", "must not be negative");
        }
        if !(self.jump_distance >= 0.0) {
            return invalid("jump_distance", "must not be negative");
        }
        if self.width_window_smooth < 3 {
            return invalid("width_window_smooth", "needs at least 3 samples");
        }
        if self.windows.classification_divisor <= 0 {
            return invalid("windows.classification_divisor", "must be positive");
        }
        Ok(())
    }
}

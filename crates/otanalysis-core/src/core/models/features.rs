use super::channel::Axis;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    Newton,
    Piconewton,
    Second,
    Nanometer,
    Points,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Newton => "N",
            Unit::Piconewton => "pN",
            Unit::Second => "s",
            Unit::Nanometer => "nm",
            Unit::Points => "pts",
        }
    }
}

/// A measured value tied to a sample index of its segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexedValue {
    pub index: usize,
    pub value: f64,
    pub unit: Unit,
}

impl IndexedValue {
    pub fn new(index: usize, value: f64, unit: Unit) -> Self {
        Self { index, value, unit }
    }

    pub fn force(index: usize, value: f64) -> Self {
        Self::new(index, value, Unit::Piconewton)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Sign {
    Plus,
    Minus,
}

/// An axis with its direction, displayed as `+x`, `-y`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SignedAxis {
    pub sign: Sign,
    pub axis: Axis,
}

impl SignedAxis {
    pub fn new(sign: Sign, axis: Axis) -> Self {
        Self { sign, axis }
    }
}

impl fmt::Display for SignedAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.sign {
            Sign::Plus => '+',
            Sign::Minus => '-',
        };
        write!(f, "{}{}", sign, self.axis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    #[serde(rename = "NAD")]
    Nad,
    #[serde(rename = "AD")]
    Ad,
    #[serde(rename = "FTU")]
    Ftu,
    #[serde(rename = "ITU")]
    Itu,
    #[serde(rename = "RE")]
    Re,
}

impl Category {
    pub fn code(self) -> &'static str {
        match self {
            Category::Nad => "NAD",
            Category::Ad => "AD",
            Category::Ftu => "FTU",
            Category::Itu => "ITU",
            Category::Re => "RE",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OpticalState {
    #[default]
    #[serde(rename = "No_correction")]
    NoCorrection,
    #[serde(rename = "Auto_correction")]
    AutoCorrection,
    #[serde(rename = "Manual_correction")]
    ManualCorrection,
}

impl fmt::Display for OpticalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpticalState::NoCorrection => "No_correction",
            OpticalState::AutoCorrection => "Auto_correction",
            OpticalState::ManualCorrection => "Manual_correction",
        })
    }
}

/// Result of the off-axis deflection check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alignment {
    Aligned,
    Misaligned(Vec<SignedAxis>),
}

impl Alignment {
    pub fn is_aligned(&self) -> bool {
        matches!(self, Alignment::Aligned)
    }

    /// `Yes` / `No`, as reported in the `AL` column.
    pub fn code(&self) -> &'static str {
        if self.is_aligned() { "Yes" } else { "No" }
    }

    pub fn axes(&self) -> &[SignedAxis] {
        match self {
            Alignment::Aligned => &[],
            Alignment::Misaligned(axes) => axes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FitModel {
    #[default]
    Linear,
    Sphere,
}

impl fmt::Display for FitModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FitModel::Linear => "linear",
            FitModel::Sphere => "sphere",
        })
    }
}

/// A fitted parameter and its one-sigma error, when the covariance is finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub value: f64,
    pub error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PressFit {
    pub model: FitModel,
    pub contact_time: Estimate,
    pub slope: Estimate,
    pub baseline: Estimate,
    pub young_modulus: Option<f64>,
    pub young_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullFit {
    pub slope: Estimate,
    pub release_time: Estimate,
    pub endline: Estimate,
}

/// Spans between release, force maximum and return to the endline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JumpMetrics {
    pub force_start: Option<f64>,
    pub force_end: Option<f64>,
    pub nb_points_start: Option<i64>,
    pub nb_points_end: Option<i64>,
    pub time_start: Option<f64>,
    pub time_end: Option<f64>,
    pub distance_start: Option<f64>,
    pub distance_end: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassificationFitKind {
    Max,
    Release,
    MaxTransition,
    ReturnEndline,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationSlopes {
    pub max: Option<f64>,
    pub release: Option<f64>,
    pub max_transition: Option<f64>,
    pub return_endline: Option<f64>,
}

impl ClassificationSlopes {
    pub fn set(&mut self, kind: ClassificationFitKind, slope: f64) {
        let slot = match kind {
            ClassificationFitKind::Max => &mut self.max,
            ClassificationFitKind::Release => &mut self.release,
            ClassificationFitKind::MaxTransition => &mut self.max_transition,
            ClassificationFitKind::ReturnEndline => &mut self.return_endline,
        };
        *slot = Some(slope);
    }

    pub fn get(&self, kind: ClassificationFitKind) -> Option<f64> {
        match kind {
            ClassificationFitKind::Max => self.max,
            ClassificationFitKind::Release => self.release,
            ClassificationFitKind::MaxTransition => self.max_transition,
            ClassificationFitKind::ReturnEndline => self.return_endline,
        }
    }
}

/// Scalar and derived results of analyzing one curve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features {
    pub main_axis: Option<SignedAxis>,
    /// Main-axis trap stiffness (pN/nm).
    pub stiffness: Option<f64>,
    pub baseline_origin_press: Option<f64>,
    pub baseline_corrected_press: Option<f64>,
    pub std_origin_press: Option<f64>,
    pub std_corrected_press: Option<f64>,
    pub incomplete: bool,
    pub alignment: Option<Alignment>,

    pub force_min_press: Option<IndexedValue>,
    pub force_min_curve: Option<IndexedValue>,
    pub time_min_curve: Option<IndexedValue>,
    pub force_max_curve: Option<IndexedValue>,
    pub force_max_pull: Option<IndexedValue>,

    pub contact_point: Option<IndexedValue>,
    pub point_release: Option<IndexedValue>,
    pub point_return_endline: Option<IndexedValue>,
    pub transition_point: Option<IndexedValue>,

    pub press_fit: Option<PressFit>,
    pub pull_fit: Option<PullFit>,
    pub jump: JumpMetrics,
    pub classification_slopes: ClassificationSlopes,

    pub optical_state: OpticalState,
    pub model: FitModel,
    pub tolerance: Option<f64>,
    pub drug: Option<String>,
    pub condition: Option<String>,

    /// Category assigned by the automatic pass.
    pub automatic_category: Option<Category>,
    /// Category assigned after a user-driven re-analysis.
    pub category: Option<Category>,
}

impl Features {
    /// The user-facing category, falling back to the automatic one.
    pub fn resolved_category(&self) -> Option<Category> {
        self.category.or(self.automatic_category)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationFit {
    pub kind: ClassificationFitKind,
    pub distance: Vec<f64>,
    pub fitted: Vec<f64>,
}

/// Series and points produced as a side effect of fitting, for display only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graphics {
    pub smooth_pull: Vec<f64>,
    pub fitted_press: Vec<f64>,
    pub fitted_pull: Vec<f64>,
    pub threshold_press: Option<f64>,
    pub threshold_pull: Option<f64>,
    pub threshold_alignment: Option<f64>,
    pub contact_theoretical_press: Option<IndexedValue>,
    pub contact_theoretical_pull: Option<IndexedValue>,
    pub classification_fits: Vec<ClassificationFit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_axis_displays_sign_and_letter() {
        assert_eq!(SignedAxis::new(Sign::Minus, Axis::Y).to_string(), "-y");
        assert_eq!(SignedAxis::new(Sign::Plus, Axis::Z).to_string(), "+z");
    }

    #[test]
    fn resolved_category_prefers_manual_choice() {
        let mut features = Features {
            automatic_category: Some(Category::Ad),
            ..Default::default()
        };
        assert_eq!(features.resolved_category(), Some(Category::Ad));
        features.category = Some(Category::Ftu);
        assert_eq!(features.resolved_category(), Some(Category::Ftu));
    }

    #[test]
    fn classification_slopes_are_addressed_by_kind() {
        let mut slopes = ClassificationSlopes::default();
        slopes.set(ClassificationFitKind::ReturnEndline, -1.5);
        assert_eq!(slopes.get(ClassificationFitKind::ReturnEndline), Some(-1.5));
        assert_eq!(slopes.get(ClassificationFitKind::Max), None);
    }
}

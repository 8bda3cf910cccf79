use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::error::IncompleteError;

/// The scan geometry matches none of the four supported directions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AxisError {
    #[error("Angle error: {0} rad is not a canonical scan direction")]
    Angle(f64),

    #[error("Angle error: no scan direction in the header")]
    MissingAngle,

    #[error("Error on the scanner: '{0}' is not a sample scanner")]
    Scanner(String),

    #[error("Error on the scanner: no scanner mode in the header")]
    MissingScanner,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Axis identification failed: {0}")]
    Axis(#[from] AxisError),

    #[error("Incomplete curve: {0}")]
    Incomplete(#[from] IncompleteError),

    #[error("Curve has no {0} segment")]
    MissingPhase(&'static str),

    #[error("Feature '{0}' has not been computed")]
    MissingFeature(&'static str),

    #[error("No stiffness calibration for channel '{0}'")]
    MissingCalibration(String),

    #[error("Correction range {start}..={end} does not fit a segment of {len} samples")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

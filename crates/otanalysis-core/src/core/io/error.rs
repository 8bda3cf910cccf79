use std::io;
use thiserror::Error;

/// Malformed or internally inconsistent curve input.
///
/// A `FormatError` is fatal to the single file being decoded; batch callers
/// route the file to the problem bucket and continue.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive container error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Malformed property on line {line}: {reason}")]
    Property { line: usize, reason: String },

    #[error("Header key '{key}' is used both as a value and as a section")]
    KeyCollision { key: String },

    #[error("Conflicting values at header key '{key}': '{existing}' vs '{incoming}'")]
    MergeConflict {
        key: String,
        existing: String,
        incoming: String,
    },

    #[error("Missing header key '{0}'")]
    MissingKey(String),

    #[error("Invalid numeric value '{value}' for header key '{key}'")]
    InvalidNumber { key: String, value: String },

    #[error("Unsupported sample type '{0}'")]
    UnknownSampleType(String),

    #[error("Channel '{channel}' holds {actual} samples but the segment declares {declared}")]
    SampleCount {
        channel: String,
        declared: usize,
        actual: usize,
    },

    #[error("Conversion stage '{0}' has no parameters")]
    MissingConversion(String),

    #[error("Conversion stage '{0}' is marked undefined")]
    UndefinedConversion(String),

    #[error("Conversion chain starting at '{from}' never reaches base '{base}'")]
    UnterminatedChain { from: String, base: String },

    #[error("Unsupported scaling style '{0}'")]
    ScalingStyle(String),

    #[error("Missing channel '{0}'")]
    MissingChannel(String),

    #[error("Segment {0} has no header file")]
    MissingSegmentHeader(usize),

    #[error("Curve has no {0} segment")]
    MissingPhase(&'static str),

    #[error("Malformed data row {line}: {reason}")]
    DataRow { line: usize, reason: String },

    #[error("Unrecognized curve file '{0}'")]
    UnknownFileType(String),
}

/// Declared segment or point counts disagree with the actual content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IncompleteError {
    #[error("{declared} segments declared but {actual} present")]
    Segments { declared: usize, actual: usize },

    #[error("segment '{phase}' holds {actual} of {declared} declared points")]
    Points {
        phase: String,
        declared: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Incomplete curve: {0}")]
    Incomplete(#[from] IncompleteError),
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        LoadError::Format(FormatError::Io(e))
    }
}

impl From<zip::result::ZipError> for LoadError {
    fn from(e: zip::result::ZipError) -> Self {
        LoadError::Format(FormatError::Archive(e))
    }
}

/// Parses a header value as `f64`, reporting the offending key on failure.
pub(crate) fn parse_number(key: &str, value: &str) -> Result<f64, FormatError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| FormatError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        })
}

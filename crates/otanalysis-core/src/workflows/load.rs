use crate::core::io::archive::JpkArchive;
use crate::core::io::error::{FormatError, LoadError};
use crate::core::io::text::TextCurve;
use crate::core::io::traits::CurveFile;
use crate::core::models::curve::Curve;
use std::path::Path;
use tracing::debug;

/// Supported curve containers, recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Text,
    Archive,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(&format!(".{}", JpkArchive::EXTENSION)) {
            Some(FileKind::Archive)
        } else if name.ends_with(&format!(".{}", TextCurve::EXTENSION)) {
            Some(FileKind::Text)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Text => TextCurve::EXTENSION,
            FileKind::Archive => JpkArchive::EXTENSION,
        }
    }

    /// Short label used for output folders.
    pub fn label(self) -> &'static str {
        match self {
            FileKind::Text => "TXT",
            FileKind::Archive => "JPK",
        }
    }
}

/// Decodes the curve stored at `path` with the reader its extension selects.
pub fn load_curve(path: &Path) -> Result<Curve, LoadError> {
    let kind = FileKind::from_path(path)
        .ok_or_else(|| FormatError::UnknownFileType(path.display().to_string()))?;
    debug!(path = %path.display(), ?kind, "Loading curve");
    match kind {
        FileKind::Text => TextCurve::read_from_path(path),
        FileKind::Archive => JpkArchive::read_from_path(path),
    }
}

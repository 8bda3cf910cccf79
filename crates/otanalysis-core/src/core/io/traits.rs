use crate::core::models::curve::Curve;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;

/// Defines the interface for decoding a curve file format.
///
/// Implementors turn one on-disk manipulation into a [`Curve`] whose
/// segments carry physically decoded channels.
pub trait CurveFile {
    /// File extension recognized for the format, without the leading dot.
    const EXTENSION: &'static str;

    /// The error type for decoding operations.
    type Error: Error + From<io::Error>;

    /// Decodes a curve from a seekable reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The reader positioned at the start of the file.
    /// * `source` - Identifier recorded as the curve's source.
    /// * `title` - Human-readable title of the curve.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is malformed or incomplete.
    fn read_from<R: Read + Seek>(reader: R, source: &str, title: &str)
    -> Result<Curve, Self::Error>;

    /// Decodes a curve from a file path.
    ///
    /// The title is the file name with the format extension removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or decoding fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Curve, Self::Error> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let title = title_from_path(path, Self::EXTENSION);
        Self::read_from(BufReader::new(file), &path.to_string_lossy(), &title)
    }
}

/// File name of `path` with a trailing `.extension` stripped.
pub fn title_from_path(path: &Path, extension: &str) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = format!(".{}", extension);
    match name.strip_suffix(&suffix) {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_strips_only_the_format_extension() {
        let path = Path::new("/data/b1c2-2021.06.07-14.50.58.217.jpk-nt-force");
        assert_eq!(
            title_from_path(path, "jpk-nt-force"),
            "b1c2-2021.06.07-14.50.58.217"
        );
        assert_eq!(title_from_path(Path::new("a/b.csv"), "txt"), "b.csv");
    }
}

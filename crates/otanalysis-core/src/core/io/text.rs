use super::error::{FormatError, IncompleteError, LoadError, parse_number};
use super::properties::parse_text_block;
use super::traits::CurveFile;
use crate::core::models::channel::{Axis, ChannelTable};
use crate::core::models::curve::{CalibrationTable, Curve, CurveHeader};
use crate::core::models::segment::{Phase, Segment, SegmentHeader};
use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::iter::Peekable;
use tracing::debug;

const SEGMENT_COUNT_KEY: &str = "settings.segments.size";

/// Reader for the plain-text curve export.
pub struct TextCurve;

impl CurveFile for TextCurve {
    const EXTENSION: &'static str = "txt";
    type Error = LoadError;

    fn read_from<R: Read + Seek>(
        mut reader: R,
        source: &str,
        title: &str,
    ) -> Result<Curve, Self::Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        parse_text_curve(&content, source, title)
    }
}

/// Decodes a text export held in memory.
///
/// The layout is a global block, a calibration block, then for every segment
/// an info block, a table block declaring `columns`, and whitespace-separated
/// rows. Segments are separated by blank lines.
pub fn parse_text_curve(content: &str, source: &str, title: &str) -> Result<Curve, LoadError> {
    let mut lines = content.lines().enumerate().peekable();

    let global = parse_text_block(&mut lines.by_ref().map(|(_, l)| l));
    let calibrations = calibration_table(&parse_text_block(&mut lines.by_ref().map(|(_, l)| l)));
    let header = CurveHeader::new(None, global, calibrations);

    let declared = header
        .get(SEGMENT_COUNT_KEY)
        .ok_or_else(|| FormatError::MissingKey(SEGMENT_COUNT_KEY.to_string()))
        .and_then(|v| parse_number(SEGMENT_COUNT_KEY, v))? as usize;
    check_chunk_count(content, &header, declared)?;

    let mut segments = Vec::new();
    let mut position = 0;
    while position < declared {
        let info = parse_text_block(&mut lines.by_ref().map(|(_, l)| l));
        let table = parse_text_block(&mut lines.by_ref().map(|(_, l)| l));
        if info.is_empty() && table.is_empty() {
            break;
        }
        let last = position + 1 >= declared;
        let rows = read_rows(&mut lines, last)?;
        let channels = channel_table(&table, rows)?;
        segments.push(Segment::new(
            segments.len(),
            Phase::from_position(position),
            SegmentHeader::new(info),
            channels,
        ));

        let next = position + 1;
        if next < declared
            && header.declared_style(next) != Some("motion")
            && header.declared_duration(next) == Some(0.0)
        {
            position += 1;
        }
        position += 1;
    }

    debug!(source, segments = segments.len(), "Decoded text curve");
    Ok(Curve::new(source, title, header, segments)?)
}

/// Non-empty blank-line-separated chunks must match the declared segment
/// count, with or without the zero-duration segments.
fn check_chunk_count(content: &str, header: &CurveHeader, declared: usize) -> Result<(), IncompleteError> {
    let chunks = content
        .replace("\r\n", "\n")
        .split("\n\n")
        .filter(|chunk| !chunk.trim().is_empty())
        .count();
    let empty = (0..declared)
        .filter(|&i| header.declared_duration(i) == Some(0.0))
        .count();
    if chunks == declared || chunks == declared - empty {
        Ok(())
    } else {
        Err(IncompleteError::Segments {
            declared,
            actual: chunks,
        })
    }
}

/// `<channel>_sensitivity` / `<channel>_stiffness` entries; values may carry a unit.
fn calibration_table(block: &BTreeMap<String, String>) -> CalibrationTable {
    let mut table = CalibrationTable::new();
    for (key, value) in block {
        let Some(number) = value
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<f64>().ok())
        else {
            continue;
        };
        if let Some(channel) = key.strip_suffix("_sensitivity") {
            table.set_sensitivity(channel, number);
        } else if let Some(channel) = key.strip_suffix("_stiffness") {
            table.set_stiffness(channel, number);
        }
    }
    table
}

/// Reads numeric rows until a blank or `#` line, or to the end when `last`.
fn read_rows<'a, I>(lines: &mut Peekable<I>, last: bool) -> Result<Vec<Vec<f64>>, FormatError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut rows = Vec::new();
    while let Some(&(number, line)) = lines.peek() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            lines.next();
            if last {
                continue;
            }
            break;
        }
        if trimmed.starts_with('#') {
            if trimmed == "#" {
                lines.next();
            }
            break;
        }
        lines.next();
        let row = trimmed
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| FormatError::DataRow {
                line: number + 1,
                reason: e.to_string(),
            })?;
        rows.push(row);
    }
    Ok(rows)
}

fn channel_table(table: &BTreeMap<String, String>, rows: Vec<Vec<f64>>) -> Result<ChannelTable, FormatError> {
    let columns: Vec<&str> = table
        .get("columns")
        .ok_or_else(|| FormatError::MissingKey("columns".to_string()))?
        .split_whitespace()
        .collect();
    if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
        return Err(FormatError::DataRow {
            line: bad + 1,
            reason: format!("expected {} columns, found {}", columns.len(), rows[bad].len()),
        });
    }

    let column = |name: &str| -> Option<Vec<f64>> {
        let index = columns.iter().position(|c| *c == name)?;
        Some(rows.iter().map(|r| r[index]).collect())
    };
    let required = |name: &str| column(name).ok_or_else(|| FormatError::MissingChannel(name.to_string()));

    Ok(ChannelTable {
        time: required("time")?,
        series_time: required("seriesTime")?,
        deflection: [
            required(Axis::X.channel_name())?,
            required(Axis::Y.channel_name())?,
            required(Axis::Z.channel_name())?,
        ],
        distance: column("distance"),
    })
}

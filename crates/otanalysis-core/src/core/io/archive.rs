use super::error::{FormatError, IncompleteError, LoadError, parse_number};
use super::properties::{HeaderContext, HeaderValue, PropertyFile, PropertyTree, parse_properties};
use super::traits::CurveFile;
use crate::core::models::channel::{
    Axis, ChannelTable, ConversionPlan, ConversionSet, ConversionStage, RawChannel, Scaling,
};
use crate::core::models::curve::{CalibrationTable, Curve, CurveHeader};
use crate::core::models::segment::{Phase, Segment, SegmentHeader, SegmentStyle};
use crate::core::numeric::series::linspace;
use byteorder::{BigEndian, ByteOrder};
use std::collections::BTreeMap;
use std::io::{Read, Seek};
use tracing::{debug, trace};
use zip::ZipArchive;

const GLOBAL_HEADER: &str = "header.properties";
const SHARED_HEADER: &str = "shared-data/header.properties";
const SEGMENT_HEADER: &str = "segment-header.properties";
const SCALING_STYLE: &str = "offsetmultiplier";

/// Binary layout of the samples stored in a channel `.dat` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    Short,
    UnsignedShort,
    Integer,
    Float,
}

impl SampleType {
    pub fn from_name(name: &str) -> Result<Self, FormatError> {
        match name {
            "short" | "short-data" => Ok(SampleType::Short),
            "unsignedshort" => Ok(SampleType::UnsignedShort),
            "integer-data" | "signedinteger" => Ok(SampleType::Integer),
            "float-data" => Ok(SampleType::Float),
            other => Err(FormatError::UnknownSampleType(other.to_string())),
        }
    }

    /// Size of one sample in bytes.
    pub fn width(self) -> usize {
        match self {
            SampleType::Short | SampleType::UnsignedShort => 2,
            SampleType::Integer | SampleType::Float => 4,
        }
    }

    fn read(self, chunk: &[u8]) -> f64 {
        match self {
            SampleType::Short => BigEndian::read_i16(chunk) as f64,
            SampleType::UnsignedShort => BigEndian::read_u16(chunk) as f64,
            SampleType::Integer => BigEndian::read_i32(chunk) as f64,
            SampleType::Float => BigEndian::read_f32(chunk) as f64,
        }
    }
}

/// Unpacks big-endian samples, checking them against the declared count.
pub fn decode_samples(
    channel: &str,
    bytes: &[u8],
    kind: SampleType,
    declared: usize,
) -> Result<Vec<f64>, FormatError> {
    let actual = bytes.len() / kind.width();
    if actual != declared {
        return Err(FormatError::SampleCount {
            channel: channel.to_string(),
            declared,
            actual,
        });
    }
    Ok(bytes
        .chunks_exact(kind.width())
        .map(|chunk| kind.read(chunk))
        .collect())
}

/// Reader for `.jpk-nt-force` zip archives.
pub struct JpkArchive;

impl CurveFile for JpkArchive {
    const EXTENSION: &'static str = "jpk-nt-force";
    type Error = LoadError;

    fn read_from<R: Read + Seek>(
        reader: R,
        source: &str,
        title: &str,
    ) -> Result<Curve, Self::Error> {
        let mut zip = ZipArchive::new(reader)?;
        let names: Vec<String> = zip.file_names().map(String::from).collect();

        let global = read_properties(&mut zip, GLOBAL_HEADER)?;
        let shared = if names.iter().any(|n| n == SHARED_HEADER) {
            Some(read_properties(&mut zip, SHARED_HEADER)?.tree)
        } else {
            None
        };

        let calibrations = shared
            .as_ref()
            .map(calibration_table)
            .unwrap_or_default();
        let header = CurveHeader::new(
            global.date,
            global.tree.flatten_for(HeaderContext::Global),
            calibrations,
        );
        check_segment_count(&header)?;

        let groups = group_entries(names.iter().map(String::as_str));
        let mut segments: Vec<Segment> = Vec::with_capacity(groups.len());
        let mut position = 0;
        for (&index, entries) in &groups {
            if header.declared_duration(position) == Some(0.0) {
                position += 1;
            }
            let phase = Phase::from_position(position);
            position += 1;

            let segment = decode_segment(&mut zip, index, entries, shared.as_ref(), phase, &segments)?;
            trace!(segment = index, phase = %phase, points = segment.len(), "Decoded segment");
            segments.push(segment);
        }

        debug!(source, segments = segments.len(), "Decoded archive");
        Ok(Curve::new(source, title, header, segments)?)
    }
}

#[derive(Debug, Default)]
struct SegmentEntries {
    header: Option<String>,
    channels: BTreeMap<String, String>,
}

/// Groups `segments/<n>/...` entries by numeric segment index.
fn group_entries<'a>(names: impl Iterator<Item = &'a str>) -> BTreeMap<usize, SegmentEntries> {
    let mut groups: BTreeMap<usize, SegmentEntries> = BTreeMap::new();
    for name in names {
        let parts: Vec<&str> = name.split('/').collect();
        if parts.len() < 3 || parts[0] != "segments" {
            continue;
        }
        let Ok(index) = parts[1].parse::<usize>() else {
            continue;
        };
        let entries = groups.entry(index).or_default();
        match parts.as_slice() {
            [_, _, SEGMENT_HEADER] => entries.header = Some(name.to_string()),
            [_, _, _, file] => {
                if let Some(channel) = file.strip_suffix(".dat") {
                    entries.channels.insert(channel.to_string(), name.to_string());
                }
            }
            _ => {}
        }
    }
    groups
}

fn read_entry<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>, FormatError> {
    let mut file = zip.by_name(name)?;
    let mut buffer = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn read_properties<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    name: &str,
) -> Result<PropertyFile, FormatError> {
    let bytes = read_entry(zip, name)?;
    parse_properties(&String::from_utf8_lossy(&bytes))
}

/// Channel name to sensitivity/stiffness, read from the flattened shared header.
fn calibration_table(shared: &PropertyTree) -> CalibrationTable {
    let flat = shared.flatten_for(HeaderContext::Shared);
    let number = |key: String| flat.get(&key).and_then(|v| v.trim().parse::<f64>().ok());
    let count = flat
        .get("lcd-infos.count")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut table = CalibrationTable::new();
    for i in 0..count {
        let Some(channel) = flat.get(&format!("{}.channel.name", i)) else {
            continue;
        };
        if let Some(v) = number(format!("{}.conversion-set.conversion.distance.scaling.multiplier", i)) {
            table.set_sensitivity(channel, v);
        }
        if let Some(v) = number(format!("{}.conversion-set.conversion.force.scaling.multiplier", i)) {
            table.set_stiffness(channel, v);
        }
    }
    table
}

/// Compares declared and recorded segment counts, forgiving zero-duration pauses.
fn check_segment_count(header: &CurveHeader) -> Result<(), IncompleteError> {
    let (Some(declared), Some(actual)) = (
        header.declared_segments(),
        header.number("force-segments.count").map(|n| n as usize),
    ) else {
        return Ok(());
    };
    if declared == actual {
        return Ok(());
    }
    let empty_pauses = (0..declared.saturating_sub(1))
        .filter(|&i| header.is_empty_pause(i))
        .count();
    if actual != declared - empty_pauses {
        return Err(IncompleteError::Segments { declared, actual });
    }
    Ok(())
}

fn decode_segment<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    index: usize,
    entries: &SegmentEntries,
    shared: Option<&PropertyTree>,
    phase: Phase,
    previous: &[Segment],
) -> Result<Segment, FormatError> {
    let header_name = entries
        .header
        .as_deref()
        .ok_or(FormatError::MissingSegmentHeader(index))?;
    let mut tree = read_properties(zip, header_name)?.tree;
    if let Some(shared) = shared {
        let links = tree.resolve_links(shared)?;
        trace!(segment = index, links, "Resolved shared links");
    }

    let num_points = required_number(&tree, "force-segment-header.num-points")? as usize;
    let duration = required_number(&tree, "force-segment-header.duration")?;
    let header = SegmentHeader::new(tree.flatten_for(HeaderContext::Segment));

    let mut channels = BTreeMap::new();
    for (name, entry) in &entries.channels {
        let bytes = read_entry(zip, entry)?;
        let channel = raw_channel(&tree, name, &bytes, num_points, shared.is_some())?;
        channels.insert(name.clone(), channel);
    }

    let mut deflection: [Vec<f64>; 3] = Default::default();
    for axis in Axis::ALL {
        let name = axis.channel_name();
        let channel = channels
            .get(name)
            .ok_or_else(|| FormatError::MissingChannel(name.to_string()))?;
        deflection[axis.index()] = channel.decode(&ConversionPlan::Automatic)?.values;
    }

    let time = linspace(0.0, duration, num_points);
    let series_time = series_time(&time, previous);
    let distance = synthesize_distance(&tree, &header, &time, previous.last());

    Ok(Segment::new(
        index,
        phase,
        header,
        ChannelTable {
            time,
            series_time,
            deflection,
            distance,
        },
    ))
}

fn required_number(tree: &PropertyTree, key: &str) -> Result<f64, FormatError> {
    parse_number(key, tree.require(key)?)
}

fn raw_channel(
    tree: &PropertyTree,
    name: &str,
    bytes: &[u8],
    declared: usize,
    shared: bool,
) -> Result<RawChannel, FormatError> {
    let base = format!("channel.{}", name);
    let node = tree
        .node(&base)
        .ok_or_else(|| FormatError::MissingKey(base.clone()))?;

    // Links into the shared table lift `data.*` one level up.
    let (type_keys, encoder_keys) = if shared {
        (["type", "data.type"], ["encoder", "data.encoder"])
    } else {
        (["data.type", "type"], ["data.encoder", "encoder"])
    };
    let kind = node
        .first_scalar(&type_keys)
        .ok_or_else(|| FormatError::MissingKey(format!("{}.{}", base, type_keys[0])))?;
    let samples = decode_samples(name, bytes, SampleType::from_name(kind)?, declared)?;

    let encoder = encoder_keys
        .iter()
        .find_map(|key| node.node(key).map(|n| (key, n)))
        .map(|(key, n)| parse_scaling(n, &format!("{}.{}", base, key)))
        .transpose()?;
    let conversions = match node.node("conversion-set") {
        Some(set) => parse_conversion_set(set, &format!("{}.conversion-set", base))?,
        None => None,
    };

    Ok(RawChannel {
        name: name.to_string(),
        samples,
        encoder,
        conversions,
    })
}

fn parse_scaling(node: &PropertyTree, path: &str) -> Result<Scaling, FormatError> {
    let field = |key: &str| -> Result<&str, FormatError> {
        node.scalar(key)
            .ok_or_else(|| FormatError::MissingKey(format!("{}.{}", path, key)))
    };
    let style = field("scaling.style")?;
    if style != SCALING_STYLE {
        return Err(FormatError::ScalingStyle(style.to_string()));
    }
    Ok(Scaling {
        offset: parse_number(&format!("{}.scaling.offset", path), field("scaling.offset")?)?,
        multiplier: parse_number(
            &format!("{}.scaling.multiplier", path),
            field("scaling.multiplier")?,
        )?,
        unit: node.scalar("scaling.unit.unit").map(String::from),
    })
}

fn parse_conversion_set(node: &PropertyTree, path: &str) -> Result<Option<ConversionSet>, FormatError> {
    let Some(stages_node) = node.node("conversion") else {
        return Ok(None);
    };
    let required = |key: &str| -> Result<String, FormatError> {
        node.scalar(key)
            .map(String::from)
            .ok_or_else(|| FormatError::MissingKey(format!("{}.{}", path, key)))
    };

    let mut stages = BTreeMap::new();
    for (name, value) in stages_node.entries() {
        let HeaderValue::Node(stage) = value else {
            continue;
        };
        let defined = stage.scalar("defined") != Some("false");
        // Undefined stages are rejected only when a chain asks for them.
        let scaling = if defined && stage.node("scaling").is_some() {
            Some(parse_scaling(stage, &format!("{}.conversion.{}", path, name))?)
        } else {
            None
        };
        stages.insert(
            name.clone(),
            ConversionStage {
                defined,
                base_slot: stage.scalar("base-calibration-slot").map(String::from),
                scaling,
            },
        );
    }

    Ok(Some(ConversionSet {
        base: required("conversions.base")?,
        default: required("conversions.default")?,
        stages,
    }))
}

/// Series time continues from the previous segment, offset by one step of segment 0.
fn series_time(time: &[f64], previous: &[Segment]) -> Vec<f64> {
    let offset = match (previous.first(), previous.last()) {
        (Some(first), Some(last)) => {
            last.raw.series_time.last().copied().unwrap_or(0.0)
                + first.raw.time.get(1).copied().unwrap_or(0.0)
        }
        _ => 0.0,
    };
    time.iter().map(|t| t + offset).collect()
}

fn synthesize_distance(
    tree: &PropertyTree,
    header: &SegmentHeader,
    time: &[f64],
    previous: Option<&Segment>,
) -> Option<Vec<f64>> {
    let n = time.len();
    let declared = |key: &str| tree.scalar(key).and_then(|v| v.trim().parse::<f64>().ok());
    let previous_last = previous
        .and_then(|s| s.raw.distance.as_ref())
        .and_then(|d| d.last().copied());

    if header.style() != Some(SegmentStyle::Motion) {
        let held = declared("channel.distance.data.value")
            .or(previous_last)
            .unwrap_or(0.0);
        return Some(vec![held; n]);
    }

    if let (Some(start), Some(step)) = (
        declared("channel.distance.data.start"),
        declared("channel.distance.data.step"),
    ) {
        return Some(linspace(start, start + step * n as f64, n));
    }

    let speed = header.speed()?;
    Some(match previous {
        None => time.iter().map(|t| speed * t).collect(),
        Some(_) => {
            let last = previous_last.unwrap_or(0.0);
            time.iter().map(|t| last - speed * t).collect()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::CompressionMethod;
    use zip::write::{SimpleFileOptions, ZipWriter};

    const CHANNELS: [&str; 3] = ["xSignal1", "ySignal1", "zSignal1"];

    struct Fixture {
        global: String,
        shared: Option<String>,
        segments: Vec<(String, Vec<(String, Vec<u8>)>)>,
    }

    fn global_header(declared: &[(f64, &str)], recorded: usize) -> String {
        let mut s = format!(
            "#Mon Jun 07 14:50:58 CEST 2021\n\
             force-scan-series.header.force-settings.segments.size={}\n\
             force-scan-series.force-segments.count={}\n\
             force-scan-series.header.force-settings.segment.0.direction.phi=3.141592653589793\n",
            declared.len(),
            recorded
        );
        for (i, (duration, style)) in declared.iter().enumerate() {
            s += &format!(
                "force-scan-series.header.force-settings.segment.{i}.duration={duration}\n\
                 force-scan-series.header.force-settings.segment.{i}.style={style}\n"
            );
        }
        s
    }

    fn shared_header() -> String {
        let mut s = String::from("#Mon Jun 07 14:50:58 CEST 2021\nlcd-infos.count=3\n");
        for (i, name) in CHANNELS.iter().enumerate() {
            s += &format!(
                "lcd-info.{i}.channel.name={name}\n\
                 lcd-info.{i}.type=short\n\
                 lcd-info.{i}.encoder.scaling.style=offsetmultiplier\n\
                 lcd-info.{i}.encoder.scaling.offset=0.0\n\
                 lcd-info.{i}.encoder.scaling.multiplier=0.001\n\
                 lcd-info.{i}.encoder.scaling.unit.unit=V\n\
                 lcd-info.{i}.conversion-set.conversions.base=volts\n\
                 lcd-info.{i}.conversion-set.conversions.default=force\n\
                 lcd-info.{i}.conversion-set.conversion.distance.defined=true\n\
                 lcd-info.{i}.conversion-set.conversion.distance.base-calibration-slot=volts\n\
                 lcd-info.{i}.conversion-set.conversion.distance.scaling.style=offsetmultiplier\n\
                 lcd-info.{i}.conversion-set.conversion.distance.scaling.offset=0.0\n\
                 lcd-info.{i}.conversion-set.conversion.distance.scaling.multiplier=2e-7\n\
                 lcd-info.{i}.conversion-set.conversion.distance.scaling.unit.unit=m\n\
                 lcd-info.{i}.conversion-set.conversion.force.defined=true\n\
                 lcd-info.{i}.conversion-set.conversion.force.base-calibration-slot=distance\n\
                 lcd-info.{i}.conversion-set.conversion.force.scaling.style=offsetmultiplier\n\
                 lcd-info.{i}.conversion-set.conversion.force.scaling.offset=0.0\n\
                 lcd-info.{i}.conversion-set.conversion.force.scaling.multiplier=1e-4\n\
                 lcd-info.{i}.conversion-set.conversion.force.scaling.unit.unit=N\n"
            );
        }
        s
    }

    fn segment_header(points: usize, duration: f64, style: &str) -> String {
        let mut s = format!(
            "#Mon Jun 07 14:50:58 CEST 2021\n\
             force-segment-header.num-points={points}\n\
             force-segment-header.duration={duration}\n\
             force-segment-header.settings.segment-settings.style={style}\n\
             force-segment-header.settings.segment-settings.num-points={points}\n\
             force-segment-header.settings.segment-settings.duration={duration}\n\
             force-segment-header.settings.segment-settings.length=3e-6\n"
        );
        for (i, name) in CHANNELS.iter().enumerate() {
            s += &format!("channel.{name}.lcd-info.*={i}\n");
        }
        s
    }

    fn shorts(values: &[i16]) -> Vec<u8> {
        let mut buffer = vec![0u8; values.len() * 2];
        BigEndian::write_i16_into(values, &mut buffer);
        buffer
    }

    fn channels(values: &[i16]) -> Vec<(String, Vec<u8>)> {
        CHANNELS
            .iter()
            .map(|name| (name.to_string(), shorts(values)))
            .collect()
    }

    fn setup() -> Fixture {
        Fixture {
            global: global_header(&[(0.3, "motion"), (0.1, "pause"), (0.3, "motion")], 3),
            shared: Some(shared_header()),
            segments: vec![
                (segment_header(4, 0.3, "motion"), channels(&[0, 100, 200, 300])),
                (segment_header(4, 0.1, "pause"), channels(&[300, 300, 300, 300])),
                (segment_header(4, 0.3, "motion"), channels(&[300, 200, 100, 0])),
            ],
        }
    }

    fn zip_bytes(fixture: &Fixture) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        writer.start_file(GLOBAL_HEADER, options).unwrap();
        writer.write_all(fixture.global.as_bytes()).unwrap();
        if let Some(shared) = &fixture.shared {
            writer.start_file(SHARED_HEADER, options).unwrap();
            writer.write_all(shared.as_bytes()).unwrap();
        }
        for (index, (header, channels)) in fixture.segments.iter().enumerate() {
            writer
                .start_file(format!("segments/{}/{}", index, SEGMENT_HEADER), options)
                .unwrap();
            writer.write_all(header.as_bytes()).unwrap();
            for (name, bytes) in channels {
                writer
                    .start_file(format!("segments/{}/channels/{}.dat", index, name), options)
                    .unwrap();
                writer.write_all(bytes).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn decode(fixture: &Fixture) -> Result<Curve, LoadError> {
        JpkArchive::read_from(Cursor::new(zip_bytes(fixture)), "memory", "b1c1-test")
    }

    fn f64_approx_equal(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn decodes_segments_through_shared_conversion_chain() {
        let curve = decode(&setup()).unwrap();

        let phases: Vec<Phase> = curve.segments().iter().map(|s| s.phase).collect();
        assert_eq!(phases, vec![Phase::Press, Phase::Wait, Phase::Pull]);

        let press = curve.press();
        assert_eq!(press.len(), 4);
        let x = press.raw.axis(Axis::X);
        // 300 counts -> 0.3 V -> 6e-8 m -> 6e-12 N
        assert!(f64_approx_equal(x[3], 6e-12, 1e-20));
        assert!(f64_approx_equal(x[1], 2e-12, 1e-20));
        assert_eq!(press.raw.time, linspace(0.0, 0.3, 4));

        assert_eq!(curve.header.calibrations.stiffness(Axis::Y), Some(1e-4));
        assert_eq!(curve.header.calibrations.sensitivity(Axis::Z), Some(2e-7));
        assert_eq!(curve.header.declared_segments(), Some(3));
        assert_eq!(curve.header.date.as_deref(), Some("Mon Jun 07 14:50:58 CEST 2021"));
        assert_eq!(press.header.style(), Some(SegmentStyle::Motion));
    }

    #[test]
    fn synthesizes_distance_and_series_time() {
        let curve = decode(&setup()).unwrap();
        let press = curve.press().raw.distance.clone().unwrap();
        let wait = curve.segment(Phase::Wait).unwrap().raw.distance.clone().unwrap();
        let pull = curve.pull().raw.distance.clone().unwrap();

        assert!(f64_approx_equal(press[3], 3e-6, 1e-15));
        assert!(wait.iter().all(|d| f64_approx_equal(*d, press[3], 1e-15)));
        assert!(f64_approx_equal(pull[0], 3e-6, 1e-15));
        assert!(f64_approx_equal(pull[3], 0.0, 1e-15));

        let wait_series = &curve.segment(Phase::Wait).unwrap().raw.series_time;
        assert!(f64_approx_equal(wait_series[0], 0.4, 1e-12));
        assert!(f64_approx_equal(curve.pull().raw.series_time[0], 0.6, 1e-12));
    }

    #[test]
    fn sample_count_mismatch_is_a_format_error() {
        let mut fixture = setup();
        fixture.segments[2].1[0].1 = shorts(&[1, 2, 3]);
        let err = decode(&fixture).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Format(FormatError::SampleCount { declared: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn missing_segments_make_the_archive_incomplete() {
        let mut fixture = setup();
        fixture.global = global_header(&[(0.3, "motion"), (0.1, "pause"), (0.3, "motion")], 2);
        fixture.segments.pop();
        let err = decode(&fixture).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Incomplete(IncompleteError::Segments { declared: 3, actual: 2 })
        ));
    }

    #[test]
    fn zero_duration_pauses_are_skipped_in_phase_naming() {
        let mut fixture = setup();
        fixture.global = global_header(
            &[(0.3, "motion"), (0.0, "pause"), (0.3, "motion"), (0.1, "pause")],
            3,
        );
        fixture.segments = vec![
            (segment_header(4, 0.3, "motion"), channels(&[0, 1, 2, 3])),
            (segment_header(4, 0.3, "motion"), channels(&[3, 2, 1, 0])),
            (segment_header(4, 0.1, "pause"), channels(&[0, 0, 0, 0])),
        ];
        let curve = decode(&fixture).unwrap();
        let phases: Vec<Phase> = curve.segments().iter().map(|s| s.phase).collect();
        assert_eq!(phases, vec![Phase::Press, Phase::Pull, Phase::Extra(3)]);
    }

    #[test]
    fn unknown_sample_type_is_rejected() {
        let mut fixture = setup();
        fixture.shared = Some(shared_header().replace("lcd-info.0.type=short", "lcd-info.0.type=double"));
        let err = decode(&fixture).unwrap_err();
        assert!(matches!(err, LoadError::Format(FormatError::UnknownSampleType(ref t)) if t == "double"));
    }

    #[test]
    fn missing_axis_channel_is_rejected() {
        let mut fixture = setup();
        fixture.segments[0].1.retain(|(name, _)| name != "zSignal1");
        let err = decode(&fixture).unwrap_err();
        assert!(matches!(err, LoadError::Format(FormatError::MissingChannel(ref c)) if c == "zSignal1"));
    }

    #[test]
    fn reads_archive_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b1c1-2021.06.07-14.50.58.217.jpk-nt-force");
        std::fs::write(&path, zip_bytes(&setup())).unwrap();

        let curve = JpkArchive::read_from_path(&path).unwrap();
        assert_eq!(curve.title, "b1c1-2021.06.07-14.50.58.217");
        assert_eq!(curve.segments().len(), 3);
    }

    #[test]
    fn decode_samples_reads_every_type_big_endian() {
        assert_eq!(
            decode_samples("c", &[0xff, 0xfe], SampleType::Short, 1).unwrap(),
            vec![-2.0]
        );
        assert_eq!(
            decode_samples("c", &[0xff, 0xfe], SampleType::UnsignedShort, 1).unwrap(),
            vec![65534.0]
        );
        assert_eq!(
            decode_samples("c", &[0, 0, 1, 0], SampleType::Integer, 1).unwrap(),
            vec![256.0]
        );
        assert_eq!(
            decode_samples("c", &1.5f32.to_be_bytes(), SampleType::Float, 1).unwrap(),
            vec![1.5]
        );
    }
}

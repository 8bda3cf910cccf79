use super::channel::{Axis, ChannelTable};
use super::features::{Alignment, Sign, SignedAxis};
use crate::core::numeric::series;
use std::collections::BTreeMap;
use std::fmt;

/// Phase of the approach/retract cycle a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Press,
    Wait,
    Pull,
    /// Any pause or motion beyond the canonical three, by position.
    Extra(usize),
}

impl Phase {
    /// Phase for the `position`-th declared segment of a manipulation.
    pub fn from_position(position: usize) -> Self {
        match position {
            0 => Phase::Press,
            1 => Phase::Wait,
            2 => Phase::Pull,
            n => Phase::Extra(n),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Phase::Press => "Press".to_string(),
            Phase::Wait => "Wait".to_string(),
            Phase::Pull => "Pull".to_string(),
            Phase::Extra(n) => format!("Wait{}", n),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStyle {
    Motion,
    Pause,
}

/// Flattened per-segment header (`segment-settings.*` and friends).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentHeader {
    entries: BTreeMap<String, String>,
}

impl SegmentHeader {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn style(&self) -> Option<SegmentStyle> {
        match self.get("segment-settings.style")? {
            "motion" => Some(SegmentStyle::Motion),
            "pause" => Some(SegmentStyle::Pause),
            _ => None,
        }
    }

    pub fn num_points(&self) -> Option<usize> {
        self.number("segment-settings.num-points").map(|n| n as usize)
    }

    /// Declared duration (s).
    pub fn duration(&self) -> Option<f64> {
        self.number("segment-settings.duration")
    }

    /// Declared travel length (m).
    pub fn length(&self) -> Option<f64> {
        self.number("segment-settings.length")
    }

    /// Setpoint force (N).
    pub fn setpoint(&self) -> Option<f64> {
        self.number("segment-settings.setpoint.value")
    }

    /// Declared speed (m/s), `length / duration`.
    pub fn speed(&self) -> Option<f64> {
        let duration = self.duration().filter(|d| *d != 0.0)?;
        Some(self.length()? / duration)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentFeatures {
    /// Stage speed (m/s) of a motion segment.
    pub speed: Option<f64>,
}

/// One phase of a curve: its header, raw and corrected channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Position of the segment in its source file.
    pub index: usize,
    pub phase: Phase,
    pub header: SegmentHeader,
    pub raw: ChannelTable,
    pub corrected: ChannelTable,
    pub features: SegmentFeatures,
}

impl Segment {
    /// Builds a segment whose corrected table starts as a copy of `raw`.
    pub fn new(index: usize, phase: Phase, header: SegmentHeader, raw: ChannelTable) -> Self {
        Self {
            index,
            phase,
            header,
            corrected: raw.clone(),
            raw,
            features: SegmentFeatures::default(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn is_motion(&self) -> bool {
        self.header.style() == Some(SegmentStyle::Motion)
    }

    pub fn table(&self, corrected: bool) -> &ChannelTable {
        if corrected { &self.corrected } else { &self.raw }
    }

    /// Window the baseline statistics are taken over: the last samples of a
    /// pull, the first samples otherwise.
    fn reference_window<'a>(&self, values: &'a [f64], window: usize) -> &'a [f64] {
        match self.phase {
            Phase::Pull => series::tail(values, window),
            _ => series::head(values, window),
        }
    }

    pub fn baseline(&self, axis: Axis, corrected: bool, window: usize) -> f64 {
        series::mean(self.reference_window(self.table(corrected).axis(axis), window))
    }

    pub fn std(&self, axis: Axis, corrected: bool, window: usize) -> f64 {
        series::std_dev(self.reference_window(self.table(corrected).axis(axis), window))
    }

    /// Checks the lateral off-main axis and `z` against `threshold`.
    ///
    /// Extremes of the corrected deflection are compared to the absolute
    /// baseline of the segment (zero for phases other than press and pull).
    pub fn check_alignment(&self, main_axis: Axis, threshold: f64, window: usize) -> Alignment {
        let lateral = match main_axis {
            Axis::X => Axis::Y,
            _ => Axis::X,
        };
        let mut offending = Vec::new();

        for axis in [lateral, Axis::Z] {
            let values = self.corrected.axis(axis);
            let baseline = match self.phase {
                Phase::Press | Phase::Pull => self.baseline(axis, true, window).abs(),
                _ => 0.0,
            };
            let (Some(min), Some(max)) = (
                series::argmin(values).map(|i| values[i]),
                series::argmax(values).map(|i| values[i]),
            ) else {
                continue;
            };
            if min - baseline < -threshold {
                offending.push(SignedAxis::new(Sign::Minus, axis));
            }
            if max - baseline > threshold {
                offending.push(SignedAxis::new(Sign::Plus, axis));
            }
        }

        if offending.is_empty() {
            Alignment::Aligned
        } else {
            Alignment::Misaligned(offending)
        }
    }
}

use super::channel::Axis;
use super::features::{Features, Graphics};
use super::segment::{Phase, Segment};
use crate::core::io::error::FormatError;
use std::collections::BTreeMap;

/// Sensitivity and stiffness recorded for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelCalibration {
    /// Detector sensitivity (m/V).
    pub sensitivity: Option<f64>,
    /// Trap stiffness (N/m).
    pub stiffness: Option<f64>,
}

/// Channel name to calibration constants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    channels: BTreeMap<String, ChannelCalibration>,
}

impl CalibrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sensitivity(&mut self, channel: &str, value: f64) {
        self.channels.entry(channel.to_string()).or_default().sensitivity = Some(value);
    }

    pub fn set_stiffness(&mut self, channel: &str, value: f64) {
        self.channels.entry(channel.to_string()).or_default().stiffness = Some(value);
    }

    pub fn get(&self, channel: &str) -> Option<&ChannelCalibration> {
        self.channels.get(channel)
    }

    /// Stiffness (N/m) of the deflection channel of `axis`.
    pub fn stiffness(&self, axis: Axis) -> Option<f64> {
        self.get(axis.channel_name())?.stiffness
    }

    pub fn sensitivity(&self, axis: Axis) -> Option<f64> {
        self.get(axis.channel_name())?.sensitivity
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ChannelCalibration)> {
        self.channels.iter()
    }
}

/// File-level header of a curve: flattened global settings and calibrations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurveHeader {
    pub date: Option<String>,
    global: BTreeMap<String, String>,
    pub calibrations: CalibrationTable,
}

impl CurveHeader {
    pub fn new(
        date: Option<String>,
        global: BTreeMap<String, String>,
        calibrations: CalibrationTable,
    ) -> Self {
        Self {
            date,
            global,
            calibrations,
        }
    }

    pub fn global(&self) -> &BTreeMap<String, String> {
        &self.global
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.global.get(key).map(String::as_str)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn declared_segments(&self) -> Option<usize> {
        self.number("settings.segments.size").map(|n| n as usize)
    }

    pub fn declared_style(&self, index: usize) -> Option<&str> {
        self.get(&format!("settings.segment.{}.style", index))
    }

    pub fn declared_duration(&self, index: usize) -> Option<f64> {
        self.number(&format!("settings.segment.{}.duration", index))
    }

    /// Whether the `index`-th declared segment is a pause lasting zero seconds.
    pub fn is_empty_pause(&self, index: usize) -> bool {
        self.declared_style(index) != Some("motion") && self.declared_duration(index) == Some(0.0)
    }

    /// Scan direction angle (rad) of the first segment.
    pub fn scan_angle(&self) -> Option<f64> {
        self.number("settings.segment.0.direction.phi")
    }

    pub fn scanner(&self) -> Option<&str> {
        self.get("settings.segment.0.xy-scanner.scanner")
    }

    /// Press setpoint (N).
    pub fn setpoint(&self) -> Option<f64> {
        self.number("settings.segment.0.setpoint.value")
    }
}

/// A decoded press/pull manipulation and everything derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Path or identifier of the source file.
    pub source: String,
    /// File name without its extension.
    pub title: String,
    pub header: CurveHeader,
    segments: Vec<Segment>,
    press: usize,
    pull: usize,
    pub features: Features,
    pub graphics: Graphics,
    diagnostics: Vec<String>,
}

impl Curve {
    /// Assembles a curve from segments in acquisition order.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::MissingPhase`] if no press or no pull segment
    /// is present.
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        header: CurveHeader,
        segments: Vec<Segment>,
    ) -> Result<Self, FormatError> {
        let position = |phase: Phase| segments.iter().position(|s| s.phase == phase);
        let press = position(Phase::Press).ok_or(FormatError::MissingPhase("Press"))?;
        let pull = position(Phase::Pull).ok_or(FormatError::MissingPhase("Pull"))?;
        Ok(Self {
            source: source.into(),
            title: title.into(),
            header,
            segments,
            press,
            pull,
            features: Features::default(),
            graphics: Graphics::default(),
            diagnostics: Vec::new(),
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    pub fn segment(&self, phase: Phase) -> Option<&Segment> {
        self.segments.iter().find(|s| s.phase == phase)
    }

    pub fn press(&self) -> &Segment {
        &self.segments[self.press]
    }

    pub fn pull(&self) -> &Segment {
        &self.segments[self.pull]
    }

    pub fn press_mut(&mut self) -> &mut Segment {
        &mut self.segments[self.press]
    }

    pub fn pull_mut(&mut self) -> &mut Segment {
        &mut self.segments[self.pull]
    }

    /// Appends a line to the curve's diagnostic log.
    pub fn note(&mut self, message: impl Into<String>) {
        self.diagnostics.push(message.into());
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

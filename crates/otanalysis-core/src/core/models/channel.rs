use crate::core::io::error::FormatError;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Spatial axis of a deflection channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }

    /// Name of the deflection channel recorded for this axis.
    pub fn channel_name(self) -> &'static str {
        match self {
            Axis::X => "xSignal1",
            Axis::Y => "ySignal1",
            Axis::Z => "zSignal1",
        }
    }

    pub fn from_channel_name(name: &str) -> Option<Self> {
        Axis::ALL.into_iter().find(|a| a.channel_name() == name)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Column-oriented samples of one segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelTable {
    pub time: Vec<f64>,
    pub series_time: Vec<f64>,
    pub deflection: [Vec<f64>; 3],
    pub distance: Option<Vec<f64>>,
}

impl ChannelTable {
    #[inline]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    #[inline]
    pub fn axis(&self, axis: Axis) -> &[f64] {
        &self.deflection[axis.index()]
    }

    #[inline]
    pub fn axis_mut(&mut self, axis: Axis) -> &mut Vec<f64> {
        &mut self.deflection[axis.index()]
    }
}

/// `value = raw × multiplier + offset`, producing `unit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaling {
    pub offset: f64,
    pub multiplier: f64,
    pub unit: Option<String>,
}

impl Scaling {
    #[inline]
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.multiplier + self.offset
    }
}

/// One calibration stage of a channel's conversion set.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionStage {
    pub defined: bool,
    pub base_slot: Option<String>,
    pub scaling: Option<Scaling>,
}

/// Named calibration stages that lead from the raw `base` slot to the
/// `default` (terminal) slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSet {
    pub base: String,
    pub default: String,
    pub stages: BTreeMap<String, ConversionStage>,
}

impl ConversionSet {
    /// Forward-ordered stage names from `base` (exclusive) to `default`.
    ///
    /// Walks each stage's base slot backward from `default` until `base` is
    /// reached, then reverses.
    pub fn automatic_chain(&self) -> Result<Vec<String>, FormatError> {
        if self.default == self.base {
            return Ok(Vec::new());
        }
        let mut chain = vec![self.default.clone()];
        let mut seen: HashSet<String> = HashSet::new();
        loop {
            let current = chain[chain.len() - 1].clone();
            if !seen.insert(current.clone()) {
                return Err(FormatError::UnterminatedChain {
                    from: self.default.clone(),
                    base: self.base.clone(),
                });
            }
            let stage = self
                .stages
                .get(&current)
                .ok_or_else(|| FormatError::MissingConversion(current.clone()))?;
            let slot = stage
                .base_slot
                .as_deref()
                .ok_or_else(|| FormatError::MissingConversion(current.clone()))?;
            if slot == self.base {
                break;
            }
            chain.push(slot.to_string());
        }
        chain.reverse();
        Ok(chain)
    }
}

/// Which calibration stages to apply when decoding a channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConversionPlan {
    /// Only the encoder scaling.
    Raw,
    /// The chain discovered from the conversion set.
    #[default]
    Automatic,
    /// Caller-chosen stage names, applied in order.
    Explicit(Vec<String>),
}

/// Physical samples produced by decoding a [`RawChannel`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChannel {
    pub values: Vec<f64>,
    pub unit: Option<String>,
}

/// Digital samples of one channel plus the scalings that make them physical.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChannel {
    pub name: String,
    pub samples: Vec<f64>,
    pub encoder: Option<Scaling>,
    pub conversions: Option<ConversionSet>,
}

impl RawChannel {
    /// Ordered scalings for `plan`, encoder first.
    pub fn steps(&self, plan: &ConversionPlan) -> Result<Vec<Scaling>, FormatError> {
        let mut steps: Vec<Scaling> = self.encoder.iter().cloned().collect();

        let names = match (plan, &self.conversions) {
            (ConversionPlan::Raw, _) | (ConversionPlan::Automatic, None) => Vec::new(),
            (ConversionPlan::Automatic, Some(set)) => set.automatic_chain()?,
            (ConversionPlan::Explicit(names), _) => names.clone(),
        };

        for name in names {
            let stage = self
                .conversions
                .as_ref()
                .and_then(|set| set.stages.get(&name))
                .ok_or_else(|| FormatError::MissingConversion(name.clone()))?;
            if !stage.defined {
                return Err(FormatError::UndefinedConversion(name));
            }
            let scaling = stage
                .scaling
                .clone()
                .ok_or_else(|| FormatError::MissingConversion(name.clone()))?;
            steps.push(scaling);
        }
        Ok(steps)
    }

    pub fn decode(&self, plan: &ConversionPlan) -> Result<DecodedChannel, FormatError> {
        let steps = self.steps(plan)?;
        let values = self
            .samples
            .iter()
            .map(|&raw| steps.iter().fold(raw, |v, s| s.apply(v)))
            .collect();
        let unit = steps.iter().rev().find_map(|s| s.unit.clone());
        Ok(DecodedChannel { values, unit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(base_slot: &str, multiplier: f64, offset: f64, unit: &str) -> ConversionStage {
        ConversionStage {
            defined: true,
            base_slot: Some(base_slot.to_string()),
            scaling: Some(Scaling {
                offset,
                multiplier,
                unit: Some(unit.to_string()),
            }),
        }
    }

    fn setup() -> RawChannel {
        let mut stages = BTreeMap::new();
        stages.insert("distance".to_string(), stage("volts", 2.0, 0.0, "m"));
        stages.insert("force".to_string(), stage("distance", 10.0, 1.0, "N"));
        RawChannel {
            name: "xSignal1".to_string(),
            samples: vec![1.0, 2.0, 3.0],
            encoder: Some(Scaling {
                offset: 0.5,
                multiplier: 1.0,
                unit: Some("V".to_string()),
            }),
            conversions: Some(ConversionSet {
                base: "volts".to_string(),
                default: "force".to_string(),
                stages,
            }),
        }
    }

    #[test]
    fn automatic_chain_walks_back_to_base_and_reverses() {
        let channel = setup();
        let set = channel.conversions.as_ref().unwrap();
        assert_eq!(set.automatic_chain().unwrap(), vec!["distance", "force"]);
    }

    #[test]
    fn automatic_chain_is_idempotent() {
        let channel = setup();
        let set = channel.conversions.as_ref().unwrap();
        assert_eq!(set.automatic_chain().unwrap(), set.automatic_chain().unwrap());
    }

    #[test]
    fn default_equal_to_base_gives_empty_chain() {
        let mut channel = setup();
        let set = channel.conversions.as_mut().unwrap();
        set.default = "volts".to_string();
        assert!(set.automatic_chain().unwrap().is_empty());
    }

    #[test]
    fn decode_applies_encoder_then_chain() {
        let decoded = setup().decode(&ConversionPlan::Automatic).unwrap();
        // ((1 + 0.5) * 2) * 10 + 1
        assert_eq!(decoded.values, vec![31.0, 51.0, 71.0]);
        assert_eq!(decoded.unit.as_deref(), Some("N"));

        let raw = setup().decode(&ConversionPlan::Raw).unwrap();
        assert_eq!(raw.values, vec![1.5, 2.5, 3.5]);
    }

    #[test]
    fn explicit_plan_uses_given_stages() {
        let decoded = setup()
            .decode(&ConversionPlan::Explicit(vec!["distance".to_string()]))
            .unwrap();
        assert_eq!(decoded.values, vec![3.0, 5.0, 7.0]);
        assert_eq!(decoded.unit.as_deref(), Some("m"));
    }

    #[test]
    fn undefined_stage_is_rejected() {
        let mut channel = setup();
        channel
            .conversions
            .as_mut()
            .unwrap()
            .stages
            .get_mut("distance")
            .unwrap()
            .defined = false;
        assert!(matches!(
            channel.decode(&ConversionPlan::Automatic),
            Err(FormatError::UndefinedConversion(name)) if name == "distance"
        ));
    }

    #[test]
    fn cyclic_or_broken_chains_fail() {
        let mut channel = setup();
        let set = channel.conversions.as_mut().unwrap();
        set.stages.get_mut("distance").unwrap().base_slot = Some("force".to_string());
        assert!(matches!(
            set.automatic_chain(),
            Err(FormatError::UnterminatedChain { .. })
        ));

        set.stages.get_mut("distance").unwrap().base_slot = Some("missing".to_string());
        assert!(matches!(
            set.automatic_chain(),
            Err(FormatError::MissingConversion(name)) if name == "missing"
        ));
    }
}

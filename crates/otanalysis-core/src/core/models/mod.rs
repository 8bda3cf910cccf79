//! Data model of a force-spectroscopy manipulation: channels, segments,
//! curves and their typed features.

pub mod channel;
pub mod curve;
pub mod features;
pub mod segment;

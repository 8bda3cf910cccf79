//! # Engine Module
//!
//! The analysis stages that turn a decoded [`Curve`](crate::core::models::curve::Curve)
//! into a classified one. Every stage mutates the curve in place and records
//! its results in the typed `features` and `graphics` fields.
//!
//! ## Stages
//!
//! - **Normalization** ([`normalizer`]) - main axis, calibrated force, rebased
//!   time, bending-corrected distance, truncation check, press statistics
//! - **Alignment** ([`alignment`]) - off-axis deflection check (`AL`)
//! - **Optical effect** ([`optical`]) - automatic or user-bounded drift removal
//! - **Detection** ([`detection`]) - contact and release search, press and pull fits
//! - **Classification** ([`classifier`]) - NAD, AD, FTU, ITU or RE
//!
//! Parameters live in [`config`]; failures are reported through [`error`] and
//! long-running callers can listen on [`progress`].

pub mod alignment;
pub mod classifier;
pub mod config;
pub mod detection;
pub mod error;
pub mod normalizer;
pub mod optical;
pub mod progress;

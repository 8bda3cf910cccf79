//! # Core Module
//!
//! Stateless foundation of the library: curve file decoding, the curve data
//! model, and the numerical routines the analysis engine is built on.
//!
//! - **File I/O** ([`io`]) - Property headers, the zip archive and text decoders
//! - **Data Model** ([`models`]) - Channels, segments, curves and typed features
//! - **Numerics** ([`numeric`]) - Statistics, smoothing, least-squares fitting and
//!   the piecewise press/pull models
//!
//! Nothing in this layer mutates a curve beyond construction; every analysis
//! stage lives in [`crate::engine`].

pub mod io;
pub mod models;
pub mod numeric;

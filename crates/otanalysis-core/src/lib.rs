//! # otanalysis
//!
//! Decoding and classification of optical-tweezer force-spectroscopy curves.
//! A curve is one press/wait/pull manipulation of a trapped bead against a
//! cell; the library reads it from a `.jpk-nt-force` archive or its text
//! export, calibrates it, finds the contact and release points and labels the
//! pull as one of `NAD`, `AD`, `FTU`, `ITU` or `RE`.
//!
//! The crate follows a three-layer layout:
//!
//! - **[`core`]: the foundation.** File decoders, the curve data model and
//!   stateless numerics (statistics, smoothing, least-squares fitting).
//!
//! - **[`engine`]: the analysis stages.** Normalization, alignment check,
//!   optical-effect correction, contact/release fitting and classification,
//!   each mutating a [`Curve`](core::models::curve::Curve) in place.
//!
//! - **[`workflows`]: the public API.** Single-file and batch analysis, plus
//!   the flat output record consumed by front ends.

pub mod core;
pub mod engine;
pub mod workflows;

//! Decoding of curve files into [`Curve`](crate::core::models::curve::Curve)s.
//!
//! Two containers are supported: the `.jpk-nt-force` zip archive of property
//! headers and big-endian channel samples, and its plain-text export. Both
//! implement the [`traits::CurveFile`] reader trait and share the property
//! header parser.

pub mod archive;
pub mod error;
pub mod properties;
pub mod text;
pub mod traits;

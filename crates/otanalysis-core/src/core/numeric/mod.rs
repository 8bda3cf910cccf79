//! Numerical building blocks: series statistics, smoothing, least-squares
//! fitting and the piecewise force models.

pub mod fitting;
pub mod models;
pub mod series;
pub mod smoothing;

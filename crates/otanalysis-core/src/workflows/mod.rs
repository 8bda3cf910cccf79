//! # Workflows Module
//!
//! Public entry points of the library. Each workflow ties the decoders in
//! [`crate::core`] to the analysis stages in [`crate::engine`] and reports its
//! phases through a [`ProgressReporter`](crate::engine::progress::ProgressReporter).
//!
//! - **Loading** ([`load`]) - picks the reader from the file extension
//! - **Single curve** ([`analyze`]) - normalization, optional optical
//!   correction, fits and classification; re-analysis after a manual correction
//! - **Batch** ([`batch`]) - name filtering, deduplication, parallel analysis,
//!   counters and routing of rejected files
//! - **Output** ([`report`]) - the flat per-curve record written by front ends

pub mod analyze;
pub mod batch;
pub mod load;
pub mod report;

//! High-level segmentation pipeline.
//!
//! This module is the internal "glue" layer that wires together the
//! segmentation stages: threshold -> binarize -> label -> unclump ->
//! exclusion filters -> relabel -> outlines.
//!
//! Algorithmic primitives live in `crate::smooth`, `crate::maxima`,
//! `crate::labels`, `crate::watershed`, and `crate::unclump`. The pipeline
//! layer focuses on stage boundaries, call order, and the snapshots the
//! result carries.

mod config;
mod result;
mod run;

pub use config::SegmentConfig;
pub use result::{SegmentationResult, SummaryStats};
pub use run::segment;

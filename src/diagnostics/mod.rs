//! Run diagnostics: stage timings and the per-series report.
//!
//! `SeriesReport` is the run-scoped channel through which a series analysis
//! exposes what it decided (placement, calibration, thresholds) alongside the
//! phenotype tables handed to the output sink.

pub mod report;
pub mod timing;

pub use report::{ImageReport, InputDescriptor, SeriesReport};
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};

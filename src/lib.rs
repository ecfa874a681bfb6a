#![doc = include_str!("../README.md")]

// Pipeline surface
pub mod barcode;
pub mod calibration;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filesystem;
pub mod grid;
pub mod image;
pub mod metrics;
pub mod pipeline;
pub mod segment;
pub mod types;

// Numeric helpers shared by the stages.
pub mod peaks;
pub mod pyramid;
pub mod stats;

// --- High-level re-exports -------------------------------------------------

pub use crate::config::AnalysisConfig;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::pipeline::{ImageAnalysis, PreparedSeries, ResultSink, SeriesAnalyzer};
pub use crate::types::{CalibrationBounds, GridPlacement, GridSpec, PhenotypeRecord};

pub use crate::diagnostics::{ImageReport, SeriesReport};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use colony_grid::prelude::*;
/// use std::path::PathBuf;
///
/// # fn main() -> colony_grid::Result<()> {
/// let config = AnalysisConfig {
///     grid: "8x12".parse()?,
///     ..Default::default()
/// };
/// let analyzer = SeriesAnalyzer::new(config)?;
/// let images = vec![PathBuf::from("plate_2020-01-01_10-00-00.png")];
/// let mut results: Vec<ImageAnalysis> = Vec::new();
/// let report = analyzer.run(&images, &mut results)?;
/// println!("{} records, {:.1} ms", results[0].records.len(), report.timings.total_ms);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::ImageU8;
    pub use crate::{AnalysisConfig, GridSpec, ImageAnalysis, PhenotypeRecord, SeriesAnalyzer};
}

// --- Stage-level API (for tools & advanced users) --------------------------

pub mod stages {
    pub use crate::calibration::{calibrate, CalibrationOutcome, CalibrationWarning};
    pub use crate::grid::{
        GridDetection, GridLocator, GridStrategy, PatternSearchLocator, PeakProfileLocator,
    };
    pub use crate::metrics::{IntensityFormula, IntensityScale, MetricsParams, PatchMetricsExtractor};
    pub use crate::segment::{ForegroundMask, Polarity, Segmenter, SpotMask};
}

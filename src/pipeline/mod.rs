//! Series orchestration.
//!
//! A run moves through three stages:
//! 1. [`SeriesAnalyzer::prepare`] calibrates, locates the grid on the
//!    reference (last) frame and fixes the spot mask. The resulting
//!    [`PreparedSeries`] is read-only from then on.
//! 2. [`SeriesAnalyzer::measure_image`] segments and measures one image
//!    against the prepared series.
//! 3. [`SeriesAnalyzer::run`] drives both over a whole series, handing each
//!    result to a [`ResultSink`] in series order.
//!
//! Any detection failure or unreadable image aborts the run.

pub mod sink;

pub use sink::ResultSink;

use crate::barcode::SampleLabel;
use crate::calibration::{calibrate, CalibrationOutcome};
use crate::config::AnalysisConfig;
use crate::diagnostics::{elapsed_ms, ImageReport, InputDescriptor, SeriesReport, TimingBreakdown};
use crate::error::{Error, Result};
use crate::grid::{GridDetection, GridLocator};
use crate::image::io::load_grayscale_image;
use crate::image::{GrayImageU8, ImageU8};
use crate::metrics::PatchMetricsExtractor;
use crate::segment::{Segmenter, SpotMask};
use crate::stats::quantile_from_histogram;
use crate::types::{GridPlacement, PhenotypeRecord};
use log::{debug, info};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

const REFERENCE_CLIP: (f32, f32) = (0.01, 0.99);

/// Series-level state shared read-only by every per-image measurement.
#[derive(Clone, Debug)]
pub struct PreparedSeries {
    pub reference: PathBuf,
    pub image_size: (usize, usize),
    pub detection: GridDetection,
    pub spot_mask: SpotMask,
    pub calibration: CalibrationOutcome,
    extractor: PatchMetricsExtractor,
}

impl PreparedSeries {
    pub fn placement(&self) -> &GridPlacement {
        &self.detection.placement
    }
}

/// Everything produced for one image.
#[derive(Clone, Debug)]
pub struct ImageAnalysis {
    pub path: PathBuf,
    pub label: SampleLabel,
    pub records: Vec<PhenotypeRecord>,
    /// Foreground mask of the grid crop, 255 = occupied.
    pub mask: GrayImageU8,
    pub report: ImageReport,
}

pub struct SeriesAnalyzer {
    config: AnalysisConfig,
    locator: Box<dyn GridLocator>,
    segmenter: Segmenter,
}

impl SeriesAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let locator = config.locator.build(config.fraction);
        let segmenter = Segmenter::new(config.segmentation.clone());
        Ok(Self {
            config,
            locator,
            segmenter,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load an image with the configured colony polarity applied.
    fn load(&self, path: &Path) -> Result<GrayImageU8> {
        let image = load_grayscale_image(path)?;
        Ok(self.config.segmentation.polarity.normalize(image))
    }

    /// Locate the grid in a single image.
    pub fn locate(&self, path: &Path) -> Result<GridDetection> {
        let image = clip_to_quantiles(&self.load(path)?);
        self.locator.locate(image.as_view(), self.config.grid)
    }

    /// Calibrate and fix grid placement and spot mask from `reference`.
    pub fn prepare(&self, reference: &Path) -> Result<PreparedSeries> {
        let mut calibration = calibrate(self.config.reference_image.as_deref());
        let polarity = self.config.segmentation.polarity;
        calibration.bounds = polarity.normalize_bounds(calibration.bounds);

        let image = clip_to_quantiles(&self.load(reference)?);
        let view = image.as_view();
        let detection = self.locator.locate(view, self.config.grid)?;
        let placement = detection.placement;
        placement.validate(self.config.grid, view.w, view.h)?;
        info!(
            "Grid {} located by {} at {:?}, cell {}x{}",
            self.config.grid,
            detection.strategy,
            placement.origin,
            placement.patch_width,
            placement.patch_height
        );

        let crop = view
            .crop(&placement.rect())
            .ok_or_else(|| Error::detection("grid rectangle leaves the reference image"))?;
        let spot_mask = SpotMask::from_reference(crop);
        let extractor = PatchMetricsExtractor::new(
            self.config.grid,
            placement,
            self.config.metrics.clone(),
            calibration.bounds,
        );
        Ok(PreparedSeries {
            reference: reference.to_path_buf(),
            image_size: (view.w, view.h),
            detection,
            spot_mask,
            calibration,
            extractor,
        })
    }

    /// Segment and measure one image of a prepared series.
    pub fn measure_image(&self, prepared: &PreparedSeries, path: &Path) -> Result<ImageAnalysis> {
        let label = SampleLabel::from_path(path, &self.config.barcode);
        info!("Analysing {}", label.filename);
        let image = self.load(path)?;
        let view: ImageU8<'_> = image.as_view();
        let crop = view.crop(&prepared.placement().rect()).ok_or_else(|| {
            Error::image_load(
                path,
                format!(
                    "{}x{} image does not contain the grid rectangle",
                    view.w, view.h
                ),
            )
        })?;

        let foreground = self.segmenter.segment(crop, &prepared.spot_mask);
        let records = prepared
            .extractor
            .measure(crop, &foreground, &prepared.spot_mask, &label);
        debug!(
            "{} threshold={:.1} foreground={:.4}",
            label.filename,
            foreground.threshold,
            foreground.fraction()
        );
        let report = ImageReport {
            filename: label.filename.clone(),
            threshold: foreground.threshold,
            color_agar: foreground.color_agar,
            foreground_fraction: foreground.fraction(),
        };
        Ok(ImageAnalysis {
            path: path.to_path_buf(),
            label,
            records,
            mask: foreground.mask.to_image(),
            report,
        })
    }

    /// Analyse `paths` (in series order; the last one is the reference frame).
    pub fn run(&self, paths: &[PathBuf], sink: &mut dyn ResultSink) -> Result<SeriesReport> {
        let reference = paths
            .last()
            .ok_or_else(|| Error::config("no images to analyse"))?;
        let total = Instant::now();
        let mut timings = TimingBreakdown::default();

        let start = Instant::now();
        let prepared = self.prepare(reference)?;
        timings.record_since("prepare", start);

        let start = Instant::now();
        let mut images = Vec::with_capacity(paths.len());
        if self.config.parallel {
            let analyses: Vec<ImageAnalysis> = paths
                .par_iter()
                .map(|p| self.measure_image(&prepared, p))
                .collect::<Result<_>>()?;
            for analysis in &analyses {
                sink.write(analysis)?;
                images.push(analysis.report.clone());
            }
        } else {
            for path in paths {
                let analysis = self.measure_image(&prepared, path)?;
                sink.write(&analysis)?;
                images.push(analysis.report);
            }
        }
        timings.record_since("measure", start);
        timings.total_ms = elapsed_ms(total);

        Ok(SeriesReport {
            input: InputDescriptor {
                reference: prepared.reference.clone(),
                width: prepared.image_size.0,
                height: prepared.image_size.1,
                image_count: paths.len(),
            },
            grid: self.config.grid,
            spot_threshold: prepared.spot_mask.threshold,
            spot_fraction: spot_fraction(&prepared.spot_mask),
            detection: prepared.detection,
            calibration: prepared.calibration,
            images,
            timings,
        })
    }
}

fn spot_fraction(spots: &SpotMask) -> f64 {
    let n = spots.mask.w * spots.mask.h;
    if n == 0 {
        0.0
    } else {
        spots.mask.count() as f64 / n as f64
    }
}

/// Clamp an image to its own [1 %, 99 %] intensity quantiles, truncating
/// back to 8 bits.
pub fn clip_to_quantiles(image: &GrayImageU8) -> GrayImageU8 {
    let hist = image.as_view().histogram();
    match (
        quantile_from_histogram(&hist, REFERENCE_CLIP.0),
        quantile_from_histogram(&hist, REFERENCE_CLIP.1),
    ) {
        (Some(lo), Some(hi)) => image.map(|v| (v as f32).clamp(lo, hi) as u8),
        _ => image.clone(),
    }
}

//! Per-patch phenotype statistics.
//!
//! The crop is split into the `nrow × ncol` cells of
//! [`GridPlacement::cell`], which tile it without a leftover margin. Each
//! patch is clipped to its own quantile range,
//! optionally background-corrected with its agar mean, and reduced to one
//! [`PhenotypeRecord`]. Patches with at most one pixel in a mask class report
//! `0` for the statistics of that class.
use crate::barcode::SampleLabel;
use crate::image::{ImageF32, ImageU8, ImageView};
use crate::segment::{ForegroundMask, SpotMask};
use crate::stats::{clip_in_place, mean, quantile_range, variance};
use crate::types::{CalibrationBounds, GridPlacement, GridSpec, PhenotypeRecord, Rect};
use log::warn;
use serde::{Deserialize, Serialize};

/// What the `Intensity` column reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityFormula {
    /// `sum(tile) / patch_pixels`, the background-corrected patch mean.
    #[default]
    TileMean,
    /// `sum(tile over spot pixels) / patch_pixels`.
    SpotSum,
}

/// Units of the reported intensities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityScale {
    /// `(v - min_ref) / (max_ref - min_ref)`.
    #[default]
    Calibrated,
    /// Raw 8-bit values.
    Raw,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsParams {
    pub background_correction: bool,
    pub intensity_formula: IntensityFormula,
    pub scale: IntensityScale,
    /// Per-patch clipping quantiles.
    pub clip_quantiles: (f32, f32),
}

impl Default for MetricsParams {
    fn default() -> Self {
        Self {
            background_correction: true,
            intensity_formula: IntensityFormula::TileMean,
            scale: IntensityScale::Calibrated,
            clip_quantiles: (0.01, 0.99),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PatchMetricsExtractor {
    grid: GridSpec,
    placement: GridPlacement,
    params: MetricsParams,
    bounds: CalibrationBounds,
}

impl PatchMetricsExtractor {
    pub fn new(
        grid: GridSpec,
        placement: GridPlacement,
        params: MetricsParams,
        bounds: CalibrationBounds,
    ) -> Self {
        let bounds = if params.scale == IntensityScale::Calibrated && bounds.is_degenerate() {
            warn!(
                "Degenerate calibration bounds [{}, {}]; using [0, 255]",
                bounds.min_ref, bounds.max_ref
            );
            CalibrationBounds::default()
        } else {
            bounds
        };
        Self {
            grid,
            placement,
            params,
            bounds,
        }
    }

    pub fn bounds(&self) -> CalibrationBounds {
        self.bounds
    }

    /// Intensities of `crop` in the configured units.
    pub fn rescale(&self, crop: ImageU8<'_>) -> ImageF32 {
        match self.params.scale {
            IntensityScale::Raw => ImageF32::from_u8_with(crop, |v| v as f32),
            IntensityScale::Calibrated => {
                let CalibrationBounds { min_ref, max_ref } = self.bounds;
                let span = max_ref - min_ref;
                ImageF32::from_u8_with(crop, move |v| (v as f32 - min_ref) / span)
            }
        }
    }

    /// One record per grid cell, row-major.
    pub fn measure(
        &self,
        crop: ImageU8<'_>,
        foreground: &ForegroundMask,
        spots: &SpotMask,
        label: &SampleLabel,
    ) -> Vec<PhenotypeRecord> {
        let values = self.rescale(crop);
        let mut records = Vec::with_capacity(self.grid.cells());
        for i in 0..self.grid.nrow {
            for j in 0..self.grid.ncol {
                let cell = self.placement.cell(self.grid, i, j);
                let patch = Patch::gather(&values, foreground, spots, &cell);
                let stats = self.patch_stats(patch);
                records.push(PhenotypeRecord {
                    row: i + 1,
                    col: j + 1,
                    intensity: stats.intensity,
                    area: stats.area,
                    colony_mean: stats.colony_mean,
                    colony_variance: stats.colony_variance,
                    background_mean: stats.background_mean,
                    barcode: label.barcode.clone(),
                    filename: label.filename.clone(),
                });
            }
        }
        records
    }

    fn patch_stats(&self, mut patch: Patch) -> PatchStats {
        let n = patch.values.len();
        if n == 0 {
            return PatchStats::default();
        }
        let (lo_q, hi_q) = self.params.clip_quantiles;
        if let Some((lo, hi)) = quantile_range(&patch.values, lo_q, hi_q) {
            clip_in_place(&mut patch.values, lo, hi);
        }

        let area = patch.foreground as f64 / n as f64;

        let mut spot = Vec::new();
        let mut agar = Vec::new();
        for (&v, &s) in patch.values.iter().zip(&patch.spot) {
            if s {
                spot.push(v);
            } else {
                agar.push(v);
            }
        }

        let backgr = if self.params.background_correction {
            mean(&agar).unwrap_or(0.0) as f32
        } else {
            0.0
        };
        for v in spot.iter_mut().chain(agar.iter_mut()) {
            *v -= backgr;
        }

        let (colony_mean, colony_variance) = if spot.len() > 1 {
            (
                mean(&spot).unwrap_or(0.0),
                variance(&spot).unwrap_or(0.0),
            )
        } else {
            (0.0, 0.0)
        };
        let background_mean = if agar.len() > 1 {
            mean(&agar).unwrap_or(0.0)
        } else {
            0.0
        };

        let spot_sum: f64 = spot.iter().map(|&v| v as f64).sum();
        let intensity = match self.params.intensity_formula {
            IntensityFormula::TileMean => {
                let agar_sum: f64 = agar.iter().map(|&v| v as f64).sum();
                (spot_sum + agar_sum) / n as f64
            }
            IntensityFormula::SpotSum => spot_sum / n as f64,
        };

        PatchStats {
            intensity: finite_or_zero(intensity),
            area: area.clamp(0.0, 1.0),
            colony_mean: finite_or_zero(colony_mean),
            colony_variance: finite_or_zero(colony_variance).max(0.0),
            background_mean: finite_or_zero(background_mean),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct PatchStats {
    intensity: f64,
    area: f64,
    colony_mean: f64,
    colony_variance: f64,
    background_mean: f64,
}

/// Pixels of one cell, flattened row-major.
struct Patch {
    values: Vec<f32>,
    spot: Vec<bool>,
    foreground: usize,
}

impl Patch {
    fn gather(
        values: &ImageF32,
        foreground: &ForegroundMask,
        spots: &SpotMask,
        cell: &Rect,
    ) -> Self {
        let (x0, y0) = (cell.x, cell.y);
        let x1 = (x0 + cell.width).min(values.w);
        let y1 = (y0 + cell.height).min(values.h);
        let mut patch = Patch {
            values: Vec::with_capacity(cell.width * cell.height),
            spot: Vec::with_capacity(cell.width * cell.height),
            foreground: 0,
        };
        for y in y0.min(y1)..y1 {
            let row = values.row(y);
            for (x, &v) in row.iter().enumerate().take(x1).skip(x0) {
                patch.values.push(v);
                patch.spot.push(spots.is_spot(x, y));
                if foreground.mask.get(x, y) {
                    patch.foreground += 1;
                }
            }
        }
        patch
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

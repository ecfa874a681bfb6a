//! Scaled-pattern grid search.
//!
//! A synthetic plate (an `nrow × ncol` lattice of filled discs in the spot
//! colour on agar) is resized to a range of widths between `fraction` and
//! 100 % of the image width and matched against the image with the
//! normalised sum of squared differences. The scale and location with the
//! lowest score win; ties keep the smaller scale.
//!
//! The search runs coarse-to-fine on a [`Pyramid`]: every scale is tried on
//! the coarsest level, then each finer level only re-tests the scales close
//! to the current winner inside a `±refine_margin` pixel window around its
//! upsampled location. Level 0 is the input, so the final score and
//! placement are full-resolution values.
use super::colors::{agar_spot_colors, PlateColors};
use super::{GridDetection, GridLocator};
use crate::error::{Error, Result};
use crate::image::{GrayImageU8, ImageU8};
use crate::pyramid::Pyramid;
use crate::types::{GridPlacement, GridSpec};
use image::imageops::{crop_imm, resize, FilterType};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::template_matching::{match_template, MatchTemplateMethod};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Knobs for [`PatternSearchLocator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSearchParams {
    /// Disc radius as a fraction of the cell height in the synthetic pattern.
    pub spot_radius_ratio: f32,
    /// Increment of the scale fraction between two evaluated widths.
    pub scale_step: f64,
    /// Scores above this are treated as "no grid in the image".
    pub max_score: f32,
    /// Gaussian sigma (bins) applied to the histogram before peak picking.
    pub histogram_sigma: f32,
    /// The exhaustive scale sweep runs on the first pyramid level at most
    /// this wide.
    pub coarse_width: usize,
    /// Smallest cell size (px) a pyramid level may shrink the grid to.
    pub min_coarse_cell: usize,
    /// Half-size of the location window re-searched on each finer level.
    pub refine_margin: usize,
}

impl Default for PatternSearchParams {
    fn default() -> Self {
        Self {
            spot_radius_ratio: 0.25,
            scale_step: 0.002,
            max_score: 1.0,
            histogram_sigma: 2.0,
            coarse_width: 160,
            min_coarse_cell: 8,
            refine_margin: 3,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PatternSearchLocator {
    params: PatternSearchParams,
    fraction: f64,
}

/// Best match of one pattern size on one pyramid level.
#[derive(Clone, Copy, Debug)]
struct ScaleMatch {
    fraction: f64,
    score: f32,
    location: (usize, usize),
    width: usize,
    height: usize,
}

impl PatternSearchLocator {
    pub fn new(params: PatternSearchParams, fraction: f64) -> Self {
        Self { params, fraction }
    }

    /// Scale fractions evaluated by the search, ascending.
    pub fn scale_fractions(&self) -> Vec<f64> {
        let step = self.params.scale_step.max(f64::EPSILON);
        let count = ((1.0 - self.fraction) / step + 1e-9).floor().max(0.0) as usize;
        linspace(self.fraction, 1.0, count)
    }

    /// Number of pyramid levels for a `w × h` image: halve until the width is
    /// at most `coarse_width`, unless that would shrink a cell below
    /// `min_coarse_cell`.
    pub fn search_levels(&self, w: usize, h: usize, grid: GridSpec) -> usize {
        let cell = (w / grid.ncol).min(h / grid.nrow);
        let mut levels = 1;
        while (w >> (levels - 1)) > self.params.coarse_width.max(1)
            && (cell >> levels) >= self.params.min_coarse_cell.max(1)
        {
            levels += 1;
        }
        levels
    }

    /// Fraction tolerance when refining level `level` from level `level + 1`:
    /// two pixels of the coarser level plus one scale step.
    fn refine_radius(&self, w: usize, h: usize, level: usize) -> f64 {
        let coarse_px = (1usize << (level + 1)) as f64;
        2.0 * coarse_px / w.min(h).max(1) as f64 + self.params.scale_step
    }

    /// Match every candidate size on `level` and keep the lowest score, the
    /// smaller scale on ties. `around` restricts each match to the
    /// `±refine_margin` window around that top-left corner.
    fn best_match(
        &self,
        level: &GrayImageU8,
        pattern: &GrayImage,
        candidates: &[(f64, (usize, usize))],
        around: Option<(usize, usize)>,
    ) -> Option<ScaleMatch> {
        let matches: Vec<Option<ScaleMatch>> = candidates
            .par_iter()
            .map(|&(fraction, size)| {
                self.match_scale(level.as_gray(), pattern, fraction, size, around)
            })
            .collect();
        matches
            .into_iter()
            .flatten()
            .fold(None::<ScaleMatch>, |best, m| match best {
                Some(b) if b.score <= m.score => Some(b),
                _ => Some(m),
            })
    }

    fn match_scale(
        &self,
        image: &GrayImage,
        pattern: &GrayImage,
        fraction: f64,
        (width, height): (usize, usize),
        around: Option<(usize, usize)>,
    ) -> Option<ScaleMatch> {
        let (w, h) = (image.width() as usize, image.height() as usize);
        if width == 0 || height == 0 || width > w || height > h {
            return None;
        }
        let (max_x, max_y) = (w - width, h - height);
        let (x0, y0, x1, y1) = match around {
            None => (0, 0, max_x, max_y),
            Some((x, y)) => {
                let m = self.params.refine_margin;
                (
                    x.saturating_sub(m).min(max_x),
                    y.saturating_sub(m).min(max_y),
                    (x + m).min(max_x),
                    (y + m).min(max_y),
                )
            }
        };

        let window;
        let target = if (x0, y0, x1, y1) == (0, 0, max_x, max_y) {
            image
        } else {
            window = crop_imm(
                image,
                x0 as u32,
                y0 as u32,
                (x1 - x0 + width) as u32,
                (y1 - y0 + height) as u32,
            )
            .to_image();
            &window
        };
        let scaled = resize(pattern, width as u32, height as u32, FilterType::Triangle);
        let scores = match_template(
            target,
            &scaled,
            MatchTemplateMethod::SumOfSquaredErrorsNormalized,
        );

        let mut best: Option<(f32, (usize, usize))> = None;
        for (x, y, px) in scores.enumerate_pixels() {
            let s = px[0];
            if !s.is_finite() {
                continue;
            }
            if best.map_or(true, |(b, _)| s < b) {
                best = Some((s, (x0 + x as usize, y0 + y as usize)));
            }
        }
        best.map(|(score, location)| ScaleMatch {
            fraction,
            score,
            location,
            width,
            height,
        })
    }
}

impl GridLocator for PatternSearchLocator {
    fn name(&self) -> &'static str {
        "pattern_search"
    }

    fn locate(&self, image: ImageU8<'_>, grid: GridSpec) -> Result<GridDetection> {
        let start = Instant::now();
        let colors = agar_spot_colors(image, self.params.histogram_sigma)?;
        let pattern = synthesize_pattern(grid, image.h, colors, self.params.spot_radius_ratio);
        let fractions = self.scale_fractions();
        let pyramid = Pyramid::build_u8(image, self.search_levels(image.w, image.h, grid));
        let coarsest = pyramid.len() - 1;
        debug!(
            "PatternSearch start w={} h={} grid={} agar={} spot={} scales={} levels={}",
            image.w,
            image.h,
            grid,
            colors.agar,
            colors.spot,
            fractions.len(),
            pyramid.len()
        );

        let no_fit = || {
            Error::detection(format!(
                "no pattern scale between {:.3} and 1.0 fits a {}x{} image",
                self.fraction, image.w, image.h
            ))
        };
        let coarse = &pyramid.levels[coarsest];
        let mut best = self
            .best_match(coarse, &pattern, &level_sizes(coarse, grid, &fractions), None)
            .ok_or_else(no_fit)?;
        debug!(
            "PatternSearch level={} fraction={:.4} location={:?} score={:.5}",
            coarsest, best.fraction, best.location, best.score
        );

        for level in (0..coarsest).rev() {
            let radius = self.refine_radius(image.w, image.h, level);
            let near: Vec<f64> = fractions
                .iter()
                .copied()
                .filter(|f| (f - best.fraction).abs() <= radius)
                .collect();
            let img = &pyramid.levels[level];
            let predicted = (best.location.0 * 2, best.location.1 * 2);
            best = self
                .best_match(img, &pattern, &level_sizes(img, grid, &near), Some(predicted))
                .ok_or_else(no_fit)?;
            debug!(
                "PatternSearch level={} scales={} fraction={:.4} location={:?} score={:.5}",
                level,
                near.len(),
                best.fraction,
                best.location,
                best.score
            );
        }

        if best.score > self.params.max_score {
            return Err(Error::detection(format!(
                "best pattern score {:.4} exceeds {:.4}",
                best.score, self.params.max_score
            )));
        }

        let placement = GridPlacement::from_extent(best.location, best.width, best.height, grid);
        placement.validate(grid, image.w, image.h)?;
        debug!(
            "PatternSearch done origin={:?} size={}x{} score={:.5} elapsed_ms={:.3}",
            placement.origin,
            placement.width,
            placement.height,
            best.score,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(GridDetection {
            placement,
            strategy: self.name(),
            score: Some(best.score),
            colors: Some(colors),
        })
    }
}

/// Pattern sizes of `fractions` on one pyramid level. Sizes grow with the
/// fraction, so neighbours mapping to the same size collapse onto the
/// smaller fraction.
fn level_sizes(
    level: &GrayImageU8,
    grid: GridSpec,
    fractions: &[f64],
) -> Vec<(f64, (usize, usize))> {
    let mut out: Vec<(f64, (usize, usize))> = Vec::with_capacity(fractions.len());
    for &f in fractions {
        let size = scaled_pattern_size(level.width(), level.height(), grid, f);
        if out.last().map_or(true, |&(_, s)| s != size) {
            out.push((f, size));
        }
    }
    out
}

/// Synthetic plate at intrinsic scale: one `rpix × rpix` cell per spot,
/// `rpix = image_height / nrow`.
pub fn synthesize_pattern(
    grid: GridSpec,
    image_height: usize,
    colors: PlateColors,
    spot_radius_ratio: f32,
) -> GrayImage {
    let rpix = (image_height / grid.nrow).max(1);
    let radius = (rpix as f32 * spot_radius_ratio) as i32;
    let mut pattern = GrayImage::from_pixel(
        (grid.ncol * rpix) as u32,
        (grid.nrow * rpix) as u32,
        Luma([colors.agar]),
    );
    for i in 0..grid.nrow {
        for j in 0..grid.ncol {
            let center = ((j * rpix + rpix / 2) as i32, (i * rpix + rpix / 2) as i32);
            draw_filled_circle_mut(&mut pattern, center, radius, Luma([colors.spot]));
        }
    }
    pattern
}

/// Pattern size for a scale fraction: width follows the image width, height
/// keeps the `nrow / ncol` aspect, re-derived from the image height when it
/// would not fit.
fn scaled_pattern_size(w: usize, h: usize, grid: GridSpec, fraction: f64) -> (usize, usize) {
    let width = (w as f64 * fraction) as usize;
    let height = width * grid.nrow / grid.ncol;
    if height <= h {
        return (width, height);
    }
    let height = (h as f64 * fraction) as usize;
    (height * grid.ncol / grid.nrow, height)
}

fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        n => (0..n)
            .map(|k| {
                if k == n - 1 {
                    end
                } else {
                    start + (end - start) * k as f64 / (n - 1) as f64
                }
            })
            .collect(),
    }
}

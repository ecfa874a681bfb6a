//! Peak-profile grid inference.
//!
//! Row and column mean-intensity profiles peak where a line of spots crosses
//! the plate. The `nrow` (`ncol`) peaks closest to the image centre are kept,
//! their mean spacing is taken as the cell size, and the grid extends half a
//! cell beyond the outermost peaks.
use super::{GridDetection, GridLocator};
use crate::error::{Error, Result};
use crate::image::{ImageU8, ImageView};
use crate::peaks::{find_peaks, PeakOptions};
use crate::types::{GridPlacement, GridSpec};
use log::debug;
use serde::{Deserialize, Serialize};

/// Knobs for [`PeakProfileLocator`]. Both factors multiply the expected cell
/// size `fraction · length / count` along each axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakProfileParams {
    pub distance_factor: f32,
    pub width_factor: f32,
}

impl Default for PeakProfileParams {
    fn default() -> Self {
        Self {
            distance_factor: 0.5,
            width_factor: 0.1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PeakProfileLocator {
    params: PeakProfileParams,
    fraction: f64,
}

/// Grid extent along one axis.
#[derive(Clone, Copy, Debug, PartialEq)]
struct AxisExtent {
    start: usize,
    length: usize,
}

impl PeakProfileLocator {
    pub fn new(params: PeakProfileParams, fraction: f64) -> Self {
        Self { params, fraction }
    }

    fn axis_extent(&self, profile: &[f32], count: usize, axis: &str) -> Result<AxisExtent> {
        let len = profile.len();
        let cell = self.fraction as f32 * len as f32 / count as f32;
        let opts = PeakOptions {
            min_distance: Some(((cell * self.params.distance_factor) as usize).max(1)),
            min_width: Some(cell * self.params.width_factor),
            min_prominence: None,
        };
        let mut peaks: Vec<usize> = find_peaks(profile, &opts).iter().map(|p| p.index).collect();
        if peaks.len() < count {
            return Err(Error::detection(format!(
                "found {} peaks along {axis}, expected {count}",
                peaks.len()
            )));
        }

        let center = (len as f32 - 1.0) * 0.5;
        peaks.sort_by(|&a, &b| {
            (a as f32 - center)
                .abs()
                .total_cmp(&(b as f32 - center).abs())
                .then(a.cmp(&b))
        });
        peaks.truncate(count);
        peaks.sort_unstable();

        let first = peaks[0] as f32;
        let last = peaks[count - 1] as f32;
        let spacing = if count > 1 {
            (last - first) / (count - 1) as f32
        } else {
            2.0 * first.min(len as f32 - first)
        };

        let start = (first - 0.5 * spacing).round();
        let end = (last + 0.5 * spacing).round();
        // One pixel of rounding slack at either border.
        if start < -1.0 || end > len as f32 + 1.0 || spacing <= 0.0 {
            return Err(Error::detection(format!(
                "{axis} grid [{start}, {end}) leaves the image (length {len})"
            )));
        }
        let start = start.max(0.0) as usize;
        let end = (end as usize).min(len);
        Ok(AxisExtent {
            start,
            length: end.saturating_sub(start),
        })
    }
}

impl GridLocator for PeakProfileLocator {
    fn name(&self) -> &'static str {
        "peak_profile"
    }

    fn locate(&self, image: ImageU8<'_>, grid: GridSpec) -> Result<GridDetection> {
        let (rows, cols) = mean_profiles(image);
        let y = self.axis_extent(&rows, grid.nrow, "rows")?;
        let x = self.axis_extent(&cols, grid.ncol, "columns")?;
        let placement = GridPlacement::from_extent((x.start, y.start), x.length, y.length, grid);
        placement.validate(grid, image.w, image.h)?;
        debug!(
            "PeakProfile done origin={:?} size={}x{} cell={}x{}",
            placement.origin,
            placement.width,
            placement.height,
            placement.patch_width,
            placement.patch_height
        );
        Ok(GridDetection {
            placement,
            strategy: self.name(),
            score: None,
            colors: None,
        })
    }
}

/// Row-wise and column-wise mean intensity profiles.
pub fn mean_profiles(image: ImageU8<'_>) -> (Vec<f32>, Vec<f32>) {
    let mut col_sums = vec![0f64; image.w];
    let mut rows = Vec::with_capacity(image.h);
    for row in image.rows() {
        let mut sum = 0f64;
        for (acc, &v) in col_sums.iter_mut().zip(row) {
            *acc += v as f64;
            sum += v as f64;
        }
        rows.push((sum / image.w.max(1) as f64) as f32);
    }
    let cols = col_sums
        .into_iter()
        .map(|s| (s / image.h.max(1) as f64) as f32)
        .collect();
    (rows, cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn profiles_average_rows_and_columns() {
        let data = vec![0, 10, 20, 30, 40, 50];
        let view = ImageU8 {
            w: 3,
            h: 2,
            stride: 3,
            data: &data,
        };
        let (rows, cols) = mean_profiles(view);
        assert_abs_diff_eq!(rows[0], 10.0);
        assert_abs_diff_eq!(rows[1], 40.0);
        assert_abs_diff_eq!(cols[0], 15.0);
        assert_abs_diff_eq!(cols[2], 35.0);
    }

    #[test]
    fn keeps_the_peaks_closest_to_the_centre() {
        // Four bumps; the outer-left one is a border artefact.
        let mut profile = vec![0.0f32; 100];
        for &c in &[8usize, 35, 55, 75] {
            for d in 0..5usize {
                let v = 10.0 - 2.0 * d as f32;
                profile[c + d] = profile[c + d].max(v);
                profile[c - d] = profile[c - d].max(v);
            }
        }
        let locator = PeakProfileLocator::new(PeakProfileParams::default(), 0.6);
        let extent = locator.axis_extent(&profile, 3, "rows").unwrap();
        assert_eq!(extent, AxisExtent { start: 25, length: 60 });
    }

    #[test]
    fn too_few_peaks_is_a_detection_failure() {
        let profile: Vec<f32> = (0..50).map(|i| if i == 25 { 5.0 } else { 0.0 }).collect();
        let locator = PeakProfileLocator::new(
            PeakProfileParams {
                width_factor: 0.0,
                ..Default::default()
            },
            0.8,
        );
        let err = locator.axis_extent(&profile, 2, "rows").unwrap_err();
        assert!(matches!(err, Error::Detection(_)));
    }
}

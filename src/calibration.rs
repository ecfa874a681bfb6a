//! Intensity calibration from an optional black/white reference photograph.
//!
//! The reference is clipped to its [1 %, 99 %] quantiles to discard sensor
//! outliers; the clipped extremes become the bounds every image of the
//! series is rescaled with. A missing or unreadable reference is not fatal:
//! the default bounds `{0, 255}` are used and a warning is attached.
use crate::image::io::load_grayscale_image;
use crate::image::ImageU8;
use crate::stats::quantile_from_histogram;
use crate::types::CalibrationBounds;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

const LOWER_QUANTILE: f32 = 0.01;
const UPPER_QUANTILE: f32 = 0.99;

/// Non-fatal reason calibration fell back to the default bounds.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum CalibrationWarning {
    NotFound { path: PathBuf },
    Unreadable { path: PathBuf, message: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationOutcome {
    pub bounds: CalibrationBounds,
    pub warning: Option<CalibrationWarning>,
}

impl CalibrationOutcome {
    fn fallback(warning: Option<CalibrationWarning>) -> Self {
        Self {
            bounds: CalibrationBounds::default(),
            warning,
        }
    }
}

/// Derive bounds from the reference image at `path`, if any.
pub fn calibrate(path: Option<&Path>) -> CalibrationOutcome {
    let Some(path) = path else {
        return CalibrationOutcome::fallback(None);
    };
    if !path.is_file() {
        info!(
            "Reference image {} not found. Calibration not performed.",
            path.display()
        );
        return CalibrationOutcome::fallback(Some(CalibrationWarning::NotFound {
            path: path.to_path_buf(),
        }));
    }
    match load_grayscale_image(path) {
        Ok(reference) => CalibrationOutcome {
            bounds: bounds_from_image(reference.as_view()),
            warning: None,
        },
        Err(err) => {
            info!("Reference image unusable ({err}). Calibration not performed.");
            CalibrationOutcome::fallback(Some(CalibrationWarning::Unreadable {
                path: path.to_path_buf(),
                message: err.to_string(),
            }))
        }
    }
}

/// Bounds of the reference intensities after [1 %, 99 %] quantile clipping.
pub fn bounds_from_image(reference: ImageU8<'_>) -> CalibrationBounds {
    let hist = reference.histogram();
    match (
        quantile_from_histogram(&hist, LOWER_QUANTILE),
        quantile_from_histogram(&hist, UPPER_QUANTILE),
    ) {
        (Some(lo), Some(hi)) => CalibrationBounds {
            min_ref: lo,
            max_ref: hi,
        },
        _ => CalibrationBounds::default(),
    }
}

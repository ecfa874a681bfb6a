//! Representative agar and spot intensities from the intensity histogram.
//!
//! The agar is the most prominent histogram peak. The spot colour is the next
//! most prominent peak brighter than the agar, clamped into
//! `[2·agar, 0.7·max]`.
use crate::error::{Error, Result};
use crate::image::ImageU8;
use crate::peaks::{find_peaks, gaussian_smooth, PeakOptions};
use serde::Serialize;

/// Minimum peak width (histogram bins) at half prominence.
const MIN_PEAK_WIDTH: f32 = 3.0;
const SPOT_UPPER_FRACTION: f32 = 0.7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateColors {
    pub agar: u8,
    pub spot: u8,
}

/// Estimate agar and spot colours. `histogram_sigma` smooths the histogram
/// (in bins) before peak picking; `0` disables smoothing.
pub fn agar_spot_colors(image: ImageU8<'_>, histogram_sigma: f32) -> Result<PlateColors> {
    let hist = image.histogram();
    if hist.iter().all(|&c| c == 0) {
        return Err(Error::detection("empty image has no intensity histogram"));
    }
    let counts: Vec<f32> = hist.iter().map(|&c| c as f32).collect();
    let smoothed = gaussian_smooth(&counts, histogram_sigma);

    let mut peaks = find_peaks(
        &smoothed,
        &PeakOptions {
            min_width: Some(MIN_PEAK_WIDTH),
            ..Default::default()
        },
    );
    peaks.sort_by(|a, b| {
        b.prominence
            .total_cmp(&a.prominence)
            .then(a.index.cmp(&b.index))
    });

    let agar = match peaks.first() {
        Some(p) => p.index,
        // Saturated or single-valued plates have no interior peak.
        None => argmax(&smoothed),
    };
    let max_intensity = image.max_value() as f32;
    let upper = SPOT_UPPER_FRACTION * max_intensity;
    let lower = 2.0 * agar as f32;

    let mut spot = peaks
        .iter()
        .find(|p| p.index > agar)
        .map(|p| p.index as f32)
        .unwrap_or(upper);
    if spot < lower {
        spot = lower.min(upper);
    } else if spot > upper {
        spot = lower.max(upper);
    }

    Ok(PlateColors {
        agar: agar as u8,
        spot: spot.clamp(0.0, 255.0) as u8,
    })
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

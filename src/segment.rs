//! Spot/agar classification of grid crops.
//!
//! The [`SpotMask`] is derived once from the reference crop and marks where
//! a colony can be. Each image of the series then gets its own
//! [`ForegroundMask`], restricted to the spot region, whose threshold is kept
//! above the agar level measured in that image.
use crate::image::{BinaryMask, GrayImageU8, ImageU8, ImageView};
use crate::stats::mean;
use crate::types::CalibrationBounds;
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;
use log::debug;
use serde::{Deserialize, Serialize};

/// Which side of the threshold holds cell mass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Colonies are brighter than the agar.
    #[default]
    Bright,
    /// Colonies are darker than the agar; images are inverted on load.
    Dark,
}

impl Polarity {
    /// Map an image so that cell mass is the higher intensity.
    pub fn normalize(self, image: GrayImageU8) -> GrayImageU8 {
        match self {
            Polarity::Bright => image,
            Polarity::Dark => image.inverted(),
        }
    }

    /// Express reference bounds in the same convention as [`Self::normalize`].
    pub fn normalize_bounds(self, bounds: CalibrationBounds) -> CalibrationBounds {
        match self {
            Polarity::Bright => bounds,
            Polarity::Dark => bounds.inverted(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Gaussian sigma applied to each crop before thresholding; `None` disables it.
    pub blur_sigma: Option<f32>,
    pub polarity: Polarity,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            blur_sigma: Some(2.6),
            polarity: Polarity::Bright,
        }
    }
}

/// Reference-frame classification, fixed for the whole series.
#[derive(Clone, Debug, PartialEq)]
pub struct SpotMask {
    pub mask: BinaryMask,
    /// Otsu level of the reference crop; pixels above it are spot.
    pub threshold: u8,
}

impl SpotMask {
    pub fn from_reference(crop: ImageU8<'_>) -> Self {
        let owned = crop.to_owned_image();
        let threshold = otsu_level(owned.as_gray());
        let mask = BinaryMask::from_fn(crop.w, crop.h, |x, y| crop.get(x, y) > threshold);
        debug!(
            "SpotMask threshold={} spot_pixels={} of {}",
            threshold,
            mask.count(),
            crop.w * crop.h
        );
        Self { mask, threshold }
    }

    pub fn is_spot(&self, x: usize, y: usize) -> bool {
        self.mask.get(x, y)
    }
}

/// Per-image classification of occupied pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct ForegroundMask {
    pub mask: BinaryMask,
    /// Effective threshold after combining Otsu with the agar level.
    pub threshold: f32,
    /// Mean intensity of agar pixels, when the spot mask leaves any.
    pub color_agar: Option<f32>,
}

impl ForegroundMask {
    pub fn fraction(&self) -> f64 {
        let n = self.mask.w * self.mask.h;
        if n == 0 {
            0.0
        } else {
            self.mask.count() as f64 / n as f64
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Segmenter {
    params: SegmentationParams,
}

impl Segmenter {
    pub fn new(params: SegmentationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SegmentationParams {
        &self.params
    }

    /// Foreground of `crop`, which must have the spot mask's shape.
    pub fn segment(&self, crop: ImageU8<'_>, spots: &SpotMask) -> ForegroundMask {
        debug_assert_eq!((crop.w, crop.h), (spots.mask.w, spots.mask.h));
        let color_agar = agar_level(crop, spots);

        let mut smoothed = crop.to_owned_image();
        if let Some(sigma) = self.params.blur_sigma.filter(|s| *s > 0.0) {
            if crop.w > 0 && crop.h > 0 {
                smoothed = GrayImageU8::from_gray(gaussian_blur_f32(smoothed.as_gray(), sigma));
            }
        }
        let otsu = otsu_level(smoothed.as_gray()) as f32;
        let threshold = effective_threshold(otsu, color_agar);

        let blurred = smoothed.as_view();
        let mask = BinaryMask::from_fn(crop.w, crop.h, |x, y| {
            spots.is_spot(x, y) && blurred.get(x, y) as f32 >= threshold
        });
        ForegroundMask {
            mask,
            threshold,
            color_agar,
        }
    }
}

/// Keep the threshold strictly above the known agar baseline.
pub fn effective_threshold(otsu: f32, color_agar: Option<f32>) -> f32 {
    match color_agar {
        Some(agar) => ((otsu + agar) * 0.5).max(agar + 1.0),
        None => otsu,
    }
}

fn agar_level(crop: ImageU8<'_>, spots: &SpotMask) -> Option<f32> {
    let mut agar = Vec::new();
    for (y, row) in crop.rows().enumerate() {
        for (x, &v) in row.iter().enumerate() {
            if !spots.is_spot(x, y) {
                agar.push(v as f32);
            }
        }
    }
    mean(&agar).map(|m| m as f32)
}

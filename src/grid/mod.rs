//! Grid localisation on the reference frame.
//!
//! Two interchangeable strategies sit behind [`GridLocator`]:
//! - [`pattern`]: scaled synthetic-pattern search with template matching.
//! - [`profile`]: peak picking on row/column mean-intensity profiles.
//!
//! [`GridStrategy`] is the serialisable selector used by configuration files.

pub mod colors;
pub mod pattern;
pub mod profile;

pub use colors::{agar_spot_colors, PlateColors};
pub use pattern::{synthesize_pattern, PatternSearchLocator, PatternSearchParams};
pub use profile::{mean_profiles, PeakProfileLocator, PeakProfileParams};

use crate::error::Result;
use crate::image::ImageU8;
use crate::types::{GridPlacement, GridSpec};
use serde::{Deserialize, Serialize};

/// Outcome of a successful localisation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDetection {
    pub placement: GridPlacement,
    pub strategy: &'static str,
    /// Matching cost of the winning scale, when the strategy has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<PlateColors>,
}

/// Find the `nrow × ncol` spot lattice in an 8-bit grayscale image.
pub trait GridLocator: Send + Sync {
    fn name(&self) -> &'static str;

    fn locate(&self, image: ImageU8<'_>, grid: GridSpec) -> Result<GridDetection>;
}

/// Strategy selector as it appears in configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridStrategy {
    PatternSearch(PatternSearchParams),
    PeakProfile(PeakProfileParams),
}

impl Default for GridStrategy {
    fn default() -> Self {
        GridStrategy::PatternSearch(PatternSearchParams::default())
    }
}

impl GridStrategy {
    /// Instantiate the locator; `fraction` is the smallest plausible share of
    /// the image the grid occupies.
    pub fn build(&self, fraction: f64) -> Box<dyn GridLocator> {
        match self {
            GridStrategy::PatternSearch(params) => {
                Box::new(PatternSearchLocator::new(params.clone(), fraction))
            }
            GridStrategy::PeakProfile(params) => {
                Box::new(PeakProfileLocator::new(params.clone(), fraction))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_is_selected_by_kind_tag() {
        let s: GridStrategy =
            serde_json::from_str(r#"{ "kind": "peak_profile", "distance_factor": 0.4 }"#).unwrap();
        match &s {
            GridStrategy::PeakProfile(p) => {
                assert_eq!(p.distance_factor, 0.4);
                assert_eq!(p.width_factor, 0.1);
            }
            other => panic!("unexpected strategy {other:?}"),
        }
        assert_eq!(s.build(0.8).name(), "peak_profile");

        let s: GridStrategy = serde_json::from_str(r#"{ "kind": "pattern_search" }"#).unwrap();
        assert_eq!(s, GridStrategy::default());
        assert_eq!(s.build(0.8).name(), "pattern_search");
    }
}

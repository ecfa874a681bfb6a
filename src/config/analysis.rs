use crate::barcode::BarcodeRule;
use crate::error::{Error, Result};
use crate::grid::GridStrategy;
use crate::metrics::MetricsParams;
use crate::segment::SegmentationParams;
use crate::types::GridSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a series run needs besides the image list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub grid: GridSpec,
    /// Smallest share of the image width the grid may occupy, in `(0, 1)`.
    pub fraction: f64,
    pub locator: GridStrategy,
    /// Black/white photograph used for intensity calibration.
    pub reference_image: Option<PathBuf>,
    pub segmentation: SegmentationParams,
    pub metrics: MetricsParams,
    pub barcode: BarcodeRule,
    /// Measure images on the rayon pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec { nrow: 8, ncol: 12 },
            fraction: 0.8,
            locator: GridStrategy::default(),
            reference_image: None,
            segmentation: SegmentationParams::default(),
            metrics: MetricsParams::default(),
            barcode: BarcodeRule::default(),
            parallel: false,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid.nrow == 0 || self.grid.ncol == 0 {
            return Err(Error::config(format!("grid {} has an empty axis", self.grid)));
        }
        if !(self.fraction.is_finite() && self.fraction > 0.0 && self.fraction < 1.0) {
            return Err(Error::config(format!(
                "fraction must lie in (0, 1), got {}",
                self.fraction
            )));
        }
        match &self.locator {
            GridStrategy::PatternSearch(p) => {
                ensure_positive("spot_radius_ratio", p.spot_radius_ratio as f64)?;
                ensure_positive("scale_step", p.scale_step)?;
                ensure_non_negative("max_score", p.max_score as f64)?;
                ensure_non_negative("histogram_sigma", p.histogram_sigma as f64)?;
                ensure_positive("coarse_width", p.coarse_width as f64)?;
                ensure_positive("min_coarse_cell", p.min_coarse_cell as f64)?;
            }
            GridStrategy::PeakProfile(p) => {
                ensure_non_negative("distance_factor", p.distance_factor as f64)?;
                ensure_non_negative("width_factor", p.width_factor as f64)?;
            }
        }
        if let Some(sigma) = self.segmentation.blur_sigma {
            ensure_non_negative("blur_sigma", sigma as f64)?;
        }
        let (lo, hi) = self.metrics.clip_quantiles;
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
            return Err(Error::config(format!(
                "clip quantiles ({lo}, {hi}) must satisfy 0 <= lo <= hi <= 1"
            )));
        }
        Ok(())
    }
}

fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::config(format!("{name} must be positive, got {value}")))
    }
}

fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::config(format!("{name} must be non-negative, got {value}")))
    }
}

/// Read, parse and validate a JSON configuration file.
pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::config(format!("failed to read config {}: {e}", path.display())))?;
    let config: AnalysisConfig = serde_json::from_str(&contents)
        .map_err(|e| Error::config(format!("failed to parse config {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::PeakProfileParams;
    use crate::metrics::IntensityScale;
    use crate::segment::Polarity;

    #[test]
    fn defaults_are_valid() {
        let cfg = AnalysisConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.grid, GridSpec { nrow: 8, ncol: 12 });
        assert!(cfg.metrics.background_correction);
    }

    #[test]
    fn loads_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(
            &path,
            r#"{
                "grid": ["16", "24"],
                "fraction": 0.7,
                "locator": { "kind": "peak_profile" },
                "segmentation": { "polarity": "dark" },
                "metrics": { "scale": "raw", "background_correction": false }
            }"#,
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.grid, GridSpec { nrow: 16, ncol: 24 });
        assert_eq!(cfg.fraction, 0.7);
        assert_eq!(
            cfg.locator,
            GridStrategy::PeakProfile(PeakProfileParams::default())
        );
        assert_eq!(cfg.segmentation.polarity, Polarity::Dark);
        assert_eq!(cfg.segmentation.blur_sigma, Some(2.6));
        assert_eq!(cfg.metrics.scale, IntensityScale::Raw);
        assert!(!cfg.metrics.background_correction);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for fraction in [0.0, 1.0, -0.2, f64::NAN] {
            let cfg = AnalysisConfig {
                fraction,
                ..Default::default()
            };
            assert!(matches!(cfg.validate(), Err(Error::Config(_))));
        }

        let mut cfg = AnalysisConfig::default();
        cfg.metrics.clip_quantiles = (0.9, 0.1);
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn bad_grid_in_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{ "grid": "0x12" }"#).unwrap();
        assert!(matches!(load_config(&path), Err(Error::Config(_))));
        assert!(matches!(
            load_config(&dir.path().join("missing.json")),
            Err(Error::Config(_))
        ));
    }
}

use crate::calibration::CalibrationOutcome;
use crate::diagnostics::TimingBreakdown;
use crate::grid::GridDetection;
use crate::types::GridSpec;
use serde::Serialize;
use std::path::PathBuf;

/// Run-scoped account of one series analysis, returned by
/// [`SeriesAnalyzer::run`](crate::pipeline::SeriesAnalyzer::run).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesReport {
    pub input: InputDescriptor,
    pub grid: GridSpec,
    pub detection: GridDetection,
    pub calibration: CalibrationOutcome,
    /// Otsu level that defined the spot mask on the reference crop.
    pub spot_threshold: u8,
    pub spot_fraction: f64,
    pub images: Vec<ImageReport>,
    pub timings: TimingBreakdown,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub reference: PathBuf,
    pub width: usize,
    pub height: usize,
    pub image_count: usize,
}

/// Segmentation summary of one image.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReport {
    pub filename: String,
    pub threshold: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_agar: Option<f32>,
    pub foreground_fraction: f64,
}

impl SeriesReport {
    /// One line per image for console output.
    pub fn summary_lines(&self) -> Vec<String> {
        self.images
            .iter()
            .map(|img| {
                format!(
                    "{}: threshold={:.1} agar={} foreground={:.3}",
                    img.filename,
                    img.threshold,
                    format_optional(img.color_agar),
                    img.foreground_fraction
                )
            })
            .collect()
    }
}

fn format_optional(val: Option<f32>) -> String {
    val.map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "-".to_string())
}

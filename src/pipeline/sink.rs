use super::ImageAnalysis;
use crate::error::Result;

/// Receives the analysis of each image, in series order.
pub trait ResultSink {
    fn write(&mut self, analysis: &ImageAnalysis) -> Result<()>;
}

/// Keep everything in memory.
impl ResultSink for Vec<ImageAnalysis> {
    fn write(&mut self, analysis: &ImageAnalysis) -> Result<()> {
        self.push(analysis.clone());
        Ok(())
    }
}

//! Run configuration loaded from JSON files or assembled by the CLI.
pub mod analysis;

pub use analysis::{load_config, AnalysisConfig};

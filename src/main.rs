//! colony-grid CLI: quantify colony growth on gridded agar plates.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colony_grid::config::{load_config, AnalysisConfig};
use colony_grid::filesystem::{discover_images, DirectorySink, OutputLayout};
use colony_grid::grid::{GridStrategy, PatternSearchParams, PeakProfileParams};
use colony_grid::image::io::write_json_file;
use colony_grid::pipeline::SeriesAnalyzer;
use colony_grid::GridSpec;
use log::{info, LevelFilter};
use std::path::PathBuf;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "colony-grid")]
#[command(about = "Measure bacterial colony growth on gridded plates from photograph series")]
#[command(version)]
struct Cli {
    /// Only log informational messages.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse every image of a directory and write phenotype tables and masks.
    Analyse(AnalyseArgs),

    /// Locate the grid in one image and print the placement as JSON.
    Locate(LocateArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Scaled synthetic-pattern search.
    Pattern,
    /// Row/column intensity profile peaks.
    Profile,
}

/// Options shared by both subcommands.
#[derive(Debug, Clone, Args)]
struct GridArgs {
    /// Grid format, either `8x12` or `8 12`.
    #[arg(short = 'g', long = "grid-format", num_args = 1..=2)]
    grid_format: Option<Vec<String>>,

    /// Smallest share of the image width the grid occupies, in (0, 1).
    #[arg(short, long)]
    fraction: Option<f64>,

    /// Grid localisation strategy.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// JSON configuration file; command-line flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct AnalyseArgs {
    /// Directory holding the image series.
    #[arg(short, long, default_value = ".")]
    directory: PathBuf,

    /// Disable background (light) correction of patch intensities.
    #[arg(short = 'c', long)]
    light_correction_off: bool,

    /// Black/white photograph used to calibrate intensities.
    #[arg(short, long)]
    reference_image: Option<PathBuf>,

    /// Analyse only the last image of the series.
    #[arg(short, long)]
    endpoint: bool,

    /// Write the run report (JSON) here.
    #[arg(long)]
    report: Option<PathBuf>,

    #[command(flatten)]
    grid: GridArgs,
}

#[derive(Debug, Clone, Args)]
struct LocateArgs {
    /// Image to search.
    #[arg(long)]
    image: PathBuf,

    #[command(flatten)]
    grid: GridArgs,
}

impl GridArgs {
    fn to_config(&self) -> CliResult<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(tokens) = &self.grid_format {
            config.grid = GridSpec::from_tokens(tokens.as_slice())?;
        }
        if let Some(fraction) = self.fraction {
            config.fraction = fraction;
        }
        match self.strategy {
            Some(StrategyArg::Pattern) if !matches!(config.locator, GridStrategy::PatternSearch(_)) => {
                config.locator = GridStrategy::PatternSearch(PatternSearchParams::default());
            }
            Some(StrategyArg::Profile) if !matches!(config.locator, GridStrategy::PeakProfile(_)) => {
                config.locator = GridStrategy::PeakProfile(PeakProfileParams::default());
            }
            _ => {}
        }
        Ok(config)
    }
}

impl Commands {
    fn run(&self) -> CliResult<()> {
        match self {
            Commands::Analyse(args) => run_analyse(args),
            Commands::Locate(args) => run_locate(args),
        }
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let level = if cli.quiet {
        LevelFilter::Info
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new().filter_level(level).init();

    cli.command.run()
}

// ── analyse ────────────────────────────────────────────────────────────

fn run_analyse(args: &AnalyseArgs) -> CliResult<()> {
    let mut config = args.grid.to_config()?;
    if args.light_correction_off {
        config.metrics.background_correction = false;
    }
    if let Some(reference) = &args.reference_image {
        config.reference_image = Some(reference.clone());
    }
    config.validate()?;

    info!("Analysing images in {}", args.directory.display());
    let images = discover_images(
        &args.directory,
        args.endpoint,
        config.reference_image.as_deref(),
    )?;
    info!("Number of images: {}", images.len());

    let analyzer = SeriesAnalyzer::new(config)?;
    let mut sink = DirectorySink::new(OutputLayout::prepare(&args.directory)?);
    let report = analyzer.run(&images, &mut sink)?;

    for line in report.summary_lines() {
        info!("{line}");
    }
    if let Some(path) = &args.report {
        write_json_file(path, &report)?;
    }
    info!(
        "Wrote {} tables to {} in {:.1} ms",
        sink.written(),
        sink.layout().data_dir.display(),
        report.timings.total_ms
    );
    Ok(())
}

// ── locate ─────────────────────────────────────────────────────────────

fn run_locate(args: &LocateArgs) -> CliResult<()> {
    let config = args.grid.to_config()?;
    let analyzer = SeriesAnalyzer::new(config)?;
    let detection = analyzer.locate(&args.image)?;
    println!("{}", serde_json::to_string_pretty(&detection)?);
    Ok(())
}

pub mod progress;
pub mod report;

use crate::batch::{BatchRunner, CaseReporter};
use crate::engine::NativeEngineFactory;
use crate::error::{RadiobatchError, Result};
use crate::export::{write_export, XlsxSink};
use crate::extraction::EngineAdapter;
use crate::pairing::{pair_cases_with, PairingPolicy};
use crate::table::ResultTable;
use crate::types::{ExtractionConfig, RawParameters};
use clap::{Parser, ValueEnum};
use log::info;
use std::path::PathBuf;

pub use progress::ProgressReporter;
pub use report::TextReport;

/// Command-line arguments for radiobatch
///
/// Numeric options are taken as text and validated together, so every
/// bad value is reported the same way.
#[derive(Parser, Debug)]
#[command(name = "radiobatch")]
#[command(about = "Batch radiomics feature extraction from paired image and mask directories")]
#[command(version)]
pub struct Cli {
    /// Directory containing image volumes
    #[arg(value_name = "IMAGE_DIR")]
    pub image_dir: PathBuf,

    /// Directory containing mask volumes
    #[arg(value_name = "MASK_DIR")]
    pub mask_dir: PathBuf,

    /// Filter type to enable (repeatable): All, Original, Wavelet, Square,
    /// SquareRoot, Logarithm, Exponential, Gradient, LoG, LBP2D, LBP3D
    #[arg(long = "filter", value_name = "NAME", default_value = "Original")]
    pub filters: Vec<String>,

    /// Histogram bin width
    #[arg(long, default_value = "25.0")]
    pub bin_width: String,

    /// Five LoG sigmas in mm
    #[arg(long, value_name = "LIST", default_value = "1,2,3,4,5")]
    pub sigma: String,

    /// Resampled voxel spacing in mm (x,y,z)
    #[arg(long, value_name = "LIST", default_value = "1.0,1.0,1.0")]
    pub spacing: String,

    /// Intensity offset applied before energy features
    #[arg(long, default_value = "1000", allow_hyphen_values = true)]
    pub voxel_array_shift: String,

    /// Normalize image intensities (true/false)
    #[arg(long, default_value = "true")]
    pub normalize: String,

    /// Scale applied after normalization
    #[arg(long, default_value = "100")]
    pub normalize_scale: String,

    /// JSON parameter file; replaces the numeric options above
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// How image files are matched with mask files
    #[arg(long, default_value = "positional")]
    pub pairing: PairingArg,

    /// Number of cases extracted in parallel
    #[arg(short = 'j', long, default_value_t = 1)]
    pub workers: usize,

    /// Directory receiving the exported table
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "xlsx")]
    pub format: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Spreadsheet file
    Xlsx,
    /// Human-readable summary on stdout, no file
    Text,
    /// JSON file
    Json,
}

/// Pairing policy options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PairingArg {
    /// Zip sorted listings without comparing names
    Positional,
    /// Match files by case name, fail on any unmatched file
    ByName,
}

impl From<PairingArg> for PairingPolicy {
    fn from(arg: PairingArg) -> Self {
        match arg {
            PairingArg::Positional => PairingPolicy::Positional,
            PairingArg::ByName => PairingPolicy::ByName,
        }
    }
}

impl Cli {
    /// Collects the raw extraction parameters
    ///
    /// Reads the parameter file when one is given, otherwise the options.
    pub fn raw_parameters(&self) -> Result<RawParameters> {
        if let Some(path) = &self.params {
            return read_params_file(path);
        }

        Ok(RawParameters {
            bin_width: Some(self.bin_width.clone()),
            sigma: vec![self.sigma.clone()],
            resampled_spacing: vec![self.spacing.clone()],
            voxel_array_shift: Some(self.voxel_array_shift.clone()),
            normalize: Some(self.normalize.clone()),
            normalize_scale: Some(self.normalize_scale.clone()),
            filters: self.filters.clone(),
        })
    }
}

#[cfg(feature = "json")]
fn read_params_file(path: &std::path::Path) -> Result<RawParameters> {
    let text = std::fs::read_to_string(path).map_err(|e| RadiobatchError::Path {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| {
        RadiobatchError::Configuration(format!("{}: {}", path.display(), e))
    })
}

#[cfg(not(feature = "json"))]
fn read_params_file(_path: &std::path::Path) -> Result<RawParameters> {
    Err(RadiobatchError::Configuration(
        "parameter files require the 'json' feature; rebuild with: cargo build --features json"
            .to_string(),
    ))
}

/// Result of one command-line run
#[derive(Debug)]
pub struct RunOutcome {
    pub table: ResultTable,
    /// Written export file, `None` for text output
    pub export: Option<PathBuf>,
}

/// Runs the whole pipeline: configure, pair, extract, export
///
/// Configuration and path problems fail before any case is extracted.
/// Per-case failures end up as rows of the returned table.
pub fn run(cli: &Cli, reporter: &dyn CaseReporter) -> Result<RunOutcome> {
    let config = ExtractionConfig::from_raw(&cli.raw_parameters()?)?;
    info!("Enabled image types: {:?}", config.enabled_filters());

    let pairs = pair_cases_with(&cli.image_dir, &cli.mask_dir, cli.pairing.into())?;
    info!(
        "Found {} cases in {} and {}",
        pairs.len(),
        cli.image_dir.display(),
        cli.mask_dir.display()
    );

    let runner = BatchRunner::new(EngineAdapter::new(NativeEngineFactory)).with_workers(cli.workers);
    let table = runner.run(&config, &pairs, reporter);

    let scope = config.filters().scope();
    let export = match cli.format {
        OutputFormat::Text => None,
        OutputFormat::Xlsx => Some(write_export(&XlsxSink, &table, &cli.output, &scope)?),
        OutputFormat::Json => Some(export_json(&table, &cli.output, &scope)?),
    };

    Ok(RunOutcome { table, export })
}

#[cfg(feature = "json")]
fn export_json(table: &ResultTable, dir: &std::path::Path, scope: &str) -> Result<PathBuf> {
    write_export(&crate::export::JsonSink, table, dir, scope)
}

#[cfg(not(feature = "json"))]
fn export_json(_table: &ResultTable, _dir: &std::path::Path, _scope: &str) -> Result<PathBuf> {
    Err(RadiobatchError::Serialization(
        "JSON output requires the 'json' feature; rebuild with: cargo build --features json"
            .to_string(),
    ))
}

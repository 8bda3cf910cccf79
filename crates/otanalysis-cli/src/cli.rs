use clap::{Args, Parser, Subcommand, ValueEnum};
use otanalysis::core::models::features::FitModel;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "otanalysis CLI - Batch decoding and classification of optical-tweezer force-spectroscopy curves.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used to analyze curves in parallel.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze every curve file of a directory (or a single file) and write a TSV of results.
    Analyze(AnalyzeArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelArg {
    Linear,
    Sphere,
}

impl From<ModelArg> for FitModel {
    fn from(m: ModelArg) -> Self {
        match m {
            ModelArg::Linear => FitModel::Linear,
            ModelArg::Sphere => FitModel::Sphere,
        }
    }
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    // --- Core Arguments ---
    /// Directory of `.txt` / `.jpk-nt-force` curves, or a single curve file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Output directory for the result table and the rejected-file folders.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Analysis Overrides ---
    /// Off-axis deflection tolerated before a curve is flagged misaligned (%).
    #[arg(long, value_name = "PERCENT")]
    pub threshold_align: Option<f64>,

    /// Minimum share of the declared pull points a curve must carry (%).
    #[arg(long, value_name = "PERCENT")]
    pub pulling_length: Option<f64>,

    /// Press model fitted after the contact point.
    #[arg(short, long, value_enum)]
    pub model: Option<ModelArg>,

    /// Poisson ratio used by the sphere model.
    #[arg(long, value_name = "FLOAT")]
    pub eta: Option<f64>,

    /// Bead radius (µm) used by the sphere model.
    #[arg(long, value_name = "FLOAT")]
    pub bead_radius: Option<f64>,

    /// Multiple of the press standard deviation treated as noise.
    #[arg(long, value_name = "FLOAT")]
    pub factor_noise: Option<f64>,

    /// Minimum force jump (pN) for an adhesion.
    #[arg(long, value_name = "FLOAT")]
    pub jump_force: Option<f64>,

    /// Point count separating adhesions from tubes.
    #[arg(long, value_name = "INT")]
    pub jump_point: Option<i64>,

    /// Distance (nm) separating adhesions from tubes.
    #[arg(long, value_name = "FLOAT")]
    pub jump_distance: Option<f64>,

    /// Width of the Savitzky-Golay window applied to the pull.
    #[arg(long, value_name = "INT")]
    pub width_window_smooth: Option<usize>,

    /// Run the automatic optical-effect correction before fitting.
    #[arg(long)]
    pub optical_correction: bool,

    /// Drug label copied into every output row.
    #[arg(long, value_name = "TEXT")]
    pub drug: Option<String>,

    /// Condition label copied into every output row.
    #[arg(long, value_name = "TEXT")]
    pub condition: Option<String>,

    /// Do not copy rejected and misaligned files into `File_rejected`.
    #[arg(long)]
    pub no_routing: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S analysis.jump-force=10
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_arguments_parse() {
        let cli = Cli::parse_from([
            "otanalysis",
            "-vv",
            "analyze",
            "-i",
            "curves",
            "-o",
            "out",
            "--model",
            "sphere",
            "--optical-correction",
            "-S",
            "analysis.eta=0.3",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Analyze(args) = cli.command;
        assert_eq!(args.input, PathBuf::from("curves"));
        assert_eq!(args.model, Some(ModelArg::Sphere));
        assert!(args.optical_correction);
        assert_eq!(args.set_values, vec!["analysis.eta=0.3".to_string()]);
    }
}

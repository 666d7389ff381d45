//! Grantlens CLI: grant termination analytics from the terminal.
//!
//! Every analysis subcommand loads the configured records, applies the
//! filter and adjustment flags, and prints its result as JSON on stdout.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Grantlens: termination risk and fairness analysis for research grants
#[derive(Parser, Debug)]
#[command(name = "grantlens", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path (replaces the layered lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    filter: FilterArgs,

    #[command(flatten)]
    adjustments: AdjustmentArgs,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Record source overrides.
#[derive(clap::Args, Debug, Default)]
struct SourceArgs {
    /// Seed for synthetic records
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Number of synthetic records
    #[arg(long, global = true)]
    count: Option<usize>,

    /// JSON file of grant records (raw scored records when --metadata is given)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// JSON metadata table joined against --data by award number
    #[arg(long, global = true, requires = "data")]
    metadata: Option<PathBuf>,
}

/// Filter predicate overrides.
#[derive(clap::Args, Debug, Default)]
struct FilterArgs {
    /// Case-insensitive text matched against titles and keywords
    #[arg(long, global = true)]
    search: Option<String>,

    /// Earliest award year (inclusive)
    #[arg(long, global = true)]
    year_min: Option<i32>,

    /// Latest award year (inclusive)
    #[arg(long, global = true)]
    year_max: Option<i32>,

    /// Agency name, or "all"
    #[arg(long, global = true)]
    agency: Option<String>,

    /// Research field, or "all"
    #[arg(long, global = true)]
    field: Option<String>,
}

/// Bias adjustment overrides, in percentage points (0-20).
#[derive(clap::Args, Debug, Default)]
struct AdjustmentArgs {
    #[arg(long, global = true)]
    gender_bias: Option<f64>,

    #[arg(long, global = true)]
    race_bias: Option<f64>,

    #[arg(long, global = true)]
    institution_bias: Option<f64>,

    #[arg(long, global = true)]
    experience_bias: Option<f64>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Full dashboard snapshot: overview, keywords, fairness, impact, breakdowns
    Summary,
    /// Keyword statistics for the word cloud
    Keywords {
        /// Number of keywords to show (defaults to keywords.top_n)
        #[arg(long)]
        top: Option<usize>,
        /// Classify keywords with a risk reference table instead
        #[arg(long)]
        reference: Option<PathBuf>,
    },
    /// Demographic parity and equality of opportunity ratios
    Fairness {
        /// Read bias-adjusted probabilities
        #[arg(long)]
        adjusted: bool,
    },
    /// Outcomes by field, year, agency and award size
    Breakdown {
        /// Read bias-adjusted probabilities
        #[arg(long)]
        adjusted: bool,
    },
    /// Bias impact per topic category
    BiasImpact {
        /// JSON file of average topic deltas
        #[arg(long, requires = "max")]
        avg: Option<PathBuf>,
        /// JSON file of strongest topic deltas
        #[arg(long, requires = "avg")]
        max: Option<PathBuf>,
    },
    /// Predict termination risk for a hypothetical grant
    Predict {
        #[arg(long, value_enum, default_value = "male")]
        gender: commands::GenderArg,
        #[arg(long, value_enum, default_value = "medium")]
        prestige: commands::PrestigeArg,
        /// PI experience in years
        #[arg(long, default_value = "10")]
        experience: u32,
        /// Proposal sentiment (-1 to 1)
        #[arg(long, default_value = "0.5", allow_negative_numbers = true)]
        sentiment: f64,
        /// Language complexity (0 to 1)
        #[arg(long, default_value = "0.5")]
        complexity: f64,
        /// Readability score (0 to 100)
        #[arg(long, default_value = "60")]
        readability: f64,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show the effective configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("org", "grantlens", "grantlens")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "grantlens.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::run(cli, &workspace)
}

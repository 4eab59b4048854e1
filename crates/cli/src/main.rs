// citycmp - join city/state datasets into one comparison table

mod exit_codes;
mod join;
mod merge;
mod normalize;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use citycmp_io::IoError;
use citycmp_join::{ClaimPolicy, DataSource, JoinError, MatchStrategy, Scorer};

use exit_codes::{EXIT_ERROR, EXIT_INVALID_PLAN, EXIT_IO, EXIT_MISSING_KEY, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "citycmp")]
#[command(about = "Join inconsistently keyed city/state datasets into one comparison table")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join two CSV files on (state, city): exact matches, then per-state fuzzy matching
    #[command(after_help = "\
Examples:
  citycmp join census.csv walkscore.csv
  citycmp join census.csv walkscore.csv --strategy ratio --min-score 80
  citycmp join census.csv fbi.csv --normalize --suffixes ,_fbi -o joined.csv
  citycmp join left.csv right.csv --json")]
    Join {
        /// Left input (its city spelling wins on fuzzy matches)
        left: PathBuf,

        /// Right input
        right: PathBuf,

        /// How leftover cities are paired within a state
        #[arg(long, value_enum, default_value = "prefix")]
        strategy: StrategyArg,

        /// Ratio strategy: a candidate must score above this (0-100)
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
        min_score: u8,

        /// Ratio strategy: similarity metric
        #[arg(long, value_enum, default_value = "indel")]
        scorer: ScorerArg,

        /// Whether one right city may be matched by several left cities
        #[arg(long, value_enum, default_value = "single-use")]
        claim: ClaimArg,

        /// Suffixes for colliding column names, as LEFT,RIGHT
        #[arg(long, default_value = "_x,_y")]
        suffixes: String,

        /// Normalize state/city values of both inputs before joining
        #[arg(long)]
        normalize: bool,

        /// Output CSV file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the output file as Latin-1
        #[arg(long)]
        latin1: bool,

        /// Print the join summary and fuzzy matches as JSON instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Merge every dataset listed in a TOML plan
    #[command(after_help = "\
Examples:
  citycmp merge cities.plan.toml
  citycmp merge cities.plan.toml -o city_comparison.csv --json")]
    Merge {
        /// Path to the plan file. Dataset paths are relative to its directory.
        plan: PathBuf,

        /// Output CSV file (overrides [output].file)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print run metadata and per-step summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a merge plan without reading any dataset
    Validate {
        /// Path to the plan file
        plan: PathBuf,
    },

    /// Clean up one raw dataset's headers and key values
    #[command(after_help = "\
Examples:
  citycmp normalize table_8_offenses.csv --source fbi_2017 --header-row 3
  citycmp normalize census.csv --source census_2010 -o census_clean.csv")]
    Normalize {
        /// Raw CSV file
        file: PathBuf,

        /// Dataset label, e.g. census_2010, fbi_2016, walkscore
        #[arg(long)]
        source: DataSource,

        /// Records to skip before the header row
        #[arg(long, default_value_t = 0)]
        header_row: usize,

        /// Output CSV file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Prefix,
    Ratio,
}

impl From<StrategyArg> for MatchStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Prefix => MatchStrategy::Prefix,
            StrategyArg::Ratio => MatchStrategy::Ratio,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScorerArg {
    Indel,
    JaroWinkler,
    Levenshtein,
}

impl From<ScorerArg> for Scorer {
    fn from(arg: ScorerArg) -> Self {
        match arg {
            ScorerArg::Indel => Scorer::Indel,
            ScorerArg::JaroWinkler => Scorer::JaroWinkler,
            ScorerArg::Levenshtein => Scorer::Levenshtein,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ClaimArg {
    SingleUse,
    Reuse,
}

impl From<ClaimArg> for ClaimPolicy {
    fn from(arg: ClaimArg) -> Self {
        match arg {
            ClaimArg::SingleUse => ClaimPolicy::SingleUse,
            ClaimArg::Reuse => ClaimPolicy::Reuse,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  citycmp-join ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Join {
            left,
            right,
            strategy,
            min_score,
            scorer,
            claim,
            suffixes,
            normalize,
            output,
            latin1,
            json,
        } => join::parse_suffixes(&suffixes).and_then(|suffixes| {
            let options = citycmp_join::JoinOptions {
                strategy: strategy.into(),
                min_score,
                scorer: scorer.into(),
                claim: claim.into(),
                suffixes,
            };
            join::cmd_join(left, right, options, normalize, output, latin1, json)
        }),
        Commands::Merge { plan, output, json } => merge::cmd_merge(plan, output, json),
        Commands::Validate { plan } => merge::cmd_validate(plan),
        Commands::Normalize { file, source, header_row, output } => {
            normalize::cmd_normalize(file, source, header_row, output)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn io(err: IoError) -> Self {
        Self { code: EXIT_IO, message: err.to_string(), hint: None }
    }

    /// Map an engine error to its exit code.
    pub fn join(err: JoinError) -> Self {
        let (code, hint) = match &err {
            JoinError::MissingKeyColumn { .. } => (
                EXIT_MISSING_KEY,
                Some("inputs need `state` and `city` columns; try `citycmp normalize` first".to_string()),
            ),
            JoinError::ConfigParse(_) | JoinError::ConfigValidation(_) => (EXIT_INVALID_PLAN, None),
            JoinError::DuplicateColumn(_) => (
                EXIT_ERROR,
                Some("pass distinct --suffixes (or a dataset `suffix`) for overlapping columns".to_string()),
            ),
            _ => (EXIT_ERROR, None),
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

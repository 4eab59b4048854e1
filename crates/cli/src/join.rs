//! `citycmp join`: pairwise (state, city) join of two CSV files.

use std::io::Write;
use std::path::PathBuf;

use citycmp_io::csv::{read_table, to_csv_string, write_table};
use citycmp_join::config::Encoding;
use citycmp_join::key::{normalize_key_columns, DEFAULT_CITY_SUFFIXES};
use citycmp_join::{join_on_state_and_city, JoinOptions};

use crate::CliError;

/// `"_x,_y"` -> `("_x", "_y")`. Either side may be empty.
pub fn parse_suffixes(raw: &str) -> Result<(String, String), CliError> {
    match raw.split_once(',') {
        Some((left, right)) if !right.contains(',') => Ok((left.to_string(), right.to_string())),
        _ => Err(CliError::args(format!("invalid --suffixes {raw:?}"))
            .with_hint("expected LEFT,RIGHT, e.g. --suffixes _x,_y or --suffixes ,_walkscore")),
    }
}

pub fn cmd_join(
    left_path: PathBuf,
    right_path: PathBuf,
    options: JoinOptions,
    normalize: bool,
    output: Option<PathBuf>,
    latin1: bool,
    json: bool,
) -> Result<(), CliError> {
    let mut left = read_table(&left_path, 0).map_err(CliError::io)?;
    let mut right = read_table(&right_path, 0).map_err(CliError::io)?;
    if normalize {
        left = normalize_key_columns(left, "left", DEFAULT_CITY_SUFFIXES).map_err(CliError::join)?;
        right = normalize_key_columns(right, "right", DEFAULT_CITY_SUFFIXES).map_err(CliError::join)?;
    }

    let result = join_on_state_and_city(&left, &right, &options).map_err(CliError::join)?;

    if let Some(path) = &output {
        let encoding = if latin1 { Encoding::Latin1 } else { Encoding::Utf8 };
        write_table(&result.table, path, encoding).map_err(CliError::io)?;
        eprintln!("wrote {}", path.display());
    }

    if json {
        let report = serde_json::json!({
            "options": options,
            "summary": result.summary,
            "fuzzy_matches": result.fuzzy_matches().collect::<Vec<_>>(),
        });
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{text}");
    } else if output.is_none() {
        let text = to_csv_string(&result.table).map_err(CliError::general)?;
        std::io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .map_err(|e| CliError::general(e.to_string()))?;
    }

    let s = &result.summary;
    eprintln!(
        "joined {} x {} rows: {} exact, {} fuzzy, {} left / {} right unmatched",
        s.left_rows, s.right_rows, s.exact, s.fuzzy, s.left_unmatched, s.right_unmatched,
    );
    Ok(())
}

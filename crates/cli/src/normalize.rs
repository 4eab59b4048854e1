//! `citycmp normalize`: apply one dataset's header transforms.

use std::path::PathBuf;

use citycmp_io::csv::{read_table, to_csv_string, write_table};
use citycmp_join::config::Encoding;
use citycmp_join::headers::normalize_headers;
use citycmp_join::DataSource;

use crate::CliError;

pub fn cmd_normalize(
    file: PathBuf,
    source: DataSource,
    header_row: usize,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let raw = read_table(&file, header_row).map_err(CliError::io)?;
    let before = raw.column_count();
    let table = normalize_headers(source, raw).map_err(CliError::join)?;

    match &output {
        Some(path) => {
            write_table(&table, path, Encoding::Utf8).map_err(CliError::io)?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{}", to_csv_string(&table).map_err(CliError::general)?),
    }

    eprintln!(
        "{source}: {} rows, {} -> {} columns",
        table.row_count(),
        before,
        table.column_count()
    );
    Ok(())
}

// CSV/TSV import/export for join tables

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use citycmp_join::config::Encoding;
use citycmp_join::Table;

use crate::error::IoError;

/// Read a delimited file into a [`Table`]. `header_row` records are skipped
/// before the header (source spreadsheets often carry a title block).
pub fn read_table(path: &Path, header_row: usize) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    let table = parse_table(&content, header_row).map_err(|e| IoError::csv(path, e))?;
    log::debug!(
        "read {}: {} rows x {} columns",
        path.display(),
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::read(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::read(path, e))?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            log::info!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.iter().copied().max().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        // Title lines above the header are usually a single field, so score
        // on the widest line rather than the first.
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Parse delimited text into a [`Table`].
///
/// - empty header cells become `Unnamed: <index>`
/// - repeated headers become `name`, `name.1`, `name.2`, ...
/// - short rows are padded with empty cells; long rows are an error unless
///   the overflow is blank
/// - rows with no content are skipped
pub fn parse_table(content: &str, header_row: usize) -> Result<Table, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records().skip(header_row);
    let header = match records.next() {
        Some(record) => record.map_err(|e| e.to_string())?,
        None => return Err(format!("no header row (skipped {header_row} record(s))")),
    };
    let headers = unique_headers(header.iter());
    let width = headers.len();

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| e.to_string())?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let mut row: Vec<String> = record.iter().map(String::from).collect();
        if row.len() > width {
            if row[width..].iter().any(|f| !f.trim().is_empty()) {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                return Err(format!("line {line}: {} fields, header has {width}", row.len()));
            }
            row.truncate(width);
        }
        row.resize(width, String::new());
        rows.push(row);
    }

    Table::from_rows(headers, rows).map_err(|e| e.to_string())
}

fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let raw: Vec<String> = raw
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim();
            if h.is_empty() {
                format!("Unnamed: {i}")
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for name in raw {
        let mut candidate = name.clone();
        let mut n = 0;
        while taken.contains(&candidate) {
            n += 1;
            candidate = format!("{name}.{n}");
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

pub fn to_csv_string(table: &Table) -> Result<String, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.headers()).map_err(|e| e.to_string())?;
    for r in 0..table.row_count() {
        if let Some(row) = table.row(r) {
            writer.write_record(&row).map_err(|e| e.to_string())?;
        }
    }
    let bytes = writer.into_inner().map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

/// Write a table as CSV. Latin-1 output uses Windows-1252; characters it
/// cannot represent are written as numeric character references.
pub fn write_table(table: &Table, path: &Path, encoding: Encoding) -> Result<(), IoError> {
    let text = to_csv_string(table).map_err(|e| IoError::write(path, e))?;
    let bytes = match encoding {
        Encoding::Utf8 => text.into_bytes(),
        Encoding::Latin1 => {
            let (encoded, _, unmappable) = encoding_rs::WINDOWS_1252.encode(&text);
            if unmappable {
                log::warn!("{}: some characters have no Latin-1 form", path.display());
            }
            encoded.into_owned()
        }
    };
    std::fs::write(path, bytes).map_err(|e| IoError::write(path, e))?;
    log::info!("wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parse_basic_with_quotes() {
        let t = parse_table("city,state,note\n\"Washington, D.C.\",dc,\"a \"\"b\"\"\"\n", 0).unwrap();
        assert_eq!(t.headers(), &["city", "state", "note"]);
        assert_eq!(t.row(0).unwrap(), vec!["Washington, D.C.", "dc", "a \"b\""]);
    }

    #[test]
    fn header_row_skips_title_block() {
        let text = "Table 8\nOffenses Known to Law Enforcement\nState,City,Arson3\nALABAMA,Abbeville,0\n";
        let t = parse_table(text, 2).unwrap();
        assert_eq!(t.headers(), &["State", "City", "Arson3"]);
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn unnamed_and_duplicate_headers() {
        let t = parse_table("a,,a,a.1,a\n1,2,3,4,5\n", 0).unwrap();
        assert_eq!(t.headers(), &["a", "Unnamed: 1", "a.1", "a.1.1", "a.2"]);
    }

    #[test]
    fn ragged_rows() {
        let t = parse_table("a,b,c\n1\n2,3,4,,\n\n,,\n", 0).unwrap();
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.row(0).unwrap(), vec!["1", "", ""]);
        assert_eq!(t.row(1).unwrap(), vec!["2", "3", "4"]);

        let err = parse_table("a,b\n1,2,3\n", 0).unwrap_err();
        assert!(err.contains("3 fields"), "{err}");
    }

    #[test]
    fn sniffs_tab_and_semicolon() {
        let t = parse_table("city\tstate\nakron\tohio\n", 0).unwrap();
        assert_eq!(t.headers(), &["city", "state"]);
        let t = parse_table("city;state\nakron;ohio\n", 0).unwrap();
        assert_eq!(t.value(0, "state"), Some("ohio"));
    }

    #[test]
    fn strips_byte_order_mark() {
        let t = parse_table("\u{feff}city,state\nx,y\n", 0).unwrap();
        assert_eq!(t.headers()[0], "city");
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse_table("", 0).is_err());
        assert!(parse_table("a,b\n", 3).is_err());
    }

    #[test]
    fn reads_latin1_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        fs::write(&path, b"city,state\nS\xe3o Paulo,sp\nMayag\xfcez,pr\n").unwrap();
        let t = read_table(&path, 0).unwrap();
        assert_eq!(t.column("city").unwrap(), &["São Paulo", "Mayagüez"]);
    }

    #[test]
    fn write_latin1_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let t = Table::from_columns(vec![("city", vec!["Cañon City"]), ("state", vec!["colorado"])]).unwrap();

        write_table(&t, &path, Encoding::Latin1).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.contains(&0xF1));
        assert!(String::from_utf8(bytes).is_err());
        assert_eq!(read_table(&path, 0).unwrap(), t);

        write_table(&t, &path, Encoding::Utf8).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "city,state\nCañon City,colorado\n");
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempdir().unwrap();
        let err = read_table(&dir.path().join("nope.csv"), 0).unwrap_err();
        assert!(matches!(err, IoError::Read { .. }));
    }
}

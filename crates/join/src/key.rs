//! Key normalization for the `(state, city)` composite key.
//!
//! Every dataset spells its cities a little differently: FBI tables append
//! footnote digits ("Abbeville3"), census names carry a legal suffix
//! ("Sunnyvale city", "Aberdeen CDP"), and everything arrives in mixed case.
//! The helpers here reduce a raw value to a canonical lower-case form that is
//! stable under re-normalization.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::JoinError;
use crate::table::Table;

pub const STATE: &str = "state";
pub const CITY: &str = "city";
pub const COUNTY: &str = "county";
pub const COUNTY_FIPS: &str = "county_fips";

/// Suffix noise stripped from the end of city names (lower case, leading space).
pub const DEFAULT_CITY_SUFFIXES: &[&str] = &[" city", " cdp"];

/// Composite join key. Both parts are already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CityKey {
    pub state: String,
    pub city: String,
}

impl CityKey {
    pub fn new(state: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            city: city.into(),
        }
    }

    /// Normalize raw state/city values into a key.
    pub fn normalized(state: &str, city: &str) -> Self {
        Self {
            state: normalize_state(state),
            city: normalize_city(city, DEFAULT_CITY_SUFFIXES),
        }
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.city, self.state)
    }
}

// ---------------------------------------------------------------------------
// String normalization
// ---------------------------------------------------------------------------

/// Remove ASCII digits, e.g. footnote markers glued to a name.
pub fn remove_integers(s: &str) -> String {
    s.chars().filter(|c| !c.is_ascii_digit()).collect()
}

/// Strip each suffix in turn if the string ends with it.
/// `remove_suffixes("foo bar baz", &[" baz", " bar"]) == "foo"`.
pub fn remove_suffixes(s: &str, suffixes: &[&str]) -> String {
    let mut out = s;
    for suffix in suffixes {
        if let Some(stripped) = out.strip_suffix(suffix) {
            out = stripped;
        }
    }
    out.to_string()
}

fn clean(raw: &str) -> String {
    let lowered = remove_integers(&raw.to_lowercase());
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_tail(s: &mut String) {
    let len = s
        .trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == '*')
        .len();
    s.truncate(len);
}

/// Lower-case, digit-free, single-spaced state (or county) name.
pub fn normalize_state(raw: &str) -> String {
    let mut state = clean(raw);
    trim_tail(&mut state);
    state
}

/// Like [`normalize_state`], then strips suffix noise from the end until none remains.
pub fn normalize_city(raw: &str, suffixes: &[&str]) -> String {
    let mut city = clean(raw);
    loop {
        trim_tail(&mut city);
        match suffixes.iter().find(|s| !s.is_empty() && city.ends_with(*s)) {
            Some(suffix) => {
                let len = city.len() - suffix.len();
                city.truncate(len);
            }
            None => break,
        }
    }
    city
}

/// Parse the census "Geographic area" convention:
/// `"United States - Alabama - Abbeville city"` -> `(alabama, abbeville)`.
/// Anything without exactly two `" - "` separators is not a city row.
pub fn parse_geographic_area(value: &str) -> Option<CityKey> {
    let parts: Vec<&str> = value.split(" - ").collect();
    if parts.len() != 3 {
        return None;
    }
    Some(CityKey::normalized(parts[1], parts[2]))
}

// ---------------------------------------------------------------------------
// Table helpers
// ---------------------------------------------------------------------------

/// Derive `state` and `city` columns from a census "Geographic area" column.
/// Rows that are not city rows (national or state totals) are dropped.
pub fn split_geographic_area(table: Table, column: &str) -> Result<Table, JoinError> {
    let values = table
        .column(column)
        .ok_or_else(|| JoinError::UnknownColumn(column.to_string()))?;
    let mut keep = Vec::new();
    let mut states = Vec::new();
    let mut cities = Vec::new();
    for (row, value) in values.iter().enumerate() {
        if let Some(key) = parse_geographic_area(value) {
            keep.push(row);
            states.push(key.state);
            cities.push(key.city);
        }
    }
    table
        .select_rows(&keep)
        .with_column(STATE, states)?
        .with_column(CITY, cities)
}

/// Positions of the `state` and `city` columns, or `MissingKeyColumn`.
pub fn require_key_columns(table: &Table, label: &str) -> Result<(usize, usize), JoinError> {
    let idx = |column: &str| {
        table.column_index(column).ok_or_else(|| JoinError::MissingKeyColumn {
            table: label.into(),
            column: column.into(),
        })
    };
    Ok((idx(STATE)?, idx(CITY)?))
}

/// One key per row, in row order. Values are taken as-is (already normalized).
pub fn table_keys(table: &Table, label: &str) -> Result<Vec<CityKey>, JoinError> {
    let (state, city) = require_key_columns(table, label)?;
    Ok((0..table.row_count())
        .map(|r| CityKey::new(table.cell(r, state), table.cell(r, city)))
        .collect())
}

/// Row index of the first occurrence of each key.
pub fn first_row_by_key(keys: &[CityKey]) -> HashMap<&CityKey, usize> {
    let mut index = HashMap::with_capacity(keys.len());
    for (row, key) in keys.iter().enumerate() {
        index.entry(key).or_insert(row);
    }
    index
}

/// Rewrite the `state` and `city` columns (and `county`, if present) into
/// canonical form. Fails if either key column is missing.
pub fn normalize_key_columns(table: Table, label: &str, suffixes: &[&str]) -> Result<Table, JoinError> {
    require_key_columns(&table, label)?;
    Ok(normalize_key_values(table, suffixes))
}

/// Same as [`normalize_key_columns`] but tolerant of absent columns.
pub fn normalize_key_values(table: Table, suffixes: &[&str]) -> Table {
    table
        .map_column(STATE, normalize_state)
        .map_column(COUNTY, normalize_state)
        .map_column(CITY, |c| normalize_city(c, suffixes))
}

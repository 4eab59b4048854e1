//! Exact-key joins.
//!
//! [`exact_join`] is the fast path of the city join: a hash inner join on the
//! composite `(state, city)` key. It also reports the keys each side failed to
//! match, which seed fuzzy reconciliation. [`left_join_on_column`] covers
//! county-level datasets that hang off an already-joined city table.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::JoinError;
use crate::key::{table_keys, CityKey, CITY, STATE};
use crate::layout::MergeLayout;
use crate::model::{MatchMethod, MatchRecord};
use crate::table::Table;

#[derive(Debug, Clone)]
pub struct ExactJoin {
    /// `state`, `city`, left non-key columns, right non-key columns.
    pub table: Table,
    /// One record per output row, in output order.
    pub matches: Vec<MatchRecord>,
    /// Left keys with no identical right key, sorted.
    pub left_missing: BTreeSet<CityKey>,
    /// Right keys with no identical left key, sorted.
    pub right_missing: BTreeSet<CityKey>,
}

/// Inner join on `(state, city)`. Output rows follow left row order; a key
/// repeated on either side yields one row per pairing.
pub fn exact_join(left: &Table, right: &Table, suffixes: &(String, String)) -> Result<ExactJoin, JoinError> {
    let left_keys = table_keys(left, "left")?;
    let right_keys = table_keys(right, "right")?;
    let layout = MergeLayout::new(left, right, &[STATE, CITY], true, &[], (suffixes.0.as_str(), suffixes.1.as_str()))?;

    let mut index: HashMap<&CityKey, Vec<usize>> = HashMap::with_capacity(right_keys.len());
    for (row, key) in right_keys.iter().enumerate() {
        index.entry(key).or_default().push(row);
    }

    let mut table = layout.empty_table()?;
    let mut matches = Vec::new();
    for (left_row, key) in left_keys.iter().enumerate() {
        let Some(rows) = index.get(key) else { continue };
        for &right_row in rows {
            table.push_row(layout.merge_row(
                &[key.state.as_str(), key.city.as_str()],
                left,
                left_row,
                right,
                Some(right_row),
            ))?;
            matches.push(MatchRecord {
                key: key.clone(),
                left_row,
                right_row,
                right_city: key.city.clone(),
                method: MatchMethod::Exact,
            });
        }
    }

    let left_set: HashSet<&CityKey> = left_keys.iter().collect();
    let left_missing = left_keys
        .iter()
        .filter(|k| !index.contains_key(k))
        .cloned()
        .collect();
    let right_missing = right_keys
        .iter()
        .filter(|k| !left_set.contains(k))
        .cloned()
        .collect();

    Ok(ExactJoin {
        table,
        matches,
        left_missing,
        right_missing,
    })
}

/// Left join on a single column. Every left row is kept in order, with empty
/// right cells when the key has no partner or is blank. Only the first right
/// row of a repeated key is used.
///
/// The left side's `state` and `city` keep their names; a right-side column of
/// the same name takes the right suffix.
pub fn left_join_on_column(
    left: &Table,
    right: &Table,
    column: &str,
    suffixes: &(String, String),
) -> Result<Table, JoinError> {
    let missing = |table: &str| JoinError::MissingKeyColumn {
        table: table.into(),
        column: column.into(),
    };
    let left_col = left.column_index(column).ok_or_else(|| missing("left"))?;
    let right_col = right.column_index(column).ok_or_else(|| missing("right"))?;
    let layout = MergeLayout::new(left, right, &[column], false, &[STATE, CITY], (suffixes.0.as_str(), suffixes.1.as_str()))?;

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(right.row_count());
    let mut duplicates = 0usize;
    for row in 0..right.row_count() {
        let key = right.cell(row, right_col);
        if key.is_empty() {
            continue;
        }
        if index.contains_key(key) {
            duplicates += 1;
        } else {
            index.insert(key, row);
        }
    }
    if duplicates > 0 {
        log::warn!("{duplicates} duplicate '{column}' value(s) on the right side; using the first row of each");
    }

    let mut table = layout.empty_table()?;
    let mut matched = 0usize;
    for row in 0..left.row_count() {
        let partner = index.get(left.cell(row, left_col)).copied();
        matched += usize::from(partner.is_some());
        table.push_row(layout.merge_row(&[], left, row, right, partner))?;
    }
    log::info!(
        "left join on '{column}': {matched}/{} left rows matched",
        left.row_count()
    );
    Ok(table)
}

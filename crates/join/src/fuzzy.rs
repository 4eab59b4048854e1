//! Per-state fuzzy reconciliation of the keys the exact join left behind.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{ClaimPolicy, JoinOptions, MatchStrategy};
use crate::error::JoinError;
use crate::key::{first_row_by_key, table_keys, CityKey, CITY, STATE};
use crate::layout::MergeLayout;
use crate::model::{MatchMethod, MatchRecord};
use crate::similarity::{best_ratio_match, find_prefix};
use crate::table::Table;

#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Same columns as the exact join output.
    pub table: Table,
    pub matches: Vec<MatchRecord>,
}

/// Residual cities grouped by state, both sorted. Empty cities are left out.
fn by_state(keys: &BTreeSet<CityKey>) -> BTreeMap<&str, Vec<&str>> {
    let mut out: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for key in keys.iter().filter(|k| !k.city.is_empty()) {
        out.entry(key.state.as_str()).or_default().push(key.city.as_str());
    }
    out
}

fn pick(city: &str, pool: &[&str], options: &JoinOptions) -> Option<(usize, MatchMethod)> {
    match options.strategy {
        MatchStrategy::Prefix => find_prefix(city, pool).map(|i| (i, MatchMethod::Prefix)),
        MatchStrategy::Ratio => best_ratio_match(city, pool, options.scorer, options.min_score)
            .map(|(i, score)| (i, MatchMethod::Ratio { score })),
    }
}

/// Pair residual left cities with residual right cities of the same state.
///
/// States are visited in sorted order and only when both sides have residual
/// cities there. Within a state, left cities are visited in sorted order and
/// each one takes at most one right city. Each merged row carries the state
/// and the left city spelling. With [`ClaimPolicy::SingleUse`] a claimed right
/// city is unavailable to later left cities.
pub fn reconcile(
    left: &Table,
    right: &Table,
    left_missing: &BTreeSet<CityKey>,
    right_missing: &BTreeSet<CityKey>,
    options: &JoinOptions,
) -> Result<Reconciled, JoinError> {
    let left_keys = table_keys(left, "left")?;
    let right_keys = table_keys(right, "right")?;
    let left_rows = first_row_by_key(&left_keys);
    let right_rows = first_row_by_key(&right_keys);
    let (left_suffix, right_suffix) = &options.suffixes;
    let layout = MergeLayout::new(left, right, &[STATE, CITY], true, &[], (left_suffix.as_str(), right_suffix.as_str()))?;

    let mut table = layout.empty_table()?;
    let mut matches = Vec::new();
    let right_by_state = by_state(right_missing);

    for (state, left_cities) in by_state(left_missing) {
        let Some(candidates) = right_by_state.get(state) else {
            log::trace!("state {state:?}: no right-side residue, skipping");
            continue;
        };
        let mut pool = candidates.clone();

        for city in left_cities {
            let Some((i, method)) = pick(city, &pool, options) else {
                continue;
            };
            let right_city = pool[i];
            let key = CityKey::new(state, city);
            let (Some(&left_row), Some(&right_row)) = (
                left_rows.get(&key),
                right_rows.get(&CityKey::new(state, right_city)),
            ) else {
                continue;
            };

            log::debug!("fuzzy match in {state:?}: {city:?} -> {right_city:?} ({method:?})");
            table.push_row(layout.merge_row(&[state, city], left, left_row, right, Some(right_row)))?;
            matches.push(MatchRecord {
                key,
                left_row,
                right_row,
                right_city: right_city.to_string(),
                method,
            });

            if options.claim == ClaimPolicy::SingleUse {
                pool.remove(i);
            }
        }
    }

    Ok(Reconciled { table, matches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::exact_join;

    fn run(left: &Table, right: &Table, options: &JoinOptions) -> Reconciled {
        let exact = exact_join(left, right, &options.suffixes).unwrap();
        reconcile(left, right, &exact.left_missing, &exact.right_missing, options).unwrap()
    }

    fn table(states: Vec<&str>, cities: Vec<&str>) -> Table {
        let data: Vec<String> = cities.iter().map(|c| format!("v-{c}")).collect();
        Table::from_columns(vec![
            ("state", states.into_iter().map(String::from).collect::<Vec<_>>()),
            ("city", cities.into_iter().map(String::from).collect()),
            ("data", data),
        ])
        .unwrap()
    }

    #[test]
    fn prefix_match_relabels_with_left_city() {
        let left = table(vec!["ca"], vec!["sunnyvale"]);
        let right = table(vec!["ca"], vec!["sunnyvale city"]);
        let out = run(&left, &right, &JoinOptions::default());
        assert_eq!(out.table.row(0).unwrap(), vec!["ca", "sunnyvale", "v-sunnyvale", "v-sunnyvale city"]);
        assert_eq!(out.matches[0].right_city, "sunnyvale city");
        assert_eq!(out.matches[0].method, MatchMethod::Prefix);
    }

    #[test]
    fn ratio_match_records_score() {
        let left = table(vec!["b"], vec!["4"]);
        let right = table(vec!["b"], vec!["4."]);
        let out = run(&left, &right, &JoinOptions::ratio(0));
        assert_eq!(out.matches[0].method, MatchMethod::Ratio { score: 67 });
        let out = run(&left, &right, &JoinOptions::ratio(67));
        assert!(out.matches.is_empty());
    }

    #[test]
    fn state_without_right_residue_is_skipped() {
        let left = table(vec!["a", "b"], vec!["x", "x"]);
        let right = table(vec!["c"], vec!["x"]);
        let out = run(&left, &right, &JoinOptions::default());
        assert!(out.table.is_empty());
    }

    #[test]
    fn single_use_blocks_second_claim() {
        // "a" and "ab" both prefix-match "abc".
        let left = table(vec!["s", "s"], vec!["a", "ab"]);
        let right = table(vec!["s"], vec!["abc"]);
        let out = run(&left, &right, &JoinOptions::default());
        assert_eq!(out.matches.len(), 1);
        assert_eq!(out.matches[0].key.city, "a");

        let reuse = JoinOptions::default().with_claim(ClaimPolicy::Reuse);
        let out = run(&left, &right, &reuse);
        assert_eq!(out.matches.len(), 2);
        assert!(out.matches.iter().all(|m| m.right_row == 0));
    }

    #[test]
    fn empty_cities_are_not_candidates() {
        let left = table(vec!["s"], vec![""]);
        let right = table(vec!["s"], vec!["x"]);
        let out = run(&left, &right, &JoinOptions::ratio(0));
        assert!(out.matches.is_empty());
    }
}
